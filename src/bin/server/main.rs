// src/bin/server/main.rs
use clap::Parser;
use log::info;
use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::runtime::Runtime;
use rtdb_proxy::server::{RtdbServer, ServerConfig};
use rtdb_proxy::{MemoryStore, PersistentStore, RemoteStore, StoreError};

#[derive(Parser)]
#[command(name = "rtdb-server")]
#[command(about = "REST server for a local realtime database", long_about = None)]
struct Cli {
    /// Path to the database directory (in-memory when omitted)
    #[arg(short, long)]
    db_path: Option<PathBuf>,

    /// Listening port
    #[arg(short, long, default_value_t = 3000)]
    port: u16,

    /// Listening address
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: IpAddr,

    /// Shared secret clients must pass as `?auth=`
    #[arg(short, long)]
    secret: Option<String>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args = Cli::parse();

    let rt = Runtime::new()?;
    rt.block_on(async_main(args))
}

async fn async_main(args: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = ServerConfig {
        port: args.port,
        host: args.host,
        secret: args.secret,
    };

    match args.db_path {
        Some(db_path) => {
            info!("Opening database at {:?}", db_path);
            serve(PersistentStore::open(db_path)?, config).await;
        }
        None => {
            info!("No database path given, serving an in-memory database");
            serve(MemoryStore::new(), config).await;
        }
    }

    Ok(())
}

async fn serve<S>(store: S, config: ServerConfig)
where
    S: RemoteStore<Error = StoreError> + 'static,
{
    let server = RtdbServer::new(Arc::new(store), config);
    server.run().await;
}
