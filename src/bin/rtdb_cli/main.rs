// src/bin/rtdb_cli/main.rs
//! Command line access to the CRUD proxy
//!
//! Runs one operation against a REST endpoint or a local sled database
//! and prints the result as JSON.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use std::path::PathBuf;

use rtdb_proxy::{CrudProxy, PersistentStore, RemoteStore, RestConfig, RestStore, Value};

#[derive(Parser)]
#[command(name = "rtdb")]
#[command(about = "CRUD operations on a realtime database", long_about = None)]
struct Cli {
    /// Base URL of the database REST endpoint
    #[arg(short, long, conflicts_with = "db_path")]
    url: Option<String>,

    /// Token sent as the `auth` query parameter
    #[arg(short, long, requires = "url")]
    auth: Option<String>,

    /// Use a local database directory instead of a REST endpoint
    #[arg(short, long)]
    db_path: Option<PathBuf>,

    /// Command to run
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an entry, replacing whatever is at the path
    Create {
        path: String,
        /// JSON value to store
        data: String,
    },

    /// Read the data at a path
    Read { path: String },

    /// Merge a JSON object into the data at a path
    Update {
        path: String,
        /// JSON object whose children are written
        data: String,
    },

    /// Delete the data at a path
    Delete { path: String },
}

fn parse_json(data: &str) -> Result<Value> {
    let json: serde_json::Value =
        serde_json::from_str(data).with_context(|| format!("`{}` is not valid JSON", data))?;
    Ok(Value::from(json))
}

async fn execute<S: RemoteStore>(proxy: CrudProxy<S>, command: Commands) -> Result<()> {
    match command {
        Commands::Create { path, data } => {
            proxy.create(&path, parse_json(&data)?).await?;
            println!("Created entry at {}", path);
        }
        Commands::Read { path } => {
            let value = proxy.read(&path).await?.unwrap_or(Value::Null);
            println!("{}", serde_json::to_string_pretty(&serde_json::Value::from(value))?);
        }
        Commands::Update { path, data } => {
            proxy.update(&path, parse_json(&data)?).await?;
            println!("Updated data at {}", path);
        }
        Commands::Delete { path } => {
            proxy.delete(&path).await?;
            println!("Deleted data at {}", path);
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    match cli.db_path {
        Some(db_path) => {
            info!("Using local database at {:?}", db_path);
            let store = PersistentStore::open(db_path)?;
            execute(CrudProxy::new(store), cli.command).await
        }
        None => {
            let mut config = RestConfig::default();
            if let Some(url) = cli.url {
                config.base_url = url;
            }
            config.auth = cli.auth;

            info!("Using REST endpoint {}", config.base_url);
            let store = RestStore::new(config)?;
            execute(CrudProxy::new(store), cli.command).await
        }
    }
}
