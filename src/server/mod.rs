// src/server/mod.rs
//! HTTP server for rtdb-proxy
//!
//! Serves any store over the realtime-database REST protocol, so a
//! `RestStore` (and thus a `CrudProxy`) can run against a local instance.

pub mod routes;

use std::future::Future;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use log::info;
use warp::{Filter, Rejection, Reply};

use crate::core::errors::StoreError;
use crate::core::store::RemoteStore;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Listening port
    pub port: u16,
    /// Listening address
    pub host: IpAddr,
    /// Shared secret clients must send as `?auth=`; open access when `None`
    pub secret: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            port: 3000,
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            secret: None,
        }
    }
}

/// HTTP server over a shared store
pub struct RtdbServer<S> {
    store: Arc<S>,
    config: ServerConfig,
}

impl<S> RtdbServer<S>
where
    S: RemoteStore<Error = StoreError> + 'static,
{
    /// Create a new server over the store provided
    pub fn new(store: Arc<S>, config: ServerConfig) -> Self {
        RtdbServer { store, config }
    }

    /// All routes: `/health` plus the REST resources
    pub fn routes(&self) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
        let health_route = warp::path("health")
            .and(warp::path::end())
            .and(warp::get())
            .map(|| "rtdb server is running");

        let api_routes = routes::api_routes(Arc::clone(&self.store), self.config.secret.clone());

        health_route
            .or(api_routes)
            .with(warp::log("rtdb_proxy::server"))
    }

    /// Start the server and run until the process stops
    pub async fn run(&self) {
        let addr = SocketAddr::from((self.config.host, self.config.port));
        info!("rtdb server running at {}", addr);

        warp::serve(self.routes()).run(addr).await;
    }

    /// Bind on an OS-assigned port of the configured host.
    ///
    /// Returns the bound address and the future serving requests.
    pub fn bind_ephemeral(&self) -> (SocketAddr, impl Future<Output = ()> + 'static) {
        let (addr, server) = warp::serve(self.routes()).bind_ephemeral((self.config.host, 0));
        info!("rtdb server bound to {}", addr);
        (addr, server)
    }
}
