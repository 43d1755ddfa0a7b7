//! Entrypoint for the listingd server

use hyper::server::conn::AddrIncoming;
use listingd_server::{serve, CommonServerState, HttpApi};
use listingd_store::{ObjectStoreListingStore, StoreConfig, StoreConnection};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// The default bind address for the HTTP API.
pub const DEFAULT_HTTP_BIND_ADDR: &str = "0.0.0.0:8080";

#[derive(Debug, Error)]
pub enum Error {
    #[error("a data directory is required when using the file object store (--data-dir)")]
    DataDirRequired,

    #[error("failed to bind address {addr}: {source}")]
    BindAddress {
        addr: SocketAddr,
        source: hyper::Error,
    },

    #[error("server error: {0}")]
    Server(#[from] hyper::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Which backing object store implementation to run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum StoreType {
    /// In-process store, contents are lost on shutdown
    Memory,
    /// Store records as files under the data directory
    File,
}

#[derive(Debug, clap::Parser)]
pub struct Config {
    /// Which object store implementation to use
    #[clap(
        value_enum,
        long = "object-store",
        env = "LISTINGD_OBJECT_STORE",
        default_value = "memory",
        action
    )]
    object_store: StoreType,

    /// The directory to store files in, required when using the file object store
    #[clap(long = "data-dir", env = "LISTINGD_DATA_DIR", action)]
    data_dir: Option<PathBuf>,

    /// The address on which the server will serve its HTTP API
    #[clap(
        long = "http-bind",
        env = "LISTINGD_HTTP_BIND_ADDR",
        default_value = DEFAULT_HTTP_BIND_ADDR,
        action
    )]
    http_bind_address: SocketAddr,

    /// Maximum size of HTTP requests.
    #[clap(
        long = "max-http-request-size",
        env = "LISTINGD_MAX_HTTP_REQUEST_SIZE",
        default_value = "10485760", // 10 MiB
        action
    )]
    max_http_request_size: usize,

    /// Maximum number of records returned by a single query
    #[clap(
        long = "query-limit",
        env = "LISTINGD_QUERY_LIMIT",
        default_value = "100",
        action
    )]
    query_limit: usize,

    /// Wall-clock budget for a bulk write before the server answers early
    /// with 202 and lets the write finish in the background
    #[clap(
        long = "bulk-write-timeout",
        env = "LISTINGD_BULK_WRITE_TIMEOUT",
        default_value = "10s",
        value_parser = humantime::parse_duration,
        action
    )]
    bulk_write_timeout: Duration,
}

impl Config {
    fn store_config(&self) -> Result<StoreConfig> {
        match self.object_store {
            StoreType::Memory => Ok(StoreConfig::memory()),
            StoreType::File => {
                // fail at startup rather than on the first request
                let data_dir = self.data_dir.clone().ok_or(Error::DataDirRequired)?;
                Ok(StoreConfig::file(data_dir))
            }
        }
    }
}

pub async fn command(config: Config) -> Result<()> {
    let store_config = config.store_config()?;
    info!(store = ?config.object_store, "connecting to object store");

    let connection = StoreConnection::new(store_config);
    let store = Arc::new(ObjectStoreListingStore::new(connection));

    let common_state = CommonServerState::new(
        config.max_http_request_size,
        config.query_limit,
        config.bulk_write_timeout,
    );
    let http = Arc::new(HttpApi::new(common_state, store));

    let addr = AddrIncoming::bind(&config.http_bind_address).map_err(|source| {
        Error::BindAddress {
            addr: config.http_bind_address,
            source,
        }
    })?;
    info!(address = %addr.local_addr(), "bound HTTP listener");

    let frontend_shutdown = CancellationToken::new();
    let shutdown = frontend_shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            shutdown.cancel();
        }
    });

    serve(http, addr, frontend_shutdown).await?;
    info!("server stopped");

    Ok(())
}
