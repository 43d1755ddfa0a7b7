//! HTTP API for the listingd server.
//!
//! The server accepts listing records on the ingest path, single or batched, and serves stored
//! records back either as an HTML table or as a JSON listing. All handlers share one
//! [`listingd_store::ListingStore`]; the backing connection is established lazily by the store on
//! the first request that needs it.

pub mod http;
mod render;

pub use crate::http::HttpApi;

use hyper::server::conn::{AddrIncoming, AddrStream};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// State shared by every request handler.
#[derive(Debug, Clone)]
pub struct CommonServerState {
    max_request_size: usize,
    query_limit: usize,
    bulk_write_timeout: Duration,
}

impl CommonServerState {
    pub fn new(max_request_size: usize, query_limit: usize, bulk_write_timeout: Duration) -> Self {
        Self {
            max_request_size,
            query_limit,
            bulk_write_timeout,
        }
    }

    /// Maximum accepted request body size, in bytes.
    pub fn max_request_size(&self) -> usize {
        self.max_request_size
    }

    /// Default cap on the number of records a read returns.
    pub fn query_limit(&self) -> usize {
        self.query_limit
    }

    /// Wall-clock budget for a bulk write before the handler answers early with a
    /// "processing" response while the write continues in the background.
    pub fn bulk_write_timeout(&self) -> Duration {
        self.bulk_write_timeout
    }
}

/// Serves the HTTP API until `shutdown` is cancelled.
pub async fn serve(
    http: Arc<HttpApi>,
    addr: AddrIncoming,
    shutdown: CancellationToken,
) -> Result<(), hyper::Error> {
    hyper::Server::builder(addr)
        .serve(hyper::service::make_service_fn(move |_conn: &AddrStream| {
            let http = Arc::clone(&http);
            let service = hyper::service::service_fn(move |request| {
                http::route_request(Arc::clone(&http), request)
            });
            futures::future::ready(Ok::<_, Infallible>(service))
        }))
        .with_graceful_shutdown(shutdown.cancelled())
        .await
}
