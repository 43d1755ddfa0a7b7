//! HTTP route handling for the listing ingest and query endpoints.

use crate::{render, CommonServerState};
use bytes::{Bytes, BytesMut};
use http::header::CONTENT_TYPE;
use hyper::body::HttpBody;
use hyper::{Body, Method, Request, Response, StatusCode};
use listingd_store::{Listing, ListingStore};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info};

#[derive(Debug, Error)]
pub enum Error {
    /// The request carried no `data` field, an empty array, or a body that does not parse.
    #[error("Invalid JSON data format")]
    InvalidDataFormat,

    /// A single-record write without an `id`.
    #[error("Missing ID for single record")]
    MissingId,

    /// The client disconnected while sending the body.
    #[error("client disconnected: {0}")]
    ClientHangup(#[source] hyper::Error),

    /// The request body exceeds the configured maximum.
    #[error("max request size ({0} bytes) exceeded")]
    RequestSizeExceeded(usize),

    /// The query string could not be parsed.
    #[error("invalid query string: {0}")]
    InvalidQueryString(#[from] serde_urlencoded::de::Error),

    /// A `limit` of zero asks for nothing; reject it rather than answer like an empty store.
    #[error("invalid limit: must be greater than zero")]
    InvalidLimit,

    /// The store failed while persisting; detail stays in the logs.
    #[error("failed to persist data: {0}")]
    Persist(#[source] listingd_store::Error),

    /// The detached bulk write task panicked or was aborted.
    #[error("bulk write task failed: {0}")]
    BulkWriteTask(#[from] tokio::task::JoinError),

    /// The store failed while reading; detail stays in the logs.
    #[error("failed to load data: {0}")]
    Retrieval(#[source] listingd_store::Error),

    /// Empty result set on read. Not a failure, but surfaced as 404.
    #[error("no data found")]
    NoData,
}

impl Error {
    /// Distinguishes server faults (logged at error level, generic body) from client errors.
    fn is_internal(&self) -> bool {
        matches!(
            self,
            Self::Persist(_) | Self::Retrieval(_) | Self::BulkWriteTask(_)
        )
    }

    fn into_response(self) -> Response<Body> {
        match self {
            Self::InvalidDataFormat | Self::MissingId => {
                json_error_response(StatusCode::BAD_REQUEST, &self.to_string())
            }
            Self::ClientHangup(_)
            | Self::RequestSizeExceeded(_)
            | Self::InvalidQueryString(_)
            | Self::InvalidLimit => json_error_response(StatusCode::BAD_REQUEST, &self.to_string()),
            // internal detail never reaches the response body
            Self::Persist(_) | Self::BulkWriteTask(_) => {
                json_error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to save data")
            }
            Self::Retrieval(_) => plain_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error loading data",
            ),
            Self::NoData => plain_response(StatusCode::NOT_FOUND, "No data found"),
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorMessage {
    error: String,
}

#[derive(Debug, Serialize)]
struct SavedMessage {
    message: String,
}

#[derive(Debug, Serialize)]
struct ProcessingMessage {
    message: String,
    status: &'static str,
}

/// Body of a request to the save endpoint: a single record or a non-empty array of records.
#[derive(Debug, Deserialize)]
struct SavePayload {
    #[serde(default)]
    data: Option<SaveData>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SaveData {
    Many(Vec<Listing>),
    One(Box<Listing>),
}

/// Query string accepted by the read endpoints.
#[derive(Debug, Deserialize)]
struct QueryParams {
    limit: Option<usize>,
}

/// The HTTP API, shared across all in-flight requests.
#[derive(Debug)]
pub struct HttpApi {
    state: CommonServerState,
    store: Arc<dyn ListingStore>,
}

impl HttpApi {
    pub fn new(state: CommonServerState, store: Arc<dyn ListingStore>) -> Self {
        Self { state, store }
    }

    /// `POST /save` and `POST /api/save`
    async fn save(&self, req: Request<Body>) -> Result<Response<Body>, Error> {
        let body = self.read_body(req).await?;
        let payload: SavePayload =
            serde_json::from_slice(&body).map_err(|_| Error::InvalidDataFormat)?;

        match payload.data {
            None => Err(Error::InvalidDataFormat),
            Some(SaveData::Many(items)) if items.is_empty() => Err(Error::InvalidDataFormat),
            Some(SaveData::One(listing)) => {
                if !listing.has_id() {
                    return Err(Error::MissingId);
                }
                self.store.upsert(*listing).await.map_err(Error::Persist)?;
                json_response(
                    StatusCode::OK,
                    &SavedMessage {
                        message: "Single record saved".to_string(),
                    },
                )
            }
            Some(SaveData::Many(items)) => self.save_batch(items).await,
        }
    }

    /// Runs a batch write with a wall-clock budget. When the budget is exceeded the write keeps
    /// running in a detached task and the handler answers early with 202; the handler returns
    /// exactly once, so no request can ever see two responses.
    async fn save_batch(&self, items: Vec<Listing>) -> Result<Response<Body>, Error> {
        let count = items.len();
        let store = Arc::clone(&self.store);
        let mut write = tokio::spawn(async move { store.upsert_batch(items).await });

        match tokio::time::timeout(self.state.bulk_write_timeout(), &mut write).await {
            Ok(joined) => {
                let outcome = joined?.map_err(Error::Persist)?;
                if !outcome.is_complete() {
                    // best-effort batch: per-item failures are logged, not surfaced
                    error!(
                        attempted = outcome.attempted,
                        failed = outcome.failures.len(),
                        "batch write completed with per-item failures"
                    );
                }
                json_response(
                    StatusCode::OK,
                    &SavedMessage {
                        message: format!("Saved {count} records"),
                    },
                )
            }
            Err(_) => {
                info!(count, "bulk write exceeded budget, continuing in background");
                // not cancelled: the spawned write completes or fails on its own, and the
                // follow-up task gets its outcome into the logs
                tokio::spawn(async move {
                    match write.await {
                        Ok(Ok(outcome)) => info!(
                            attempted = outcome.attempted,
                            skipped = outcome.skipped,
                            failed = outcome.failures.len(),
                            "background bulk write finished"
                        ),
                        Ok(Err(error)) => error!(%error, "background bulk write failed"),
                        Err(error) => error!(%error, "background bulk write task failed"),
                    }
                });
                json_response(
                    StatusCode::ACCEPTED,
                    &ProcessingMessage {
                        message: format!("Saving {count} records"),
                        status: "processing",
                    },
                )
            }
        }
    }

    /// `GET /` — HTML table of stored listings.
    async fn query_html(&self, req: Request<Body>) -> Result<Response<Body>, Error> {
        let listings = self.fetch(&req).await?;
        let html = render::listings_table(&listings);
        Ok(Response::builder()
            .status(StatusCode::OK)
            .header(CONTENT_TYPE, "text/html; charset=utf-8")
            .body(Body::from(html))
            .unwrap())
    }

    /// `GET /api/listings` — JSON array of stored listings.
    async fn query_json(&self, req: Request<Body>) -> Result<Response<Body>, Error> {
        let listings = self.fetch(&req).await?;
        json_response(StatusCode::OK, &listings)
    }

    /// `GET /health` — independent of store connectivity.
    fn health(&self) -> Result<Response<Body>, Error> {
        json_response(StatusCode::OK, &serde_json::json!({"status": "online"}))
    }

    async fn fetch(&self, req: &Request<Body>) -> Result<Vec<Listing>, Error> {
        let params: QueryParams = serde_urlencoded::from_str(req.uri().query().unwrap_or_default())?;
        let limit = match params.limit {
            Some(0) => return Err(Error::InvalidLimit),
            Some(limit) => limit,
            None => self.state.query_limit(),
        };

        let listings = self.store.list(limit).await.map_err(Error::Retrieval)?;
        if listings.is_empty() {
            return Err(Error::NoData);
        }
        Ok(listings)
    }

    /// Collects the request body, applying the configured size limit.
    async fn read_body(&self, req: Request<Body>) -> Result<Bytes, Error> {
        let max_size = self.state.max_request_size();
        let mut payload = req.into_body();

        let mut body = BytesMut::new();
        while let Some(chunk) = payload.data().await {
            let chunk = chunk.map_err(Error::ClientHangup)?;
            if body.len() + chunk.len() > max_size {
                return Err(Error::RequestSizeExceeded(max_size));
            }
            body.extend_from_slice(&chunk);
        }
        Ok(body.freeze())
    }
}

pub(crate) async fn route_request(
    http: Arc<HttpApi>,
    req: Request<Body>,
) -> Result<Response<Body>, Infallible> {
    let method = req.method().clone();
    let uri = req.uri().clone();
    debug!(%method, %uri, "processing request");

    let response = match (&method, uri.path()) {
        (&Method::POST, "/save" | "/api/save") => http.save(req).await,
        (&Method::GET, "/") => http.query_html(req).await,
        (&Method::GET, "/api/listings") => http.query_json(req).await,
        (&Method::GET, "/health") => http.health(),
        (_, "/save" | "/api/save" | "/" | "/api/listings" | "/health") => {
            Ok(plain_response(StatusCode::METHOD_NOT_ALLOWED, "unsupported method"))
        }
        _ => Ok(plain_response(StatusCode::NOT_FOUND, "not found")),
    };

    match response {
        Ok(response) => {
            debug!(%method, %uri, status = %response.status(), "request processed");
            Ok(response)
        }
        Err(e) => {
            if e.is_internal() {
                error!(error = %e, %method, %uri, "error while handling request");
            } else {
                debug!(error = %e, %method, %uri, "client error while handling request");
            }
            Ok(e.into_response())
        }
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Result<Response<Body>, Error> {
    let serialized = serde_json::to_string(body).expect("serializing response body");
    Ok(Response::builder()
        .status(status)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(serialized))
        .unwrap())
}

fn json_error_response(status: StatusCode, message: &str) -> Response<Body> {
    let serialized = serde_json::to_string(&ErrorMessage {
        error: message.to_string(),
    })
    .expect("serializing error body");
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(serialized))
        .unwrap()
}

fn plain_response(status: StatusCode, message: &'static str) -> Response<Body> {
    Response::builder()
        .status(status)
        .body(Body::from(message))
        .unwrap()
}
