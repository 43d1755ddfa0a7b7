//! This package contains the persistence layer for listing records. Records are keyed by an
//! externally supplied `id` and stored as one JSON object each under a `listings/` prefix in an
//! object store. A `put` on a key is last-write-wins, which gives the upsert its idempotency and
//! resolves concurrent writers to the same `id` without any additional locking.
//!
//! The object store handle is established lazily and cached for the process lifetime by
//! [`connection::StoreConnection`]; concurrent callers during establishment share the in-flight
//! attempt rather than racing to create duplicate connections.

pub mod connection;
mod listing;
mod store;

pub use connection::{StoreConfig, StoreConnection, StoreKind};
pub use listing::{Host, Listing};
pub use store::ObjectStoreListingStore;

use async_trait::async_trait;
use std::fmt::Debug;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("listing is missing an id")]
    MissingId,

    #[error("a data directory is required for the file object store")]
    DataDirRequired,

    #[error("failed to connect to object store: {0}")]
    Connect(#[source] object_store::Error),

    #[error("object store error: {0}")]
    ObjectStore(#[from] object_store::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The store for listing records, offering upserts keyed by the listing `id` and a capped read of
/// what has been stored.
///
/// Upserts use a field-level merge: an incoming `Some` field replaces the stored value, an
/// incoming `None` leaves the stored value intact, and `host` is replaced wholesale when present.
/// Exactly one record exists per distinct `id` at any time.
#[async_trait]
pub trait ListingStore: Debug + Send + Sync + 'static {
    /// Upserts a single listing. The listing must carry a non-empty `id`; the write merges onto
    /// any record already stored under that `id`, or creates one. A single `put` makes the write
    /// atomic from the caller's point of view.
    async fn upsert(&self, listing: Listing) -> Result<()>;

    /// Upserts a batch of listings best-effort. Items without an `id` are skipped, not failed.
    /// The writes are unordered with respect to failure: one failing item never aborts the rest
    /// of the batch. Per-item failures are reported in the returned [`BatchOutcome`] rather than
    /// as an error.
    ///
    /// The batch as a whole only fails when the store connection cannot be acquired.
    async fn upsert_batch(&self, listings: Vec<Listing>) -> Result<BatchOutcome>;

    /// Returns at most `limit` stored listings. Stored objects that fail to decode are logged
    /// and skipped.
    async fn list(&self, limit: usize) -> Result<Vec<Listing>>;
}

/// The result of a best-effort batch upsert.
///
/// The HTTP contract only reports aggregate success, but the per-item failures are carried here
/// so that stricter callers can inspect them.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Number of items a write was attempted for.
    pub attempted: usize,
    /// Number of items skipped because they carried no `id`.
    pub skipped: usize,
    /// The items whose write failed.
    pub failures: Vec<BatchItemError>,
}

impl BatchOutcome {
    /// True when every attempted write succeeded.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// A single failed item in a batch upsert.
#[derive(Debug, PartialEq, Eq)]
pub struct BatchItemError {
    /// The `id` of the listing that failed to persist.
    pub id: String,
    /// The error message, for logs only.
    pub error: String,
}
