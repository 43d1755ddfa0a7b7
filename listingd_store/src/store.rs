//! Object-store-backed implementation of [`ListingStore`].

use crate::connection::StoreConnection;
use crate::{BatchItemError, BatchOutcome, Error, Listing, ListingStore, Result};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use object_store::path::Path;
use object_store::{ObjectStore, PutPayload};
use std::sync::Arc;
use tracing::{debug, warn};

/// Prefix all listing records are stored under.
const LISTINGS_PREFIX: &str = "listings";

/// How many writes of a batch are kept in flight at once.
const BATCH_WRITE_CONCURRENCY: usize = 8;

fn listing_path(id: &str) -> Path {
    Path::from(format!("{LISTINGS_PREFIX}/{id}.json"))
}

/// A [`ListingStore`] that keeps one JSON object per record in an object store, keyed by the
/// listing `id`. The store connection is acquired through the owned [`StoreConnection`], so the
/// first operation pays the establishment cost and everything after reuses the cached handle.
#[derive(Debug)]
pub struct ObjectStoreListingStore {
    connection: StoreConnection,
}

impl ObjectStoreListingStore {
    pub fn new(connection: StoreConnection) -> Self {
        Self { connection }
    }

    /// The connection cache backing this store.
    pub fn connection(&self) -> &StoreConnection {
        &self.connection
    }
}

/// Writes one listing, merging onto whatever is already stored under its `id`.
///
/// The read-merge-write is not transactional; concurrent writers to the same `id` resolve to
/// whichever `put` the store commits last.
async fn write_merged(store: Arc<dyn ObjectStore>, listing: Listing) -> Result<()> {
    let path = listing_path(&listing.id);
    let merged = match store.get(&path).await {
        Ok(existing) => {
            let bytes = existing.bytes().await?;
            match serde_json::from_slice::<Listing>(&bytes) {
                Ok(existing) => listing.merge_onto(existing),
                Err(error) => {
                    warn!(%path, %error, "stored listing is undecodable, replacing it");
                    listing
                }
            }
        }
        Err(object_store::Error::NotFound { .. }) => listing,
        Err(error) => return Err(error.into()),
    };

    let payload = serde_json::to_vec(&merged)?;
    store.put(&path, PutPayload::from(payload)).await?;
    debug!(id = %merged.id, "listing upserted");
    Ok(())
}

#[async_trait]
impl ListingStore for ObjectStoreListingStore {
    async fn upsert(&self, listing: Listing) -> Result<()> {
        if !listing.has_id() {
            return Err(Error::MissingId);
        }
        let store = self.connection.acquire().await?;
        write_merged(store, listing).await
    }

    async fn upsert_batch(&self, listings: Vec<Listing>) -> Result<BatchOutcome> {
        let store = self.connection.acquire().await?;

        let (valid, skipped): (Vec<_>, Vec<_>) =
            listings.into_iter().partition(Listing::has_id);
        let skipped = skipped.len();
        if skipped > 0 {
            warn!(skipped, "batch items without an id were skipped");
        }
        let attempted = valid.len();

        let failures: Vec<BatchItemError> = stream::iter(valid)
            .map(|listing| {
                let store = Arc::clone(&store);
                async move {
                    let id = listing.id.clone();
                    write_merged(store, listing).await.err().map(|error| {
                        warn!(%id, %error, "batch item failed to persist");
                        BatchItemError {
                            id,
                            error: error.to_string(),
                        }
                    })
                }
            })
            .buffer_unordered(BATCH_WRITE_CONCURRENCY)
            .filter_map(futures::future::ready)
            .collect()
            .await;

        Ok(BatchOutcome {
            attempted,
            skipped,
            failures,
        })
    }

    async fn list(&self, limit: usize) -> Result<Vec<Listing>> {
        let store = self.connection.acquire().await?;
        let prefix = Path::from(LISTINGS_PREFIX);

        let mut listings = Vec::new();
        let mut objects = store.list(Some(&prefix));
        while let Some(meta) = objects.next().await {
            if listings.len() >= limit {
                break;
            }
            let meta = meta?;
            let bytes = match store.get(&meta.location).await {
                Ok(result) => result.bytes().await?,
                Err(object_store::Error::NotFound { .. }) => continue,
                Err(error) => return Err(error.into()),
            };
            match serde_json::from_slice::<Listing>(&bytes) {
                Ok(listing) => listings.push(listing),
                Err(error) => {
                    warn!(path = %meta.location, %error, "skipping undecodable stored listing")
                }
            }
        }
        Ok(listings)
    }
}
