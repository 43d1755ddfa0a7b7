//! Lazy, single-flight establishment of the object store handle.
//!
//! The handle is created on first use and cached for the remaining process lifetime. Concurrent
//! callers that arrive while establishment is still in flight await the same attempt; only its
//! failure is propagated to all of them, and a failed attempt leaves the cell empty so the next
//! caller may retry.

use crate::{Error, Result};
use object_store::{local::LocalFileSystem, memory::InMemory, ObjectStore};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::info;

/// Which object store implementation backs the listing store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    /// An in-process store, used by tests and throwaway deployments. Contents are lost when the
    /// process exits.
    Memory,
    /// A store backed by the local filesystem under `data_dir`.
    File,
}

/// Connection configuration for the backing store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub kind: StoreKind,
    /// Required for [`StoreKind::File`], ignored otherwise.
    pub data_dir: Option<PathBuf>,
}

impl StoreConfig {
    pub fn memory() -> Self {
        Self {
            kind: StoreKind::Memory,
            data_dir: None,
        }
    }

    pub fn file(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            kind: StoreKind::File,
            data_dir: Some(data_dir.into()),
        }
    }
}

/// The process-wide cache for the object store handle.
///
/// Owned by the listing store and injected where needed rather than accessed as ambient global
/// state. The handle is written at most once and read-only thereafter.
#[derive(Debug)]
pub struct StoreConnection {
    config: StoreConfig,
    handle: OnceCell<Arc<dyn ObjectStore>>,
    attempts: AtomicUsize,
}

impl StoreConnection {
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            handle: OnceCell::new(),
            attempts: AtomicUsize::new(0),
        }
    }

    /// A connection around an already-established handle, for callers that construct or wrap
    /// the object store themselves. `acquire` never runs establishment on such a connection.
    pub fn with_handle(handle: Arc<dyn ObjectStore>) -> Self {
        Self {
            config: StoreConfig::memory(),
            handle: OnceCell::new_with(Some(handle)),
            attempts: AtomicUsize::new(0),
        }
    }

    /// Returns the cached handle, establishing it on first use.
    ///
    /// No timeout is imposed here; callers that need one must wrap the future themselves.
    pub async fn acquire(&self) -> Result<Arc<dyn ObjectStore>> {
        let handle = self.handle.get_or_try_init(|| self.establish()).await?;
        Ok(Arc::clone(handle))
    }

    /// Number of establishment attempts made so far.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::Relaxed)
    }

    async fn establish(&self) -> Result<Arc<dyn ObjectStore>> {
        self.attempts.fetch_add(1, Ordering::Relaxed);
        let store: Arc<dyn ObjectStore> = match self.config.kind {
            StoreKind::Memory => Arc::new(InMemory::new()),
            StoreKind::File => {
                let data_dir = self.config.data_dir.as_ref().ok_or(Error::DataDirRequired)?;
                Arc::new(LocalFileSystem::new_with_prefix(data_dir).map_err(Error::Connect)?)
            }
        };
        info!(kind = ?self.config.kind, "object store connection established");
        Ok(store)
    }
}
