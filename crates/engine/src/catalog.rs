//! `Catalog`: owns the transaction manager, the store registry, and the
//! client pool, and is the thread-safe entry point applications actually
//! talk to.
//!
//! `TxManager` itself has no internal locking (see its own docs); `Catalog`
//! is what makes a single manager safely shared across threads, by holding
//! it behind one mutex and exposing the manager's API as short,
//! lock-held-only-for-the-call methods.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::info;
use txm_concurrency::TxManager;
use txm_core::{ClientId, Result, StoreId, TxId};
use txm_durability::LogConfig;
use txm_storage::{MapStoreRegistry, ObjectStore};

use crate::client_pool::SystemClientPool;

/// The directory name, relative to a catalog's data directory, the
/// transaction log and status file live under.
pub const SYSTEM_DIR_NAME: &str = "sys";

/// Owns every store registered with it and the manager that coordinates
/// transactions across them.
pub struct Catalog {
    dir: PathBuf,
    registry: Arc<MapStoreRegistry>,
    manager: Mutex<TxManager>,
}

impl Catalog {
    /// Create a catalog rooted at `dir`. The transaction log lives at
    /// `dir/sys`; it is not opened until [`Catalog::enable`] is called, so
    /// stores can still be registered first.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let registry = Arc::new(MapStoreRegistry::new());
        let pool = SystemClientPool::new();
        let manager = TxManager::new(registry.clone(), pool);
        Self { dir, registry, manager: Mutex::new(manager) }
    }

    /// Register a store under its own id. Must happen before `enable` picks
    /// up any transactions that would enlist it, though the manager itself
    /// doesn't require it.
    pub fn register_store(&self, store: Arc<dyn ObjectStore>) {
        self.registry.insert(store);
    }

    /// System directory (`dir/sys`) the log lives in.
    pub fn system_dir(&self) -> PathBuf {
        self.dir.join(SYSTEM_DIR_NAME)
    }

    /// Open (or recover) the log with the default rotation threshold and
    /// start accepting transactions.
    pub fn enable(&self) -> Result<bool> {
        self.enable_with_config(LogConfig::default())
    }

    /// Like [`Catalog::enable`], with an explicit rotation threshold.
    pub fn enable_with_config(&self, config: LogConfig) -> Result<bool> {
        let dir = self.system_dir();
        let ok = self.manager.lock().enable(&dir, config)?;
        if ok {
            info!(dir = %dir.display(), "catalog enabled");
        }
        Ok(ok)
    }

    /// Drain every in-flight transaction and close the log.
    pub fn disable(&self, abort: bool) -> Result<bool> {
        self.manager.lock().disable(abort)
    }

    /// Disable and move to the terminal closed state.
    pub fn close(&self, cause: Option<String>) -> Result<()> {
        self.manager.lock().close(cause)
    }

    /// Begin a new write transaction for `client_id`.
    pub fn begin(&self, client_id: impl Into<ClientId>, client_tx: impl Into<String>) -> Result<TxId> {
        self.manager.lock().begin(client_id.into(), client_tx.into(), false)
    }

    /// Enlist `store_id` into `write_id`.
    pub fn enlist(&self, store_id: impl Into<StoreId>, write_id: TxId) -> Result<TxId> {
        self.manager.lock().enlist(store_id.into(), write_id)
    }

    /// Queue `write_id` for commit without blocking the rest of the
    /// pipeline on it.
    pub fn enqueue_commit(&self, write_id: TxId) -> Result<()> {
        self.manager.lock().enqueue_commit(write_id)
    }

    /// Run the prepare pipeline for every queued transaction.
    pub fn drain(&self) -> Result<()> {
        self.manager.lock().drain()
    }

    /// Commit `write_id`, blocking until its outcome is known.
    pub fn commit(&self, write_id: TxId) -> Result<bool> {
        self.manager.lock().commit(write_id)
    }

    /// Roll back a still-open transaction.
    pub fn rollback(&self, write_id: TxId) -> Result<()> {
        self.manager.lock().rollback(write_id)
    }

    /// The last commit id durably recorded in the log.
    pub fn last_committed(&self) -> TxId {
        self.manager.lock().last_committed()
    }

    /// `true` once `enable` has succeeded and before `disable`/`close`.
    pub fn is_enabled(&self) -> bool {
        self.manager.lock().is_enabled()
    }

    /// The data directory this catalog was created with.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}
