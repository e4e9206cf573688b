//! The default [`ClientPool`]/[`Client`] pairing used by [`crate::Catalog`].
//!
//! Trigger callbacks never need anything from a system client beyond a
//! stable identity for logging; applications that need richer per-trigger
//! state are expected to supply their own `ClientPool` instead of this one.

use parking_lot::Mutex;
use std::sync::Arc;
use tracing::trace;
use txm_core::{Client, ClientPool, Result};
use uuid::Uuid;

/// A client with no state beyond an id, suitable for trigger callbacks that
/// don't need their own cache or connection.
#[derive(Debug)]
pub struct SystemClient {
    id: Uuid,
}

impl SystemClient {
    /// This client's identity.
    pub fn id(&self) -> Uuid {
        self.id
    }
}

impl Client for SystemClient {}

/// A pool of [`SystemClient`]s, recycled rather than recreated between
/// transactions.
pub struct SystemClientPool {
    idle: Mutex<Vec<Arc<dyn Client>>>,
}

impl SystemClientPool {
    /// An empty pool; clients are created lazily on first allocation.
    pub fn new() -> Arc<Self> {
        Arc::new(Self { idle: Mutex::new(Vec::new()) })
    }
}

impl Default for SystemClientPool {
    fn default() -> Self {
        Self { idle: Mutex::new(Vec::new()) }
    }
}

impl ClientPool for SystemClientPool {
    fn allocate(&self) -> Result<Arc<dyn Client>> {
        let mut idle = self.idle.lock();
        if let Some(client) = idle.pop() {
            return Ok(client);
        }
        let client = Arc::new(SystemClient { id: Uuid::new_v4() });
        trace!(id = %client.id, "allocated new system client");
        Ok(client)
    }

    fn recycle(&self, client: Arc<dyn Client>) {
        self.idle.lock().push(client);
    }
}
