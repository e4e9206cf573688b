//! The `Client` collaborator: an opaque, application-level worker the
//! manager borrows to run trigger callbacks during the prepare pipeline.
//!
//! The manager never inspects a `Client`'s internals — it only acquires one
//! from a [`ClientPool`] before running validators/rectifiers/distributors,
//! and returns it afterward. Concrete pools and clients are supplied by the
//! catalog that owns the manager.

use crate::error::Result;
use std::fmt;
use std::sync::Arc;

/// An ephemeral worker used to execute application-level trigger logic.
/// Implementations are free to wrap whatever per-client state (e.g. a
/// deserialization cache) the application needs; the manager treats this
/// purely as a handle to pass to trigger callbacks.
pub trait Client: Send + Sync + fmt::Debug {}

/// A pool of system [`Client`] workers, supplied by the catalog. The manager
/// allocates one before running triggers for a transaction and recycles it
/// once the transaction terminates.
pub trait ClientPool: Send + Sync {
    /// Borrow (or create) a client for trigger execution.
    fn allocate(&self) -> Result<Arc<dyn Client>>;

    /// Return a client to the pool once it is no longer needed.
    fn recycle(&self, client: Arc<dyn Client>);
}
