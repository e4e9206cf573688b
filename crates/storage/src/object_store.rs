//! The `ObjectStore` contract.
//!
//! `ObjectStore` is the one interface through which the transaction manager
//! talks to per-`DBObject` storage shards. The manager only ever sees this
//! trait — it has no idea how a store keeps its data, only that it can be
//! asked to prepare, seal, commit or roll back a write id, and that it may
//! optionally carry validators/rectifiers/distributors to run during the
//! corresponding prepare-pipeline phase.
//!
//! Building real, persistent storage shards is explicitly out of scope for
//! this crate (see the spec's Non-goals) — what lives here is the contract
//! and the small in-memory [`mock`] implementation used by the concurrency
//! crate's own tests.

use txm_core::{Distributor, Rectifier, Result, StoreId, TxId, Validator};

/// Outcome of asking a store to prepare a write id.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PrepareResult {
    /// The store detected a conflict and has already rolled itself back;
    /// it should be dropped from the transaction's enlisted set without a
    /// further `rollback` call.
    FailedRolledBack,
    /// The store had nothing to commit (e.g. a write that was a no-op) and
    /// should be dropped from the enlisted set silently.
    CommittedNoChanges,
    /// The store has staged its changes under `prepare_id` and is ready to
    /// be sealed.
    Prepared,
}

/// A storage shard, as seen by the transaction manager.
///
/// # Contract
/// - `prepare`/`commit`/`rollback`/`seal_prepare` are all keyed by `write_id`
///   — the store is expected to have recorded which prepare/commit attempt
///   is in flight when `enlist` was first called with that id.
/// - `seal_prepare` must return the exact JSON fragment that will be
///   embedded verbatim in the durable log record under this store's path.
pub trait ObjectStore: Send + Sync {
    /// Stable id this store is registered under in the catalog.
    fn store_id(&self) -> &StoreId;

    /// Path recorded in the catalog; used as the JSON key for this store's
    /// seal fragment in commit log records.
    fn path(&self) -> &str;

    /// Stage the transaction's writes under `prepare_id`.
    fn prepare(&self, write_id: TxId, prepare_id: TxId) -> PrepareResult;

    /// Capture this store's effect on the transaction as a JSON fragment
    /// and freeze it; called once prepare (and any rectify/distribute
    /// mutation) has finished for this store.
    fn seal_prepare(&self, write_id: TxId) -> String;

    /// Make the prepared writes visible. An `Err` here means the store
    /// failed after its commit record was already made durable; the
    /// manager treats the transaction as heuristically rolled back and
    /// surfaces a fatal inconsistency to its caller.
    fn commit(&self, write_id: TxId) -> Result<()>;

    /// Discard the prepared (or partially staged) writes.
    fn rollback(&self, write_id: TxId);

    /// Validators attached to this store; empty by default.
    fn validators(&self) -> &[std::sync::Arc<dyn Validator>] {
        &[]
    }

    /// Rectifiers attached to this store; empty by default.
    fn rectifiers(&self) -> &[std::sync::Arc<dyn Rectifier>] {
        &[]
    }

    /// Distributors attached to this store; empty by default.
    fn distributors(&self) -> &[std::sync::Arc<dyn Distributor>] {
        &[]
    }
}

/// Resolves store ids to live store handles. Supplied by the catalog that
/// owns both the manager and the stores it enlists.
pub trait StoreRegistry: Send + Sync {
    /// Look up a store by id.
    fn store(&self, id: &StoreId) -> Option<std::sync::Arc<dyn ObjectStore>>;
}
