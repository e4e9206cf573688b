//! An in-memory [`ObjectStore`] test double.
//!
//! This is deliberately not a real storage shard — it keeps no on-disk
//! state and has no indexing or query surface. It exists so the
//! concurrency crate's tests can exercise the full prepare/commit/rollback
//! pipeline against something that implements the contract, without this
//! crate taking on the out-of-scope job of building a real shard engine.

use crate::object_store::{ObjectStore, PrepareResult};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use txm_core::{Client, Distributor, Error, Rectifier, Result, StoreId, TxId, Validator};

/// Record of calls a [`MockObjectStore`] has observed, for test assertions.
#[derive(Default, Clone, Debug)]
pub struct Calls {
    /// Write ids passed to `prepare`, in call order.
    pub prepared: Vec<TxId>,
    /// Write ids passed to `seal_prepare`, in call order.
    pub sealed: Vec<TxId>,
    /// Write ids passed to `commit`, in call order.
    pub committed: Vec<TxId>,
    /// Write ids passed to `rollback`, in call order.
    pub rolled_back: Vec<TxId>,
}

#[derive(Default)]
struct State {
    staged: HashMap<TxId, String>,
    fail_prepare: HashSet<TxId>,
    no_changes: HashSet<TxId>,
    fail_commit: HashSet<TxId>,
    calls: Calls,
}

/// A trivial, fully in-memory object store used in tests.
pub struct MockObjectStore {
    id: StoreId,
    path: String,
    state: Mutex<State>,
    validators: Vec<Arc<dyn Validator>>,
    rectifiers: Vec<Arc<dyn Rectifier>>,
    distributors: Vec<Arc<dyn Distributor>>,
}

impl MockObjectStore {
    /// Create a new mock store registered under `id`, whose seal fragments
    /// will be nested in commit records under `path`. Carries no triggers;
    /// attach them with [`Self::with_validators`]/[`Self::with_rectifiers`]/
    /// [`Self::with_distributors`] before enlisting any transaction.
    pub fn new(id: impl Into<StoreId>, path: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            id: id.into(),
            path: path.into(),
            state: Mutex::new(State::default()),
            validators: Vec::new(),
            rectifiers: Vec::new(),
            distributors: Vec::new(),
        })
    }

    /// Attach validators to this store. Only meaningful if called before the
    /// store is shared (i.e. right after [`Self::new`]).
    pub fn with_validators(mut self: Arc<Self>, validators: Vec<Arc<dyn Validator>>) -> Arc<Self> {
        Arc::get_mut(&mut self)
            .expect("with_validators must be called before the store is shared")
            .validators = validators;
        self
    }

    /// Attach rectifiers to this store. Only meaningful if called before the
    /// store is shared (i.e. right after [`Self::new`]).
    pub fn with_rectifiers(mut self: Arc<Self>, rectifiers: Vec<Arc<dyn Rectifier>>) -> Arc<Self> {
        Arc::get_mut(&mut self)
            .expect("with_rectifiers must be called before the store is shared")
            .rectifiers = rectifiers;
        self
    }

    /// Attach distributors to this store. Only meaningful if called before
    /// the store is shared (i.e. right after [`Self::new`]).
    pub fn with_distributors(mut self: Arc<Self>, distributors: Vec<Arc<dyn Distributor>>) -> Arc<Self> {
        Arc::get_mut(&mut self)
            .expect("with_distributors must be called before the store is shared")
            .distributors = distributors;
        self
    }

    /// Stage a JSON-ish fragment to be returned from `seal_prepare` for
    /// `write_id`, once it is prepared.
    pub fn stage(&self, write_id: TxId, fragment: impl Into<String>) {
        self.state.lock().staged.insert(write_id, fragment.into());
    }

    /// Make the next `prepare(write_id, _)` call return
    /// [`PrepareResult::FailedRolledBack`].
    pub fn fail_next_prepare(&self, write_id: TxId) {
        self.state.lock().fail_prepare.insert(write_id);
    }

    /// Make the next `prepare(write_id, _)` call return
    /// [`PrepareResult::CommittedNoChanges`].
    pub fn no_change_next_prepare(&self, write_id: TxId) {
        self.state.lock().no_changes.insert(write_id);
    }

    /// Make the next `commit(write_id)` call return `Err`.
    pub fn fail_next_commit(&self, write_id: TxId) {
        self.state.lock().fail_commit.insert(write_id);
    }

    /// Snapshot the calls observed so far.
    pub fn calls(&self) -> Calls {
        self.state.lock().calls.clone()
    }
}

impl ObjectStore for MockObjectStore {
    fn store_id(&self) -> &StoreId {
        &self.id
    }

    fn path(&self) -> &str {
        &self.path
    }

    fn prepare(&self, write_id: TxId, _prepare_id: TxId) -> PrepareResult {
        let mut st = self.state.lock();
        st.calls.prepared.push(write_id);
        if st.fail_prepare.remove(&write_id) {
            st.staged.remove(&write_id);
            PrepareResult::FailedRolledBack
        } else if st.no_changes.remove(&write_id) {
            st.staged.remove(&write_id);
            PrepareResult::CommittedNoChanges
        } else {
            st.staged.entry(write_id).or_insert_with(|| "null".to_string());
            PrepareResult::Prepared
        }
    }

    fn seal_prepare(&self, write_id: TxId) -> String {
        let mut st = self.state.lock();
        st.calls.sealed.push(write_id);
        st.staged.get(&write_id).cloned().unwrap_or_else(|| "null".to_string())
    }

    fn commit(&self, write_id: TxId) -> Result<()> {
        let mut st = self.state.lock();
        st.calls.committed.push(write_id);
        st.staged.remove(&write_id);
        if st.fail_commit.remove(&write_id) {
            return Err(Error::Store(format!("mock store failed to commit {write_id}")));
        }
        Ok(())
    }

    fn rollback(&self, write_id: TxId) {
        let mut st = self.state.lock();
        st.calls.rolled_back.push(write_id);
        st.staged.remove(&write_id);
    }

    fn validators(&self) -> &[Arc<dyn Validator>] {
        &self.validators
    }

    fn rectifiers(&self) -> &[Arc<dyn Rectifier>] {
        &self.rectifiers
    }

    fn distributors(&self) -> &[Arc<dyn Distributor>] {
        &self.distributors
    }
}

/// A [`Validator`] built from a closure, for tests that need to exercise a
/// validate-phase failure without a real application-level check.
pub struct FnValidator<F>(F);

impl<F> FnValidator<F>
where
    F: Fn(TxId) -> Result<bool> + Send + Sync,
{
    /// Wrap `f` as a validator; `f` receives the phase-tagged view id.
    pub fn new(f: F) -> Arc<Self> {
        Arc::new(Self(f))
    }
}

impl<F> Validator for FnValidator<F>
where
    F: Fn(TxId) -> Result<bool> + Send + Sync,
{
    fn validate(&self, _client: &dyn Client, view_tx_id: TxId) -> Result<bool> {
        (self.0)(view_tx_id)
    }
}

/// A [`Rectifier`] built from a closure, for tests.
pub struct FnRectifier<F>(F);

impl<F> FnRectifier<F>
where
    F: Fn(TxId) -> Result<bool> + Send + Sync,
{
    /// Wrap `f` as a rectifier; `f` receives the phase-tagged view id.
    pub fn new(f: F) -> Arc<Self> {
        Arc::new(Self(f))
    }
}

impl<F> Rectifier for FnRectifier<F>
where
    F: Fn(TxId) -> Result<bool> + Send + Sync,
{
    fn rectify(&self, _client: &dyn Client, view_tx_id: TxId) -> Result<bool> {
        (self.0)(view_tx_id)
    }
}

/// A [`Distributor`] built from a closure, for tests. `f` receives the write
/// id and the `enlist` callback and may call it to pull in more stores.
pub struct FnDistributor<F>(F);

impl<F> FnDistributor<F>
where
    F: Fn(TxId, &mut dyn FnMut(StoreId) -> Result<TxId>) -> Result<bool> + Send + Sync,
{
    /// Wrap `f` as a distributor.
    pub fn new(f: F) -> Arc<Self> {
        Arc::new(Self(f))
    }
}

impl<F> Distributor for FnDistributor<F>
where
    F: Fn(TxId, &mut dyn FnMut(StoreId) -> Result<TxId>) -> Result<bool> + Send + Sync,
{
    fn distribute(
        &self,
        _client: &dyn Client,
        write_id: TxId,
        enlist: &mut dyn FnMut(StoreId) -> Result<TxId>,
    ) -> Result<bool> {
        (self.0)(write_id, enlist)
    }
}

/// A [`StoreRegistry`][crate::object_store::StoreRegistry] backed by a
/// plain map, for tests and small embeddings that don't need anything
/// fancier.
#[derive(Default)]
pub struct MapStoreRegistry {
    stores: Mutex<HashMap<StoreId, Arc<dyn ObjectStore>>>,
}

impl MapStoreRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a store under its own id.
    pub fn insert(&self, store: Arc<dyn ObjectStore>) {
        self.stores.lock().insert(store.store_id().clone(), store);
    }
}

impl crate::object_store::StoreRegistry for MapStoreRegistry {
    fn store(&self, id: &StoreId) -> Option<Arc<dyn ObjectStore>> {
        self.stores.lock().get(id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prepare_then_seal_returns_staged_fragment() {
        let store = MockObjectStore::new("s1", "objects/s1");
        store.stage(-4, r#"{"k":"v"}"#);
        assert_eq!(store.prepare(-4, 1), PrepareResult::Prepared);
        assert_eq!(store.seal_prepare(-4), r#"{"k":"v"}"#);
        assert_eq!(store.calls().prepared, vec![-4]);
    }

    #[test]
    fn fail_next_prepare_reports_failed_rolled_back() {
        let store = MockObjectStore::new("s1", "objects/s1");
        store.fail_next_prepare(-4);
        assert_eq!(store.prepare(-4, 1), PrepareResult::FailedRolledBack);
    }
}
