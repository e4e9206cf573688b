//! The prepare/commit/rollback pipeline and the transaction manager that
//! drives it.
//!
//! This crate owns no storage and no log of its own: it coordinates
//! [`txm_storage::ObjectStore`] implementations through the
//! [`txm_storage::StoreRegistry`] it is given, and makes every commit
//! durable through a [`txm_durability::LogWriter`] it opens on `enable`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod manager;
pub mod record;

pub use manager::TxManager;
pub use record::{TxRecord, TxStatus};

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;
    use tempfile::tempdir;
    use txm_core::{Client, ClientPool, Error, Result};
    use txm_durability::LogConfig;
    use txm_storage::{FnDistributor, FnRectifier, FnValidator, MapStoreRegistry, MockObjectStore};

    #[derive(Debug)]
    struct NoopClient;
    impl Client for NoopClient {}

    struct NoopPool {
        allocations: AtomicU64,
    }
    impl NoopPool {
        fn new() -> Arc<Self> {
            Arc::new(Self { allocations: AtomicU64::new(0) })
        }
    }
    impl ClientPool for NoopPool {
        fn allocate(&self) -> Result<Arc<dyn Client>> {
            self.allocations.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(NoopClient))
        }
        fn recycle(&self, _client: Arc<dyn Client>) {}
    }

    fn manager_with(registry: Arc<MapStoreRegistry>) -> (TxManager, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let pool = NoopPool::new();
        let mut mgr = TxManager::new(registry, pool);
        assert!(mgr.enable(dir.path(), LogConfig::default()).unwrap());
        (mgr, dir)
    }

    #[test]
    fn begin_enlist_commit_with_no_triggers_round_trips() {
        let registry = Arc::new(MapStoreRegistry::new());
        let store = MockObjectStore::new("s1", "objects/s1");
        registry.insert(store.clone());
        let (mut mgr, _dir) = manager_with(registry);

        let write_id = mgr.begin("client-a".into(), "tx-handle".to_string(), false).unwrap();
        store.stage(write_id, r#"{"k":"v"}"#);
        let read_id = mgr.enlist("s1".into(), write_id).unwrap();
        assert_eq!(read_id, 0);

        let committed = mgr.commit(write_id).unwrap();
        assert!(committed);
        assert_eq!(mgr.last_committed(), 1);
        assert_eq!(store.calls().committed, vec![write_id]);
        assert!(mgr.status(write_id).is_none(), "terminated record should be gone");
    }

    #[test]
    fn commit_with_no_enlisted_stores_is_a_no_op_commit() {
        let registry = Arc::new(MapStoreRegistry::new());
        let (mut mgr, _dir) = manager_with(registry);
        let write_id = mgr.begin("client-a".into(), "tx".to_string(), false).unwrap();
        assert!(mgr.commit(write_id).unwrap());
        assert_eq!(mgr.last_committed(), 0, "no store was enlisted, nothing to log");
    }

    #[test]
    fn failed_prepare_rolls_back_every_enlisted_store() {
        let registry = Arc::new(MapStoreRegistry::new());
        let ok_store = MockObjectStore::new("ok", "objects/ok");
        let bad_store = MockObjectStore::new("bad", "objects/bad");
        registry.insert(ok_store.clone());
        registry.insert(bad_store.clone());
        let (mut mgr, _dir) = manager_with(registry);

        let write_id = mgr.begin("client-a".into(), "tx".to_string(), false).unwrap();
        mgr.enlist("ok".into(), write_id).unwrap();
        mgr.enlist("bad".into(), write_id).unwrap();
        bad_store.fail_next_prepare(write_id);

        let committed = mgr.commit(write_id).unwrap();
        assert!(!committed);
        assert_eq!(ok_store.calls().rolled_back, vec![write_id]);
        assert_eq!(mgr.last_committed(), 0);
    }

    #[test]
    fn client_already_has_open_transaction_is_rejected() {
        let registry = Arc::new(MapStoreRegistry::new());
        let (mut mgr, _dir) = manager_with(registry);
        mgr.begin("client-a".into(), "tx1".to_string(), false).unwrap();
        let err = mgr.begin("client-a".into(), "tx2".to_string(), false).unwrap_err();
        assert!(matches!(err, Error::IllegalState(_)));
    }

    #[test]
    fn rollback_before_commit_discards_enlisted_stores() {
        let registry = Arc::new(MapStoreRegistry::new());
        let store = MockObjectStore::new("s1", "objects/s1");
        registry.insert(store.clone());
        let (mut mgr, _dir) = manager_with(registry);

        let write_id = mgr.begin("client-a".into(), "tx".to_string(), false).unwrap();
        mgr.enlist("s1".into(), write_id).unwrap();
        mgr.rollback(write_id).unwrap();

        assert!(mgr.status(write_id).is_none());
        assert_eq!(store.calls().rolled_back, vec![write_id]);
        let err = mgr.rollback(write_id).unwrap_err();
        assert!(matches!(err, Error::IllegalState(_)));
    }

    #[test]
    fn disable_commits_sealed_transactions_unless_aborted() {
        let registry = Arc::new(MapStoreRegistry::new());
        let store = MockObjectStore::new("s1", "objects/s1");
        registry.insert(store.clone());
        let (mut mgr, _dir) = manager_with(registry);

        let write_id = mgr.begin("client-a".into(), "tx".to_string(), false).unwrap();
        mgr.enlist("s1".into(), write_id).unwrap();
        mgr.enqueue_commit(write_id).unwrap();
        // A transaction queued but not yet drained is still InFlight-derived
        // (Enqueued), not Sealed, so disable(false) rolls it back rather
        // than committing it; this exercises the non-sealed branch.
        assert!(mgr.disable(false).unwrap());
        assert_eq!(store.calls().rolled_back, vec![write_id]);
    }

    #[test]
    fn failing_validator_rolls_back_without_touching_the_store() {
        let registry = Arc::new(MapStoreRegistry::new());
        let store = MockObjectStore::new("s1", "objects/s1")
            .with_validators(vec![FnValidator::new(|_view_tx| Ok(false))]);
        registry.insert(store.clone());
        let (mut mgr, _dir) = manager_with(registry);

        let write_id = mgr.begin("client-a".into(), "tx".to_string(), false).unwrap();
        mgr.enlist("s1".into(), write_id).unwrap();

        let committed = mgr.commit(write_id).unwrap();
        assert!(!committed);
        assert_eq!(store.calls().rolled_back, vec![write_id]);
        assert_eq!(mgr.last_committed(), 0, "validation failed before any seal/commit");
    }

    #[test]
    fn passing_validator_lets_the_transaction_commit() {
        let registry = Arc::new(MapStoreRegistry::new());
        let store = MockObjectStore::new("s1", "objects/s1")
            .with_validators(vec![FnValidator::new(|_view_tx| Ok(true))]);
        registry.insert(store.clone());
        let (mut mgr, _dir) = manager_with(registry);

        let write_id = mgr.begin("client-a".into(), "tx".to_string(), false).unwrap();
        mgr.enlist("s1".into(), write_id).unwrap();
        store.stage(write_id, r#"{"k":"v"}"#);

        assert!(mgr.commit(write_id).unwrap());
        assert_eq!(mgr.last_committed(), 1);
    }

    #[test]
    fn rectifier_mutation_is_sealed_before_commit() {
        let registry = Arc::new(MapStoreRegistry::new());
        let store = MockObjectStore::new("s1", "objects/s1")
            .with_rectifiers(vec![FnRectifier::new(|_view_tx| Ok(true))]);
        registry.insert(store.clone());
        let (mut mgr, _dir) = manager_with(registry);

        let write_id = mgr.begin("client-a".into(), "tx".to_string(), false).unwrap();
        mgr.enlist("s1".into(), write_id).unwrap();
        store.stage(write_id, r#"{"rectified":true}"#);

        assert!(mgr.commit(write_id).unwrap());
        // A store with its own rectifier is sealed the moment its
        // rectifiers pass, i.e. before the final seal sweep.
        assert_eq!(store.calls().sealed, vec![write_id]);
        assert_eq!(mgr.last_committed(), 1);
    }

    #[test]
    fn failing_rectifier_rolls_the_transaction_back() {
        let registry = Arc::new(MapStoreRegistry::new());
        let store = MockObjectStore::new("s1", "objects/s1")
            .with_rectifiers(vec![FnRectifier::new(|_view_tx| Ok(false))]);
        registry.insert(store.clone());
        let (mut mgr, _dir) = manager_with(registry);

        let write_id = mgr.begin("client-a".into(), "tx".to_string(), false).unwrap();
        mgr.enlist("s1".into(), write_id).unwrap();

        assert!(!mgr.commit(write_id).unwrap());
        assert_eq!(store.calls().rolled_back, vec![write_id]);
    }

    #[test]
    fn distributor_enlists_another_store_which_gets_committed_too() {
        let registry = Arc::new(MapStoreRegistry::new());
        let primary = MockObjectStore::new("primary", "objects/primary").with_distributors(vec![
            FnDistributor::new(|_write_id, enlist| {
                enlist("secondary".into())?;
                Ok(true)
            }),
        ]);
        let secondary = MockObjectStore::new("secondary", "objects/secondary");
        registry.insert(primary.clone());
        registry.insert(secondary.clone());
        let (mut mgr, _dir) = manager_with(registry);

        let write_id = mgr.begin("client-a".into(), "tx".to_string(), false).unwrap();
        mgr.enlist("primary".into(), write_id).unwrap();
        primary.stage(write_id, r#"{"k":"v"}"#);
        secondary.stage(write_id, r#"{"k2":"v2"}"#);

        assert!(mgr.commit(write_id).unwrap());
        assert_eq!(secondary.calls().committed, vec![write_id]);
        assert_eq!(mgr.last_committed(), 1);
    }

    #[test]
    fn two_enqueued_commits_drain_in_fifo_order_with_adjacent_prepare_ids() {
        let registry = Arc::new(MapStoreRegistry::new());
        let store = MockObjectStore::new("s1", "objects/s1");
        registry.insert(store.clone());
        let (mut mgr, _dir) = manager_with(registry);

        let a = mgr.begin("client-a".into(), "tx-a".to_string(), false).unwrap();
        mgr.enlist("s1".into(), a).unwrap();
        store.stage(a, r#"{"from":"a"}"#);

        let b = mgr.begin("client-b".into(), "tx-b".to_string(), false).unwrap();
        mgr.enlist("s1".into(), b).unwrap();
        store.stage(b, r#"{"from":"b"}"#);

        mgr.enqueue_commit(a).unwrap();
        mgr.enqueue_commit(b).unwrap();
        mgr.drain().unwrap();

        assert_eq!(mgr.last_committed(), 2);
        assert_eq!(store.calls().committed, vec![a, b], "prepare runs strictly FIFO");
    }
}
