//! Wires the transaction manager to a concrete client pool and exposes the
//! `Catalog`, the thread-safe handle applications actually hold.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod catalog;
pub mod client_pool;

pub use catalog::Catalog;
pub use client_pool::{SystemClient, SystemClientPool};

#[cfg(test)]
mod tests {
    use super::*;
    use txm_storage::MockObjectStore;

    #[test]
    fn enable_begin_enlist_commit_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = Catalog::new(dir.path());
        let store = MockObjectStore::new("s1", "objects/s1");
        catalog.register_store(store.clone());
        assert!(catalog.enable().unwrap());

        let write_id = catalog.begin("client-a", "tx-handle").unwrap();
        store.stage(write_id, r#"{"hello":"world"}"#);
        catalog.enlist("s1", write_id).unwrap();
        assert!(catalog.commit(write_id).unwrap());
        assert_eq!(catalog.last_committed(), 1);

        assert!(catalog.disable(false).unwrap());
    }

    #[test]
    fn reopening_an_existing_catalog_recovers_last_committed() {
        let dir = tempfile::tempdir().unwrap();
        {
            let catalog = Catalog::new(dir.path());
            let store = MockObjectStore::new("s1", "objects/s1");
            catalog.register_store(store.clone());
            catalog.enable().unwrap();
            let write_id = catalog.begin("client-a", "tx").unwrap();
            store.stage(write_id, "null");
            catalog.enlist("s1", write_id).unwrap();
            catalog.commit(write_id).unwrap();
            catalog.disable(false).unwrap();
        }

        let catalog = Catalog::new(dir.path());
        catalog.register_store(MockObjectStore::new("s1", "objects/s1"));
        assert!(catalog.enable().unwrap());
        assert_eq!(catalog.last_committed(), 1);
    }
}
