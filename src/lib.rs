//! # txmgr
//!
//! The commit-coordination core of an embedded, JSON-logged object
//! database: a transaction manager that runs a multi-phase
//! prepare/validate/rectify/distribute/seal pipeline across arbitrary
//! storage shards and makes every commit durable in an append-only JSON
//! log.
//!
//! ## Quick start
//!
//! ```ignore
//! use txmgr::prelude::*;
//!
//! let catalog = Catalog::new("./data");
//! catalog.register_store(my_store);
//! catalog.enable()?;
//!
//! let write_id = catalog.begin("client-1", "session-handle")?;
//! catalog.enlist("my-store", write_id)?;
//! let committed = catalog.commit(write_id)?;
//! ```
//!
//! ## Crate layout
//!
//! - [`txm_core`] — transaction id codec, identifiers, the error taxonomy,
//!   and the `Client`/`ClientPool`/`Validator`/`Rectifier`/`Distributor`
//!   trait vocabulary shared by every other crate here.
//! - [`txm_storage`] — the `ObjectStore`/`StoreRegistry` contract and an
//!   in-memory mock used in tests.
//! - [`txm_durability`] — the append-only JSON log, its status file, and
//!   crash recovery.
//! - [`txm_concurrency`] — `TxRecord` and `TxManager`, the prepare/commit
//!   pipeline itself.
//! - [`txm_engine`] — `Catalog`, the thread-safe handle that wires a
//!   manager to a concrete client pool and store registry.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod prelude;

pub use error::{Error, Result};
pub use txm_concurrency::{TxManager, TxRecord, TxStatus};
pub use txm_core::{
    generate_tx_id, generate_write_id, is_read_tx, is_write_tx, phase_of, write_tx_counter,
    Client, ClientId, ClientPool, Distributor, Phase, Rectifier, StoreId, TxId, Validator,
    BEFORE_FIRST_COMMIT, NO_TX,
};
pub use txm_durability::LogConfig;
pub use txm_engine::Catalog;
pub use txm_storage::{ObjectStore, PrepareResult, StoreRegistry};
