//! Convenient imports.
//!
//! ```ignore
//! use txmgr::prelude::*;
//!
//! let catalog = Catalog::new("./data");
//! catalog.enable()?;
//! ```

pub use crate::error::{Error, Result};

pub use txm_concurrency::{TxManager, TxStatus};
pub use txm_core::{ClientId, Phase, StoreId, TxId, BEFORE_FIRST_COMMIT, NO_TX};
pub use txm_engine::Catalog;
pub use txm_storage::{ObjectStore, PrepareResult, StoreRegistry};
