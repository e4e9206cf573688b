//! The `ObjectStore` contract the transaction manager consumes, plus a
//! minimal in-memory test double.
//!
//! Building real, persistent storage shards is out of scope here (see the
//! top-level spec's Non-goals) — this crate defines the seam, not the
//! implementation behind it.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod mock;
pub mod object_store;

pub use mock::{Calls, MapStoreRegistry, MockObjectStore};
pub use object_store::{ObjectStore, PrepareResult, StoreRegistry};
