//! Shared identifiers, the transaction-id codec, and the error taxonomy used
//! across every crate in the transaction manager.
//!
//! This crate has no I/O and no concurrency of its own: it is the vocabulary
//! the rest of the manager is written in.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod error;
pub mod ids;
pub mod triggers;
pub mod txid;

pub use client::{Client, ClientPool};
pub use error::{Error, Result};
pub use ids::{ClientId, StoreId};
pub use triggers::{Distributor, Rectifier, Validator};
pub use txid::{
    generate_tx_id, generate_write_id, is_read_tx, is_write_tx, phase_of, write_tx_counter, Phase,
    TxId, BEFORE_FIRST_COMMIT, NO_TX,
};
