//! Trigger contracts: validators, rectifiers and distributors.
//!
//! These are the application-defined callbacks a store may attach, run
//! during the corresponding phase of the prepare pipeline. The source this
//! manager is ported from leaves the exact trigger algorithm as an
//! unfinished placeholder (see the spec's open questions); what is fixed,
//! and what this crate commits to, is the phase-id contract and the
//! read/write scoping:
//!
//! - **Validators** run against a read-only view tagged with
//!   [`Phase::Validating`][crate::Phase] and must not mutate any store.
//! - **Rectifiers** run against a view tagged [`Phase::Rectifying`] and may
//!   mutate only the store that owns them.
//! - **Distributors** run against a view tagged [`Phase::Distributing`], may
//!   mutate any store, and may enlist additional stores into the
//!   transaction (offered here as an `enlist` callback rather than a direct
//!   manager reference, so this crate stays free of a dependency on the
//!   concurrency crate that owns the transaction manager).
//!
//! All three return `Ok(false)` (or an error) to signal failure, which the
//! pipeline treats as cause to roll the whole transaction back.

use crate::client::Client;
use crate::error::Result;
use crate::ids::StoreId;
use crate::txid::TxId;

/// Read-only check run against every enlisted store during the validate
/// phase. `view_tx_id` is the phase-tagged id (see [`generate_tx_id`][crate::generate_tx_id])
/// the validator should use for any reads it performs.
pub trait Validator: Send + Sync {
    /// Run the check. `Ok(false)` means validation failed; the transaction
    /// will be rolled back.
    fn validate(&self, client: &dyn Client, view_tx_id: TxId) -> Result<bool>;
}

/// Mutation run against the owning store during the rectify phase.
/// `view_tx_id` is the phase-tagged id for this phase; the rectifier may
/// only touch the store it was registered on.
pub trait Rectifier: Send + Sync {
    /// Run the rectification. `Ok(false)` aborts the transaction.
    fn rectify(&self, client: &dyn Client, view_tx_id: TxId) -> Result<bool>;
}

/// Mutation run during the distribute phase. Distributors may mutate any
/// store and may request additional stores be enlisted into the
/// transaction via `enlist`, which mirrors `ObjectStore::enlist`'s
/// contract: it returns the frozen read id for the transaction.
pub trait Distributor: Send + Sync {
    /// Run the distribution step. `Ok(false)` aborts the transaction.
    fn distribute(
        &self,
        client: &dyn Client,
        write_id: TxId,
        enlist: &mut dyn FnMut(StoreId) -> Result<TxId>,
    ) -> Result<bool>;
}
