//! `TxRecord`: the manager's in-memory bookkeeping for one in-flight write
//! transaction, and the 16-state lifecycle it moves through.

use std::collections::BTreeMap;
use txm_core::{ClientId, StoreId, TxId, NO_TX};

/// Where a transaction currently sits in the prepare/commit pipeline.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TxStatus {
    /// Accepting enlistments; not yet queued for commit.
    InFlight,
    /// Queued behind the currently-preparing transaction.
    Enqueued,
    /// `prepare` has been dispatched to every enlisted store.
    Preparing,
    /// Every enlisted store returned `Prepared` or dropped out cleanly.
    Prepared,
    /// Validators are running.
    Validating,
    /// All validators passed.
    Validated,
    /// Rectifiers are running.
    Rectifying,
    /// All rectifiers passed.
    Rectified,
    /// Distributors are running (may still enlist more stores).
    Distributing,
    /// Distribution finished; no more enlistments will be accepted.
    Distributed,
    /// Remaining stores are being asked for their seal fragment.
    Sealing,
    /// Every enlisted store has been sealed; ready to be committed as part
    /// of a batch.
    Sealed,
    /// The commit record has been appended to the durable log and stores
    /// are being told to commit.
    Committing,
    /// Terminal: every store committed (or the log append failed and this
    /// transaction never had any enlisted stores).
    Committed,
    /// A failure during prepare/validate/rectify/distribute is unwinding
    /// the stores that were enlisted.
    RollingBack,
    /// Terminal: every enlisted store has been rolled back.
    RolledBack,
}

impl TxStatus {
    /// `true` for either terminal state.
    pub fn is_terminal(self) -> bool {
        matches!(self, TxStatus::Committed | TxStatus::RolledBack)
    }
}

/// Bookkeeping the manager keeps for one write transaction between `begin`
/// and termination (`Committed`/`RolledBack`).
#[derive(Debug)]
pub struct TxRecord {
    /// The `Open`-phase write id this transaction was assigned at `begin`.
    pub write_id: TxId,
    /// The client that owns this transaction; at most one non-terminal
    /// record exists per client id at a time.
    pub client_id: ClientId,
    /// Opaque handle the owning client uses to look up its own worker
    /// state; the manager never inspects this.
    pub client_tx: String,
    /// `true` if this transaction was opened internally by the manager
    /// itself (e.g. a catalog-driven maintenance write) rather than by an
    /// external client request.
    pub system_tx: bool,
    /// The read id this transaction's view is pinned to, fixed at first
    /// enlistment to whatever `lastPrepared` was at that moment.
    pub read_id: TxId,
    /// The prepare id assigned when this transaction's prepare pipeline
    /// started; also the commit id it will occupy in the log once sealed.
    pub prepare_id: TxId,
    /// Current lifecycle state.
    pub status: TxStatus,
    /// Per-store seal state: absent until enlisted, `None` once enlisted
    /// but not yet sealed, `Some(fragment)` once this store's contribution
    /// to the commit record has been captured.
    pub seal_by_id: BTreeMap<StoreId, Option<String>>,
    /// Set when a caller is blocked on this transaction's outcome (i.e. it
    /// went through `enqueue_commit`); read and cleared by the manager once
    /// the outcome is recorded.
    pub pending: bool,
}

impl TxRecord {
    /// A brand-new `InFlight` record with no enlistments.
    pub fn new(write_id: TxId, client_id: ClientId, client_tx: String, system_tx: bool) -> Self {
        Self {
            write_id,
            client_id,
            client_tx,
            system_tx,
            read_id: NO_TX,
            prepare_id: NO_TX,
            status: TxStatus::InFlight,
            seal_by_id: BTreeMap::new(),
            pending: false,
        }
    }
}
