//! `TxManager`: the commit-coordination core.
//!
//! This is a synchronous, single-threaded, cooperative service: there is no
//! internal locking and no background thread. Concurrency within a single
//! process is the caller's problem (the engine crate wraps a manager in a
//! mutex); what this type guarantees on its own is the FIFO prepare-pipeline
//! ordering and the state-machine invariants described on [`TxRecord`].

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, error, info, warn};
use txm_core::{generate_tx_id, generate_write_id, is_write_tx, ClientId, ClientPool, Error, Phase, Result, StoreId, TxId, NO_TX};
use txm_durability::{recover, LogConfig, LogWriter};
use txm_storage::{ObjectStore, PrepareResult, StoreRegistry};

use crate::record::{TxRecord, TxStatus};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Lifecycle {
    Initial,
    Enabled,
    Disabled,
    Closed,
}

/// The transaction manager.
///
/// Owns no storage of its own: it is handed a [`StoreRegistry`] and a
/// [`ClientPool`] at construction and coordinates the prepare/commit
/// pipeline across whatever stores and trigger workers those supply.
pub struct TxManager {
    lifecycle: Lifecycle,
    stores: Arc<dyn StoreRegistry>,
    client_pool: Arc<dyn ClientPool>,
    log: Option<LogWriter>,

    tx_count: i64,
    last_prepared: TxId,
    last_committed: TxId,

    by_write_id: HashMap<TxId, TxRecord>,
    by_client_id: HashMap<ClientId, TxId>,
    by_read_id: HashMap<TxId, usize>,

    currently_preparing: TxId,
    pending_prepare: VecDeque<TxId>,
    remaining_terminating: usize,

    /// Outcomes for transactions that went through `enqueue_commit`, kept
    /// around after the record itself is removed so `commit` can still
    /// answer the caller that is blocked on it.
    outcomes: HashMap<TxId, bool>,
}

impl TxManager {
    /// Construct a manager bound to `stores` and `client_pool`. The manager
    /// starts disabled; call [`TxManager::enable`] before accepting any
    /// transactions.
    pub fn new(stores: Arc<dyn StoreRegistry>, client_pool: Arc<dyn ClientPool>) -> Self {
        Self {
            lifecycle: Lifecycle::Initial,
            stores,
            client_pool,
            log: None,
            tx_count: 0,
            last_prepared: 0,
            last_committed: 0,
            by_write_id: HashMap::new(),
            by_client_id: HashMap::new(),
            by_read_id: HashMap::new(),
            currently_preparing: NO_TX,
            pending_prepare: VecDeque::new(),
            remaining_terminating: 0,
            outcomes: HashMap::new(),
        }
    }

    /// `true` once `enable` has succeeded and before `disable`/`close`.
    pub fn is_enabled(&self) -> bool {
        self.lifecycle == Lifecycle::Enabled
    }

    /// The last commit id durably recorded in the log.
    pub fn last_committed(&self) -> TxId {
        self.last_committed
    }

    /// The read snapshot id a new enlistment would be pinned to right now.
    pub fn last_prepared(&self) -> TxId {
        self.last_prepared
    }

    /// Current lifecycle status of `write_id`, if it has an open record.
    pub fn status(&self, write_id: TxId) -> Option<TxStatus> {
        self.by_write_id.get(&write_id).map(|r| r.status)
    }

    /// Open (or recover) the durable log at `dir` and move to `Enabled`.
    ///
    /// Valid from `Initial` or `Disabled`. Re-enabling from `Disabled`
    /// additionally requires every transaction from the previous session to
    /// have finished draining. On failure the manager is left in its
    /// previous state and `Ok(false)` is returned; a malformed lifecycle
    /// transition (e.g. calling `enable` while already `Enabled`) is an
    /// `IllegalState` error instead.
    pub fn enable(&mut self, dir: &Path, config: LogConfig) -> Result<bool> {
        match self.lifecycle {
            Lifecycle::Initial => {}
            Lifecycle::Disabled => {
                if self.remaining_terminating != 0 {
                    return Err(Error::IllegalState(
                        "cannot re-enable while prior transactions are still draining".into(),
                    ));
                }
            }
            other => {
                return Err(Error::IllegalState(format!("cannot enable from {other:?}")));
            }
        }

        match open_or_recover(dir, config) {
            Ok((log, last_committed)) => {
                self.log = Some(log);
                self.last_committed = last_committed;
                self.last_prepared = last_committed;
                self.lifecycle = Lifecycle::Enabled;
                info!(dir = %dir.display(), last_committed, "transaction manager enabled");
                Ok(true)
            }
            Err(e) => {
                error!(error = %e, dir = %dir.display(), "failed to enable transaction manager");
                Ok(false)
            }
        }
    }

    /// Drain every in-flight transaction and close the log.
    ///
    /// `abort` controls what happens to transactions that have already
    /// reached `Sealed`: if `false` they are committed as a final batch
    /// before the log is closed; if `true` everything still open,
    /// including sealed-but-uncommitted transactions, is rolled back.
    pub fn disable(&mut self, abort: bool) -> Result<bool> {
        if self.lifecycle != Lifecycle::Enabled {
            self.lifecycle = Lifecycle::Disabled;
            return Ok(true);
        }

        self.remaining_terminating += 1;
        let write_ids: Vec<TxId> = self.by_write_id.keys().copied().collect();
        let mut to_commit = Vec::new();
        for write_id in write_ids {
            let status = self.by_write_id[&write_id].status;
            match status {
                TxStatus::Committing | TxStatus::RollingBack => {}
                TxStatus::Sealed if !abort => {
                    self.remaining_terminating += 1;
                    to_commit.push(write_id);
                }
                _ => {
                    self.remaining_terminating += 1;
                    self.force_rollback(write_id)?;
                }
            }
        }
        if !to_commit.is_empty() {
            to_commit.sort_by_key(|w| self.by_write_id[w].prepare_id);
            self.commit_sealed_batch(to_commit)?;
        }
        self.remaining_terminating -= 1;

        if self.remaining_terminating == 0 {
            if let Some(log) = self.log.as_mut() {
                log.close()?;
            }
            self.lifecycle = Lifecycle::Disabled;
            info!("transaction manager disabled");
        }
        Ok(true)
    }

    /// Disable (rolling back everything if `cause` is set) and move to the
    /// terminal `Closed` state, from which the manager can never be
    /// re-enabled.
    pub fn close(&mut self, cause: Option<String>) -> Result<()> {
        if self.lifecycle == Lifecycle::Enabled {
            if let Some(reason) = &cause {
                warn!(reason, "closing transaction manager due to a fatal condition");
            }
            self.disable(cause.is_some())?;
        }
        self.lifecycle = Lifecycle::Closed;
        Ok(())
    }

    fn check_enabled(&self) -> Result<()> {
        if self.lifecycle != Lifecycle::Enabled {
            return Err(Error::IllegalState(format!(
                "transaction manager is not enabled (state: {:?})",
                self.lifecycle
            )));
        }
        Ok(())
    }

    /// Open a new write transaction for `client_id`. Fails if the client
    /// already owns a non-terminal transaction.
    pub fn begin(&mut self, client_id: ClientId, client_tx: String, system_tx: bool) -> Result<TxId> {
        self.check_enabled()?;
        if self.by_client_id.contains_key(&client_id) {
            return Err(Error::IllegalState(format!(
                "client {client_id} already has an open transaction"
            )));
        }
        self.tx_count += 1;
        let write_id = generate_write_id(self.tx_count);
        let record = TxRecord::new(write_id, client_id.clone(), client_tx, system_tx);
        self.by_write_id.insert(write_id, record);
        self.by_client_id.insert(client_id, write_id);
        debug!(write_id, "began transaction");
        Ok(write_id)
    }

    /// Enlist `store_id` in `write_id`. On first enlistment, pins the
    /// transaction's read snapshot to the current `lastPrepared` and
    /// returns it. `write_id` must be the id returned by `begin`
    /// (`Open`-phase), not a phase-tagged view id.
    pub fn enlist(&mut self, store_id: StoreId, write_id: TxId) -> Result<TxId> {
        if !is_write_tx(write_id) {
            return Err(Error::IllegalState(format!("{write_id} is not a write id")));
        }
        let last_prepared = self.last_prepared;
        let record = self.record_mut(write_id)?;
        if !matches!(record.status, TxStatus::InFlight | TxStatus::Distributing) {
            return Err(Error::IllegalState(format!(
                "cannot enlist a store while transaction is in status {:?}",
                record.status
            )));
        }
        if record.seal_by_id.contains_key(&store_id) {
            return Err(Error::IllegalState(format!(
                "store {store_id} is already enlisted in {write_id}"
            )));
        }
        if record.read_id == NO_TX {
            record.read_id = last_prepared;
        }
        let read_id = record.read_id;
        record.seal_by_id.insert(store_id, None);
        *self.by_read_id.entry(read_id).or_insert(0) += 1;
        Ok(read_id)
    }

    /// Queue `write_id` for commit without blocking on the result. Safe to
    /// call repeatedly before a [`TxManager::drain`]; transactions are
    /// prepared strictly in the order they were enqueued.
    pub fn enqueue_commit(&mut self, write_id: TxId) -> Result<()> {
        self.check_enabled()?;
        let record = self.record_mut(write_id)?;
        if record.status != TxStatus::InFlight {
            return Err(Error::IllegalState(format!(
                "commit requires status InFlight, found {:?}",
                record.status
            )));
        }
        record.status = TxStatus::Enqueued;
        record.pending = true;
        self.pending_prepare.push_back(write_id);
        Ok(())
    }

    /// Run the prepare pipeline for every queued transaction, single-file,
    /// then commit whichever ones reached `Sealed` as one batch.
    pub fn drain(&mut self) -> Result<()> {
        let mut sealed_batch = Vec::new();
        while self.currently_preparing == NO_TX {
            let Some(write_id) = self.pending_prepare.pop_front() else { break };
            self.currently_preparing = write_id;
            let outcome = self.run_prepare_pipeline(write_id);
            self.currently_preparing = NO_TX;
            match outcome {
                Ok(true) => sealed_batch.push(write_id),
                Ok(false) => {}
                Err(e) => {
                    error!(write_id, error = %e, "prepare pipeline failed, rolling back");
                    self.force_rollback(write_id)?;
                }
            }
        }
        if !sealed_batch.is_empty() {
            self.commit_sealed_batch(sealed_batch)?;
        }
        Ok(())
    }

    /// Request that `write_id` commit: enqueue it, drain the pipeline, and
    /// return whether it ultimately committed (`false` means it was rolled
    /// back).
    pub fn commit(&mut self, write_id: TxId) -> Result<bool> {
        self.enqueue_commit(write_id)?;
        self.drain()?;
        Ok(self.outcomes.remove(&write_id).unwrap_or(false))
    }

    /// Roll back a still-open transaction. Invalid once the transaction has
    /// reached either terminal state.
    pub fn rollback(&mut self, write_id: TxId) -> Result<()> {
        self.check_enabled()?;
        let status = self.record(write_id)?.status;
        match status {
            TxStatus::Committed | TxStatus::RolledBack => Err(Error::IllegalState(format!(
                "{write_id} has already terminated ({status:?})"
            ))),
            TxStatus::Committing | TxStatus::RollingBack => Ok(()),
            _ => {
                self.record_mut(write_id)?.status = TxStatus::RollingBack;
                self.rollback_remaining(write_id)?;
                self.terminate(write_id, TxStatus::RolledBack)
            }
        }
    }

    fn run_prepare_pipeline(&mut self, write_id: TxId) -> Result<bool> {
        if !self.prepare(write_id)? {
            return Ok(false);
        }
        if !self.validate(write_id)? {
            self.rollback_for_pipeline_failure(write_id)?;
            return Ok(false);
        }
        if !self.rectify(write_id)? {
            self.rollback_for_pipeline_failure(write_id)?;
            return Ok(false);
        }
        if !self.distribute(write_id)? {
            self.rollback_for_pipeline_failure(write_id)?;
            return Ok(false);
        }
        self.seal(write_id)?;
        Ok(true)
    }

    /// Dispatch `prepare` to every enlisted store. Returns `Ok(true)` if the
    /// record reached `Prepared` with at least one store still enlisted;
    /// `Ok(false)` if it already terminated (no stores enlisted, or a store
    /// reported failure and the record was rolled back here).
    fn prepare(&mut self, write_id: TxId) -> Result<bool> {
        let store_ids: Vec<StoreId> = self.record(write_id)?.seal_by_id.keys().cloned().collect();
        if store_ids.is_empty() {
            self.terminate(write_id, TxStatus::Committed)?;
            return Ok(false);
        }

        let prepare_id = self.last_prepared + 1;
        {
            let record = self.record_mut(write_id)?;
            record.prepare_id = prepare_id;
            record.status = TxStatus::Preparing;
        }

        let mut failed = false;
        for store_id in &store_ids {
            let store = self.store(store_id)?;
            match store.prepare(write_id, prepare_id) {
                PrepareResult::Prepared => {}
                PrepareResult::CommittedNoChanges => {
                    self.record_mut(write_id)?.seal_by_id.remove(store_id);
                }
                PrepareResult::FailedRolledBack => {
                    self.record_mut(write_id)?.seal_by_id.remove(store_id);
                    failed = true;
                }
            }
        }

        let remaining_empty = self.record(write_id)?.seal_by_id.is_empty();
        if failed {
            if !remaining_empty {
                self.rollback_remaining(write_id)?;
            }
            self.terminate(write_id, TxStatus::RolledBack)?;
            Ok(false)
        } else if remaining_empty {
            self.terminate(write_id, TxStatus::Committed)?;
            Ok(false)
        } else {
            self.record_mut(write_id)?.status = TxStatus::Prepared;
            Ok(true)
        }
    }

    fn validate(&mut self, write_id: TxId) -> Result<bool> {
        self.record_mut(write_id)?.status = TxStatus::Validating;
        let store_ids: Vec<StoreId> = self.record(write_id)?.seal_by_id.keys().cloned().collect();
        let any_validators = store_ids
            .iter()
            .any(|id| self.stores.store(id).map(|s| !s.validators().is_empty()).unwrap_or(false));

        if !any_validators {
            self.record_mut(write_id)?.status = TxStatus::Validated;
            return Ok(true);
        }

        let client = self.client_pool.allocate()?;
        let view_tx = generate_tx_id(write_id, Phase::Validating);
        let mut ok = true;
        'stores: for store_id in &store_ids {
            let store = self.store(store_id)?;
            for validator in store.validators() {
                match validator.validate(&*client, view_tx) {
                    Ok(true) => {}
                    Ok(false) => {
                        ok = false;
                        break 'stores;
                    }
                    Err(e) => {
                        self.client_pool.recycle(client);
                        return Err(e);
                    }
                }
            }
        }
        self.client_pool.recycle(client);

        if ok {
            self.record_mut(write_id)?.status = TxStatus::Validated;
        }
        Ok(ok)
    }

    fn rectify(&mut self, write_id: TxId) -> Result<bool> {
        self.record_mut(write_id)?.status = TxStatus::Rectifying;
        let store_ids: Vec<StoreId> = self.record(write_id)?.seal_by_id.keys().cloned().collect();
        let any_rectifiers = store_ids
            .iter()
            .any(|id| self.stores.store(id).map(|s| !s.rectifiers().is_empty()).unwrap_or(false));

        if any_rectifiers {
            let client = self.client_pool.allocate()?;
            let view_tx = generate_tx_id(write_id, Phase::Rectifying);
            for store_id in &store_ids {
                let store = self.store(store_id)?;
                let mut ok = true;
                for rectifier in store.rectifiers() {
                    match rectifier.rectify(&*client, view_tx) {
                        Ok(true) => {}
                        Ok(false) => {
                            ok = false;
                            break;
                        }
                        Err(e) => {
                            self.client_pool.recycle(client);
                            return Err(e);
                        }
                    }
                }
                if !ok {
                    self.client_pool.recycle(client);
                    return Ok(false);
                }
                // A store with its own rectifier is sealed immediately: no
                // further phase is allowed to mutate it.
                if !store.rectifiers().is_empty() {
                    let fragment = store.seal_prepare(write_id);
                    self.record_mut(write_id)?.seal_by_id.insert(store_id.clone(), Some(fragment));
                }
            }
            self.client_pool.recycle(client);
        }

        self.record_mut(write_id)?.status = TxStatus::Rectified;
        Ok(true)
    }

    fn distribute(&mut self, write_id: TxId) -> Result<bool> {
        self.record_mut(write_id)?.status = TxStatus::Distributing;
        loop {
            let store_ids: Vec<StoreId> = self.record(write_id)?.seal_by_id.keys().cloned().collect();
            let mut enlisted_new = false;

            for store_id in &store_ids {
                let store = self.store(store_id)?;
                let distributors = store.distributors().to_vec();
                if distributors.is_empty() {
                    continue;
                }
                let client = self.client_pool.allocate()?;
                for distributor in &distributors {
                    let mut requested: Vec<StoreId> = Vec::new();
                    let outcome = distributor.distribute(&*client, write_id, &mut |sid| {
                        requested.push(sid);
                        Ok(generate_tx_id(write_id, Phase::Distributing))
                    });
                    match outcome {
                        Ok(true) => {
                            for sid in requested {
                                if self.enlist(sid, write_id).is_ok() {
                                    enlisted_new = true;
                                }
                            }
                        }
                        Ok(false) => {
                            self.client_pool.recycle(client);
                            return Ok(false);
                        }
                        Err(e) => {
                            self.client_pool.recycle(client);
                            return Err(e);
                        }
                    }
                }
                self.client_pool.recycle(client);
            }

            if !enlisted_new {
                break;
            }
        }

        self.record_mut(write_id)?.status = TxStatus::Distributed;
        Ok(true)
    }

    fn seal(&mut self, write_id: TxId) -> Result<()> {
        self.record_mut(write_id)?.status = TxStatus::Sealing;
        let pending: Vec<StoreId> = self
            .record(write_id)?
            .seal_by_id
            .iter()
            .filter(|(_, v)| v.is_none())
            .map(|(k, _)| k.clone())
            .collect();
        for store_id in pending {
            let store = self.store(&store_id)?;
            let fragment = store.seal_prepare(write_id);
            self.record_mut(write_id)?.seal_by_id.insert(store_id, Some(fragment));
        }
        let prepare_id = self.record(write_id)?.prepare_id;
        self.last_prepared = prepare_id;
        self.record_mut(write_id)?.status = TxStatus::Sealed;
        Ok(())
    }

    /// Commit a batch of already-sealed transactions, in the order given
    /// (which, from `drain`, is ascending prepare-id order by construction).
    /// Each gets its own durable commit record; a log I/O failure rolls back
    /// the transaction in flight when it occurred, and since the log is the
    /// one thing every later record in this batch also depends on, every
    /// record still waiting its turn is rolled back too rather than left
    /// stranded in `Sealed` forever. A store-level commit failure after a
    /// record was made durable is a separate, later fatal inconsistency,
    /// surfaced once the whole batch has been processed.
    fn commit_sealed_batch(&mut self, batch: Vec<TxId>) -> Result<()> {
        let mut fatal: Option<Error> = None;
        let mut log_broken = false;

        for write_id in batch {
            if log_broken {
                self.force_rollback(write_id)?;
                continue;
            }

            self.record_mut(write_id)?.status = TxStatus::Committing;
            let store_ids: Vec<StoreId> = self.record(write_id)?.seal_by_id.keys().cloned().collect();
            if store_ids.is_empty() {
                self.terminate(write_id, TxStatus::Committed)?;
                continue;
            }

            let prepare_id = self.record(write_id)?.prepare_id;
            if prepare_id != self.last_committed + 1 {
                return Err(Error::Fatal(format!(
                    "commit sequence violated: {write_id} has prepare id {prepare_id}, expected {}",
                    self.last_committed + 1
                )));
            }

            let record_json = self.build_commit_record(write_id, prepare_id)?;
            if let Err(e) = self.log_mut()?.append_commit(record_json, prepare_id) {
                warn!(write_id, error = %e, "log append failed, rolling back remainder of this commit batch");
                self.record_mut(write_id)?.status = TxStatus::RollingBack;
                self.rollback_remaining(write_id)?;
                self.terminate(write_id, TxStatus::RolledBack)?;
                log_broken = true;
                fatal = Some(e);
                continue;
            }
            self.last_committed = prepare_id;

            let mut heuristic_failure = false;
            for store_id in &store_ids {
                match self.store(store_id) {
                    Ok(store) => {
                        if let Err(e) = store.commit(write_id) {
                            warn!(write_id, store = %store_id, error = %e, "store failed to commit after its record was made durable");
                            heuristic_failure = true;
                        }
                    }
                    Err(_) => heuristic_failure = true,
                }
            }

            if heuristic_failure {
                self.terminate(write_id, TxStatus::RolledBack)?;
                fatal.get_or_insert_with(|| {
                    Error::Fatal(format!(
                        "store commit failed for {write_id} after its commit record was durable; storage may be inconsistent with the log"
                    ))
                });
            } else {
                self.terminate(write_id, TxStatus::Committed)?;
            }
        }

        match fatal {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn build_commit_record(&self, write_id: TxId, prepare_id: TxId) -> Result<serde_json::Value> {
        let mut fields = serde_json::Map::new();
        fields.insert("_tx".to_string(), serde_json::Value::from(prepare_id));
        fields.insert("_ts".to_string(), serde_json::Value::String(now_iso()));
        for (store_id, seal) in &self.record(write_id)?.seal_by_id {
            let store = self.store(store_id)?;
            let fragment = seal.clone().unwrap_or_else(|| "null".to_string());
            let value: serde_json::Value =
                serde_json::from_str(&fragment).unwrap_or(serde_json::Value::String(fragment));
            fields.insert(store.path().to_string(), value);
        }
        Ok(serde_json::Value::Object(fields))
    }

    fn rollback_remaining(&mut self, write_id: TxId) -> Result<()> {
        let store_ids: Vec<StoreId> = self.record(write_id)?.seal_by_id.keys().cloned().collect();
        for store_id in store_ids {
            if let Ok(store) = self.store(&store_id) {
                store.rollback(write_id);
            }
        }
        Ok(())
    }

    fn rollback_for_pipeline_failure(&mut self, write_id: TxId) -> Result<()> {
        self.record_mut(write_id)?.status = TxStatus::RollingBack;
        self.rollback_remaining(write_id)?;
        self.terminate(write_id, TxStatus::RolledBack)
    }

    /// Used by `drain`/`disable` to unwind a transaction that hasn't yet
    /// reached a terminal state, tolerating the case where it already has.
    fn force_rollback(&mut self, write_id: TxId) -> Result<()> {
        let Some(record) = self.by_write_id.get(&write_id) else { return Ok(()) };
        if record.status.is_terminal() {
            return Ok(());
        }
        self.record_mut(write_id)?.status = TxStatus::RollingBack;
        self.rollback_remaining(write_id)?;
        self.terminate(write_id, TxStatus::RolledBack)
    }

    /// Move `write_id` to a terminal state, release its indexes, record its
    /// outcome for any caller blocked in `commit`, and drop the record.
    fn terminate(&mut self, write_id: TxId, final_status: TxStatus) -> Result<()> {
        debug_assert!(final_status.is_terminal());
        let mut record = self
            .by_write_id
            .remove(&write_id)
            .ok_or_else(|| Error::IllegalState(format!("terminate called on unknown {write_id}")))?;
        record.status = final_status;

        self.by_client_id.remove(&record.client_id);
        if record.read_id != NO_TX {
            if let Some(count) = self.by_read_id.get_mut(&record.read_id) {
                *count -= 1;
                if *count == 0 {
                    self.by_read_id.remove(&record.read_id);
                }
            }
        }
        if record.pending {
            self.outcomes.insert(write_id, final_status == TxStatus::Committed);
        }
        if self.remaining_terminating > 0 {
            self.remaining_terminating -= 1;
        }
        debug!(write_id, status = ?final_status, "transaction terminated");
        Ok(())
    }

    fn record(&self, write_id: TxId) -> Result<&TxRecord> {
        self.by_write_id
            .get(&write_id)
            .ok_or_else(|| Error::IllegalState(format!("no such transaction {write_id}")))
    }

    fn record_mut(&mut self, write_id: TxId) -> Result<&mut TxRecord> {
        self.by_write_id
            .get_mut(&write_id)
            .ok_or_else(|| Error::IllegalState(format!("no such transaction {write_id}")))
    }

    fn store(&self, id: &StoreId) -> Result<Arc<dyn ObjectStore>> {
        self.stores
            .store(id)
            .ok_or_else(|| Error::IllegalState(format!("unknown store {id}")))
    }

    fn log_mut(&mut self) -> Result<&mut LogWriter> {
        self.log
            .as_mut()
            .ok_or_else(|| Error::IllegalState("transaction manager has no open log".into()))
    }
}

fn now_iso() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}

/// Open the log in `dir`, creating it if this is a brand-new system
/// directory or falling back to full recovery if the status file is
/// missing or stale relative to what's actually on disk.
fn open_or_recover(dir: &Path, config: LogConfig) -> Result<(LogWriter, TxId)> {
    let current_path: PathBuf = dir.join(txm_durability::log_writer::CURRENT_LOG_NAME);
    match txm_durability::read_status_file(dir)? {
        None => {
            if !current_path.exists() {
                let log = LogWriter::create(dir, config, 0)?;
                Ok((log, 0))
            } else {
                let (log, last_committed, _) = recover(dir, config)?;
                Ok((log, last_committed))
            }
        }
        Some(infos) => {
            let current = infos
                .last()
                .ok_or_else(|| Error::IllegalState("status file has no segments".into()))?;
            let matches_disk = std::fs::metadata(dir.join(&current.name))
                .map(|m| m.len() == current.size)
                .unwrap_or(false);
            if matches_disk {
                let last_committed = if current.tx_ids.is_empty() {
                    current.tx_ids.first - 1
                } else {
                    current.tx_ids.last
                };
                let log = LogWriter::open(dir, config, infos)?;
                Ok((log, last_committed))
            } else {
                let (log, last_committed, _) = recover(dir, config)?;
                Ok((log, last_committed))
            }
        }
    }
}
