//! # Ledger Engine
//!
//! [`Ledger`] owns one [`LedgerState`] and its [`EventJournal`] and is the
//! only entry point for writes.
//!
//! ## Write Path
//!
//! 1. Admission: a `parking_lot::ReentrantMutex` serializes writes, so
//!    writes form one total order.
//! 2. The clock is read once; every timestamp the write stores is that
//!    admission time.
//! 3. Under the state write lock the operation validates everything it
//!    needs and only then mutates the committed state in place. A rejection
//!    returns before the first mutation, leaving the state and the journal
//!    untouched. Readers see the previous commit or this one, never a
//!    partial write.
//! 4. The event is sealed into the journal before the write lock is
//!    released, then queued for delivery.
//! 5. Only the outermost write on the admission lock delivers queued
//!    events to sinks, oldest first. Admission is reentrant, so a sink may
//!    submit further writes from the same thread; those commit immediately
//!    and queue their events behind the ones still being delivered. Every
//!    sink therefore sees events in journal order.
//!
//! A journal append failure after the state was mutated cannot be undone;
//! the ledger marks itself poisoned and refuses all later writes.
//!
//! ## Read Path
//!
//! Reads take the `RwLock` in shared mode for the duration of a projection
//! and never wait on admission.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::{ReentrantMutex, RwLock};

use agri_core::{
    BatchId, Centi, Clock, ContentDigest, LedgerError, Principal, ProductId, QualityGrade, Role,
    Stage, SystemClock, TransactionId,
};

use crate::batch::{Batch, HistoryEntry};
use crate::catalog::{NewProduct, Product};
use crate::command::{Receipt, Submission};
use crate::config::LedgerConfig;
use crate::escrow::{EscrowTransaction, Settlement};
use crate::journal::{EventJournal, EventSink, JournalError, LedgerEvent};
use crate::provenance::ProvenanceRecord;
use crate::query::{BatchDetail, CodeResolution, ProductDetail};
use crate::registry::Participant;
use crate::state::{Applied, LedgerState, WriteEnv};

/// State and journal as of the latest commit.
#[derive(Debug, Default)]
struct Committed {
    state: LedgerState,
    journal: EventJournal,
    /// Set when a mutated state could not be sealed into the journal.
    poisoned: Option<String>,
}

/// Per-admission delivery bookkeeping, only touched while admission is held.
#[derive(Debug, Default)]
struct Delivery {
    depth: usize,
    pending: VecDeque<LedgerEvent>,
}

/// Leaves one level of write nesting on drop, including on early return.
struct Nested<'a>(&'a RefCell<Delivery>);

impl<'a> Nested<'a> {
    fn enter(delivery: &'a RefCell<Delivery>) -> (Self, bool) {
        let mut d = delivery.borrow_mut();
        d.depth += 1;
        let outermost = d.depth == 1;
        drop(d);
        (Self(delivery), outermost)
    }
}

impl Drop for Nested<'_> {
    fn drop(&mut self) {
        self.0.borrow_mut().depth -= 1;
    }
}

/// A committed write.
struct Written<R> {
    value: R,
    event: LedgerEvent,
}

/// The provenance ledger execution engine.
pub struct Ledger {
    config: LedgerConfig,
    clock: Arc<dyn Clock>,
    admission: ReentrantMutex<RefCell<Delivery>>,
    committed: RwLock<Committed>,
    sinks: RwLock<Vec<Arc<dyn EventSink>>>,
}

impl std::fmt::Debug for Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ledger")
            .field("config", &self.config)
            .field("events", &self.committed.read().journal.len())
            .field("sinks", &self.sinks.read().len())
            .finish_non_exhaustive()
    }
}

impl Ledger {
    /// Create an empty ledger reading time from `clock`.
    pub fn new(config: LedgerConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            admission: ReentrantMutex::new(RefCell::new(Delivery::default())),
            committed: RwLock::new(Committed::default()),
            sinks: RwLock::new(Vec::new()),
        }
    }

    /// Create an empty ledger on the system clock.
    pub fn with_system_clock(config: LedgerConfig) -> Self {
        Self::new(config, Arc::new(SystemClock))
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Register an observer of committed events.
    pub fn subscribe(&self, sink: Arc<dyn EventSink>) {
        self.sinks.write().push(sink);
    }

    // ── Write path ──────────────────────────────────────────────────

    fn write<R>(
        &self,
        operation: &'static str,
        caller: &Principal,
        apply: impl FnOnce(&mut LedgerState, &WriteEnv<'_>) -> Result<Applied<R>, LedgerError>,
    ) -> Result<Written<R>, LedgerError> {
        let admitted = self.admission.lock();
        let (_nested, outermost) = Nested::enter(&admitted);
        let env = WriteEnv {
            now: self.clock.now(),
            config: &self.config,
        };

        let (value, event) = {
            let mut committed = self.committed.write();
            if let Some(reason) = &committed.poisoned {
                return Err(LedgerError::Integrity(reason.clone()));
            }
            let applied = match apply(&mut committed.state, &env) {
                Ok(applied) => applied,
                Err(err) => {
                    tracing::debug!(
                        operation,
                        caller = %caller,
                        kind = err.kind().as_str(),
                        reason = %err,
                        "write rejected"
                    );
                    return Err(err);
                }
            };
            let appended = committed
                .journal
                .append(caller.clone(), env.now, applied.event)
                .cloned();
            let event = match appended {
                Ok(event) => event,
                Err(err) => {
                    let reason = err.to_string();
                    tracing::error!(
                        operation,
                        caller = %caller,
                        error = %reason,
                        "journal append failed; ledger poisoned"
                    );
                    committed.poisoned = Some(reason.clone());
                    return Err(LedgerError::Integrity(reason));
                }
            };
            (applied.value, event)
        };

        tracing::info!(
            operation,
            caller = %caller,
            sequence = event.sequence,
            event = %event.kind,
            "write committed"
        );

        admitted.borrow_mut().pending.push_back(event.clone());
        if outermost {
            self.deliver(&admitted);
        }

        Ok(Written { value, event })
    }

    /// Drain queued events to every sink, oldest first. Events queued by
    /// sinks while draining are delivered in the same loop.
    fn deliver(&self, delivery: &RefCell<Delivery>) {
        loop {
            // The queue borrow must end before sinks run; they may enqueue.
            let Some(event) = delivery.borrow_mut().pending.pop_front() else {
                break;
            };
            let sinks = self.sinks.read().clone();
            for sink in &sinks {
                sink.on_event(&event);
            }
        }
    }

    /// Execute a submitted command.
    pub fn submit(&self, submission: Submission) -> Result<Receipt, LedgerError> {
        let Submission { caller, command } = submission;
        let written = self.write(command.name(), &caller, |state, env| {
            command.apply(state, env, &caller)
        })?;
        Ok(Receipt {
            sequence: written.event.sequence,
            digest: written.event.digest,
            outcome: written.value,
        })
    }

    /// Register `caller` as an active participant.
    pub fn register(
        &self,
        caller: &Principal,
        name: impl Into<String>,
        location: impl Into<String>,
        role: Role,
    ) -> Result<(), LedgerError> {
        let (name, location) = (name.into(), location.into());
        self.write("register", caller, |s, env| {
            s.register(env, caller, name, location, role)
        })
        .map(|w| w.value)
    }

    /// Administrative: set a participant's reputation.
    pub fn set_reputation(
        &self,
        caller: &Principal,
        principal: &Principal,
        reputation: u32,
    ) -> Result<(), LedgerError> {
        self.write("set_reputation", caller, |s, env| {
            s.set_reputation(env, caller, principal, reputation)
        })
        .map(|w| w.value)
    }

    /// Administrative: deactivate a participant.
    pub fn deactivate(&self, caller: &Principal, principal: &Principal) -> Result<(), LedgerError> {
        self.write("deactivate", caller, |s, env| s.deactivate(env, caller, principal))
            .map(|w| w.value)
    }

    pub fn create_product(
        &self,
        caller: &Principal,
        product: NewProduct,
    ) -> Result<ProductId, LedgerError> {
        self.write("create_product", caller, |s, env| {
            s.create_product(env, caller, product)
        })
        .map(|w| w.value)
    }

    pub fn create_batch(
        &self,
        caller: &Principal,
        product_id: ProductId,
        external_code: impl Into<String>,
        location: impl Into<String>,
    ) -> Result<BatchId, LedgerError> {
        let (code, location) = (external_code.into(), location.into());
        self.write("create_batch", caller, |s, env| {
            s.create_batch(env, caller, product_id, code, location)
        })
        .map(|w| w.value)
    }

    pub fn transfer_ownership(
        &self,
        caller: &Principal,
        batch_id: BatchId,
        new_owner: &Principal,
        stage: Stage,
        location: impl Into<String>,
    ) -> Result<(), LedgerError> {
        let location = location.into();
        self.write("transfer_ownership", caller, |s, env| {
            s.transfer_ownership(env, caller, batch_id, new_owner, stage, location)
        })
        .map(|w| w.value)
    }

    pub fn update_quality(
        &self,
        caller: &Principal,
        batch_id: BatchId,
        grade: QualityGrade,
        reason: impl Into<String>,
    ) -> Result<(), LedgerError> {
        let reason = reason.into();
        self.write("update_quality", caller, |s, env| {
            s.update_quality(env, caller, batch_id, grade, reason)
        })
        .map(|w| w.value)
    }

    pub fn add_note(
        &self,
        caller: &Principal,
        batch_id: BatchId,
        note: impl Into<String>,
    ) -> Result<(), LedgerError> {
        let note = note.into();
        self.write("add_note", caller, |s, env| s.add_note(env, caller, batch_id, note))
            .map(|w| w.value)
    }

    /// Append an environmental reading; returns its index within the batch.
    pub fn record_provenance(
        &self,
        caller: &Principal,
        batch_id: BatchId,
        temperature: Centi,
        humidity: Centi,
        location: impl Into<String>,
        notes: impl Into<String>,
    ) -> Result<usize, LedgerError> {
        let (location, notes) = (location.into(), notes.into());
        self.write("record_provenance", caller, |s, env| {
            s.record_provenance(env, caller, batch_id, temperature, humidity, location, notes)
        })
        .map(|w| w.value)
    }

    pub fn create_transaction(
        &self,
        caller: &Principal,
        batch_id: BatchId,
        buyer: &Principal,
        price: u64,
        tx_type: impl Into<String>,
    ) -> Result<TransactionId, LedgerError> {
        let tx_type = tx_type.into();
        self.write("create_transaction", caller, |s, env| {
            s.create_transaction(env, caller, batch_id, buyer, price, tx_type)
        })
        .map(|w| w.value)
    }

    /// Settle a transaction with `payment` attached by the caller.
    pub fn complete_transaction(
        &self,
        caller: &Principal,
        transaction_id: TransactionId,
        payment: u64,
    ) -> Result<Settlement, LedgerError> {
        self.write("complete_transaction", caller, |s, env| {
            s.complete_transaction(env, caller, transaction_id, payment)
        })
        .map(|w| w.value)
    }

    // ── Read path ───────────────────────────────────────────────────

    fn read<T>(&self, f: impl FnOnce(&LedgerState) -> T) -> T {
        f(&self.committed.read().state)
    }

    /// A copy of the committed state.
    pub fn snapshot(&self) -> LedgerState {
        self.read(LedgerState::clone)
    }

    /// Digest of the committed state.
    pub fn state_root(&self) -> Result<ContentDigest, LedgerError> {
        self.read(LedgerState::state_root)
            .map_err(|err| LedgerError::Integrity(err.to_string()))
    }

    /// A copy of the event journal.
    pub fn journal(&self) -> EventJournal {
        self.committed.read().journal.clone()
    }

    /// Recompute the journal's hash chain.
    pub fn verify_journal(&self) -> Result<(), JournalError> {
        let result = self.committed.read().journal.verify();
        if let Err(err) = &result {
            tracing::warn!(error = %err, "journal verification failed");
        }
        result
    }

    pub fn participant(&self, principal: &Principal) -> Option<Participant> {
        self.read(|s| s.participants.get(principal).cloned())
    }

    pub fn is_active(&self, principal: &Principal) -> bool {
        self.read(|s| s.participants.is_active(principal))
    }

    pub fn role_of(&self, principal: &Principal) -> Option<Role> {
        self.read(|s| s.participants.role_of(principal))
    }

    pub fn product(&self, product_id: ProductId) -> Result<Product, LedgerError> {
        self.read(|s| s.products.get(product_id).cloned())
    }

    /// Products created by `producer`, in id order.
    pub fn products_of(&self, producer: &Principal) -> Vec<Product> {
        self.read(|s| s.products.by_producer(producer).cloned().collect())
    }

    pub fn batch(&self, batch_id: BatchId) -> Result<Batch, LedgerError> {
        self.read(|s| s.batches.get(batch_id).cloned())
    }

    /// Batches currently owned by `owner`, in id order.
    pub fn batches_owned_by(&self, owner: &Principal) -> Vec<Batch> {
        self.read(|s| s.batches.owned_by(owner).cloned().collect())
    }

    /// Resolve an external code; `None` if unmapped.
    pub fn batch_id_by_code(&self, code: &str) -> Option<BatchId> {
        self.read(|s| s.batches.id_by_code(code))
    }

    pub fn batch_history(&self, batch_id: BatchId) -> Result<Vec<HistoryEntry>, LedgerError> {
        self.read(|s| s.batch_history(batch_id))
    }

    pub fn batch_detail(&self, batch_id: BatchId) -> Result<BatchDetail, LedgerError> {
        self.read(|s| s.batch_detail(batch_id))
    }

    pub fn resolve_code(&self, code: &str) -> Result<CodeResolution, LedgerError> {
        self.read(|s| s.resolve_code(code))
    }

    pub fn product_detail(&self, product_id: ProductId) -> Result<ProductDetail, LedgerError> {
        self.read(|s| s.product_detail(product_id))
    }

    /// A batch's notes joined with the configured separator.
    pub fn notes_text(&self, batch_id: BatchId) -> Result<String, LedgerError> {
        self.read(|s| {
            s.batches
                .get(batch_id)
                .map(|b| b.notes_text(&self.config.note_separator))
        })
    }

    pub fn provenance_count(&self, batch_id: BatchId) -> usize {
        self.read(|s| s.provenance.count(batch_id))
    }

    pub fn provenance_at(
        &self,
        batch_id: BatchId,
        index: usize,
    ) -> Result<ProvenanceRecord, LedgerError> {
        self.read(|s| s.provenance.record_at(batch_id, index).cloned())
    }

    /// Up to `limit` readings of `batch_id` starting at `offset`.
    pub fn provenance_page(
        &self,
        batch_id: BatchId,
        offset: usize,
        limit: usize,
    ) -> Vec<ProvenanceRecord> {
        self.read(|s| s.provenance.page(batch_id, offset, limit).to_vec())
    }

    pub fn transaction(&self, id: TransactionId) -> Result<EscrowTransaction, LedgerError> {
        self.read(|s| s.escrow.get(id).cloned())
    }

    /// Transactions referencing `batch_id`, in id order.
    pub fn transactions_for_batch(&self, batch_id: BatchId) -> Vec<EscrowTransaction> {
        self.read(|s| s.escrow.for_batch(batch_id).cloned().collect())
    }

    pub fn balance_of(&self, principal: &Principal) -> u64 {
        self.read(|s| s.balances.balance_of(principal))
    }
}
