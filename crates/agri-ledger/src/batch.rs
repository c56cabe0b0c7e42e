//! # Batch Lifecycle
//!
//! Models a tracked physical lot of a product as it moves from harvest to
//! sale, together with the write-once external code index.
//!
//! ## States
//!
//! ```text
//! Harvested ──▶ Processed ──▶ InTransit ──▶ Delivered ──▶ Sold (terminal)
//! ```
//!
//! A transition names any strictly greater stage; stages may be skipped but
//! never revisited. Ownership moves with the transition.
//!
//! ## History Invariant
//!
//! A batch keeps three parallel, append-only histories: owners, locations
//! and timestamps. They are written only by [`Batch::push_history`], which
//! appends to all three at once, so
//! `owners.len() == locations.len() == timestamps.len() >= 1` holds from
//! creation onward. The fields are private; callers read them through
//! [`Batch::history`].
//!
//! ## Design Decision
//!
//! The stage is an enum with a validated `advance()` rather than typestate.
//! Batches live in a shared table keyed by id and are retrieved at runtime,
//! so the stage can only be known at runtime too.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use agri_core::{BatchId, LedgerError, Principal, ProductId, Stage, Timestamp};

use crate::registry::require_text;

/// One row of a batch's custody history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub owner: Principal,
    pub location: String,
    pub timestamp: Timestamp,
}

/// One note appended to a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteEntry {
    pub actor: Principal,
    pub recorded_at: Timestamp,
    pub text: String,
}

/// A tracked batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batch {
    id: BatchId,
    product_id: ProductId,
    external_code: String,
    stage: Stage,
    owner: Principal,
    location: String,
    updated_at: Timestamp,
    notes: Vec<NoteEntry>,
    owner_history: Vec<Principal>,
    location_history: Vec<String>,
    timestamp_history: Vec<Timestamp>,
}

impl Batch {
    fn new(
        id: BatchId,
        product_id: ProductId,
        external_code: String,
        owner: Principal,
        location: String,
        now: Timestamp,
    ) -> Self {
        let mut batch = Self {
            id,
            product_id,
            external_code,
            stage: Stage::Harvested,
            owner: owner.clone(),
            location: location.clone(),
            updated_at: now,
            notes: Vec::new(),
            owner_history: Vec::new(),
            location_history: Vec::new(),
            timestamp_history: Vec::new(),
        };
        batch.push_history(owner, location, now);
        batch
    }

    pub fn id(&self) -> BatchId {
        self.id
    }

    pub fn product_id(&self) -> ProductId {
        self.product_id
    }

    pub fn external_code(&self) -> &str {
        &self.external_code
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn owner(&self) -> &Principal {
        &self.owner
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    /// Time of the most recent custody change.
    pub fn updated_at(&self) -> Timestamp {
        self.updated_at
    }

    pub fn notes(&self) -> &[NoteEntry] {
        &self.notes
    }

    /// Notes rendered as one string, oldest first.
    pub fn notes_text(&self, separator: &str) -> String {
        self.notes
            .iter()
            .map(|n| format!("[{}] {}: {}", n.recorded_at, n.actor, n.text))
            .collect::<Vec<_>>()
            .join(separator)
    }

    /// Number of custody history entries.
    pub fn history_len(&self) -> usize {
        self.owner_history.len()
    }

    /// Custody history, oldest first.
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.owner_history
            .iter()
            .zip(&self.location_history)
            .zip(&self.timestamp_history)
            .map(|((owner, location), timestamp)| HistoryEntry {
                owner: owner.clone(),
                location: location.clone(),
                timestamp: *timestamp,
            })
            .collect()
    }

    /// Whether the three parallel histories have equal, non-zero length.
    pub fn histories_consistent(&self) -> bool {
        let n = self.owner_history.len();
        n >= 1 && self.location_history.len() == n && self.timestamp_history.len() == n
    }

    /// Move the batch forward to `stage` under a new owner and location.
    ///
    /// Ownership and the new owner's standing are checked by the caller;
    /// this validates the stage order and the location, then appends one
    /// history entry.
    pub(crate) fn advance(
        &mut self,
        new_owner: Principal,
        stage: Stage,
        location: String,
        now: Timestamp,
    ) -> Result<(), LedgerError> {
        if !self.stage.can_advance_to(stage) {
            return Err(LedgerError::NonMonotonicStage {
                from: self.stage.to_string(),
                to: stage.to_string(),
            });
        }
        require_text("location", &location)?;

        self.stage = stage;
        self.owner = new_owner.clone();
        self.location = location.clone();
        self.updated_at = now;
        self.push_history(new_owner, location, now);
        Ok(())
    }

    /// Hand the batch to a new owner in place (settlement).
    pub(crate) fn reassign_owner(&mut self, new_owner: Principal, now: Timestamp) {
        self.owner = new_owner.clone();
        self.updated_at = now;
        let location = self.location.clone();
        self.push_history(new_owner, location, now);
    }

    pub(crate) fn push_note(&mut self, actor: Principal, text: String, now: Timestamp) {
        self.notes.push(NoteEntry {
            actor,
            recorded_at: now,
            text,
        });
    }

    fn push_history(&mut self, owner: Principal, location: String, now: Timestamp) {
        self.owner_history.push(owner);
        self.location_history.push(location);
        self.timestamp_history.push(now);
    }
}

/// The batch table and the external code index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchBook {
    batches: BTreeMap<BatchId, Batch>,
    codes: BTreeMap<String, BatchId>,
    next_id: BatchId,
}

impl Default for BatchBook {
    fn default() -> Self {
        Self {
            batches: BTreeMap::new(),
            codes: BTreeMap::new(),
            next_id: BatchId::FIRST,
        }
    }
}

impl BatchBook {
    /// Look up a batch. Unknown and zero ids are `InvalidBatch`.
    pub fn get(&self, id: BatchId) -> Result<&Batch, LedgerError> {
        self.batches
            .get(&id)
            .ok_or_else(|| LedgerError::InvalidBatch(id.to_string()))
    }

    /// Resolve an external code. `None` is the defined miss result.
    pub fn id_by_code(&self, code: &str) -> Option<BatchId> {
        self.codes.get(code).copied()
    }

    /// All batches in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Batch> {
        self.batches.values()
    }

    /// Batches currently owned by `owner`, in id order.
    pub fn owned_by<'a>(&'a self, owner: &'a Principal) -> impl Iterator<Item = &'a Batch> {
        self.batches.values().filter(move |b| b.owner() == owner)
    }

    /// Batches of `product`, in id order.
    pub fn of_product(&self, product: ProductId) -> impl Iterator<Item = &Batch> {
        self.batches.values().filter(move |b| b.product_id() == product)
    }

    pub fn len(&self) -> usize {
        self.batches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    pub(crate) fn get_mut(&mut self, id: BatchId) -> Result<&mut Batch, LedgerError> {
        self.batches
            .get_mut(&id)
            .ok_or_else(|| LedgerError::InvalidBatch(id.to_string()))
    }

    /// Create a batch for an already-authorized producer.
    pub(crate) fn create(
        &mut self,
        product_id: ProductId,
        external_code: String,
        owner: Principal,
        location: String,
        now: Timestamp,
    ) -> Result<BatchId, LedgerError> {
        require_text("external code", &external_code)?;
        require_text("initial location", &location)?;
        if let Some(existing) = self.codes.get(&external_code) {
            return Err(LedgerError::DuplicateCode(format!(
                "{external_code:?} already resolves to {existing}"
            )));
        }

        let id = self.next_id;
        self.codes.insert(external_code.clone(), id);
        self.batches.insert(
            id,
            Batch::new(id, product_id, external_code, owner, location, now),
        );
        self.next_id = id.next();
        Ok(id)
    }
}
