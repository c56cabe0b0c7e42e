//! # Ledger State
//!
//! The complete entity set owned by one engine instance: participants,
//! products, batches with their code index, provenance logs, escrow
//! transactions and balances.
//!
//! The write operations here authorize a request against the registry and
//! the target entity, then mutate. They are `pub(crate)`: the only way to
//! reach them from outside the crate is through [`crate::Ledger`], which
//! applies them in place under its write lock.
//!
//! ## Atomicity Invariant
//!
//! Every operation finishes all of its checks before its first mutation,
//! and nothing after that first mutation can fail. A rejected operation
//! therefore leaves `self` exactly as it found it. Settlement stages its
//! balance credits up front for this reason.

use serde::{Deserialize, Serialize};

use agri_core::{
    sha256_digest, BatchId, CanonicalBytes, CanonicalizationError, Centi, ContentDigest,
    LedgerError, Principal, ProductId, QualityGrade, Role, Stage, Timestamp, TransactionId,
};

use crate::balances::Balances;
use crate::batch::BatchBook;
use crate::catalog::{NewProduct, ProductCatalog};
use crate::config::LedgerConfig;
use crate::escrow::{EscrowBook, Settlement};
use crate::journal::EventKind;
use crate::provenance::{ProvenanceLog, ProvenanceRecord};
use crate::registry::{require_text, ParticipantRegistry};

/// Inputs shared by every write: the admission time and the configuration.
#[derive(Debug, Clone, Copy)]
pub(crate) struct WriteEnv<'a> {
    pub now: Timestamp,
    pub config: &'a LedgerConfig,
}

/// Result of a successful write together with the event it emits.
#[derive(Debug)]
pub(crate) struct Applied<R> {
    pub value: R,
    pub event: EventKind,
}

impl<R> Applied<R> {
    fn new(value: R, event: EventKind) -> Self {
        Self { value, event }
    }

    pub(crate) fn map<S>(self, f: impl FnOnce(R) -> S) -> Applied<S> {
        Applied {
            value: f(self.value),
            event: self.event,
        }
    }
}

/// Every table the engine owns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerState {
    pub participants: ParticipantRegistry,
    pub products: ProductCatalog,
    pub batches: BatchBook,
    pub provenance: ProvenanceLog,
    pub escrow: EscrowBook,
    pub balances: Balances,
}

impl LedgerState {
    /// SHA-256 of the canonical serialization of the whole state.
    pub fn state_root(&self) -> Result<ContentDigest, CanonicalizationError> {
        Ok(sha256_digest(&CanonicalBytes::new(self)?))
    }

    /// Whether every batch satisfies the history-length invariant.
    pub fn histories_consistent(&self) -> bool {
        self.batches.iter().all(|b| b.histories_consistent())
    }

    // ── Identity & Role Registry ────────────────────────────────────

    pub(crate) fn register(
        &mut self,
        env: &WriteEnv<'_>,
        principal: &Principal,
        name: String,
        location: String,
        role: Role,
    ) -> Result<Applied<()>, LedgerError> {
        self.participants.register(
            principal.clone(),
            name,
            location,
            role,
            env.config.starting_reputation,
            env.now,
        )?;
        Ok(Applied::new(
            (),
            EventKind::ParticipantRegistered {
                principal: principal.clone(),
                role,
            },
        ))
    }

    pub(crate) fn set_reputation(
        &mut self,
        env: &WriteEnv<'_>,
        caller: &Principal,
        principal: &Principal,
        reputation: u32,
    ) -> Result<Applied<()>, LedgerError> {
        require_administrator(env.config, caller)?;
        self.participants.set_reputation(principal, reputation)?;
        Ok(Applied::new(
            (),
            EventKind::ReputationUpdated {
                principal: principal.clone(),
                reputation,
            },
        ))
    }

    pub(crate) fn deactivate(
        &mut self,
        env: &WriteEnv<'_>,
        caller: &Principal,
        principal: &Principal,
    ) -> Result<Applied<()>, LedgerError> {
        require_administrator(env.config, caller)?;
        self.participants.deactivate(principal)?;
        Ok(Applied::new(
            (),
            EventKind::ParticipantDeactivated {
                principal: principal.clone(),
            },
        ))
    }

    // ── Product Catalog ─────────────────────────────────────────────

    pub(crate) fn create_product(
        &mut self,
        env: &WriteEnv<'_>,
        producer: &Principal,
        new: NewProduct,
    ) -> Result<Applied<ProductId>, LedgerError> {
        self.participants.require_active(producer)?;
        self.participants.require_role(producer, Role::Producer)?;
        let id = self.products.create(producer.clone(), new, env.now)?;
        Ok(Applied::new(
            id,
            EventKind::ProductCreated {
                product_id: id,
                producer: producer.clone(),
            },
        ))
    }

    // ── Batch Lifecycle Tracker ─────────────────────────────────────

    pub(crate) fn create_batch(
        &mut self,
        env: &WriteEnv<'_>,
        producer: &Principal,
        product_id: ProductId,
        external_code: String,
        location: String,
    ) -> Result<Applied<BatchId>, LedgerError> {
        self.participants.require_active(producer)?;
        self.participants.require_role(producer, Role::Producer)?;
        let product = self.products.get(product_id)?;
        if &product.producer != producer {
            return Err(LedgerError::Unauthorized(format!(
                "{product_id} belongs to {}, not {producer}",
                product.producer
            )));
        }
        let id = self.batches.create(
            product_id,
            external_code.clone(),
            producer.clone(),
            location,
            env.now,
        )?;
        Ok(Applied::new(
            id,
            EventKind::BatchCreated {
                batch_id: id,
                product_id,
                external_code,
            },
        ))
    }

    pub(crate) fn transfer_ownership(
        &mut self,
        env: &WriteEnv<'_>,
        caller: &Principal,
        batch_id: BatchId,
        new_owner: &Principal,
        stage: Stage,
        location: String,
    ) -> Result<Applied<()>, LedgerError> {
        let owner = self.batches.get(batch_id)?.owner().clone();
        if &owner != caller {
            return Err(LedgerError::Unauthorized(format!(
                "{caller} does not own {batch_id}"
            )));
        }
        if !self.participants.is_active(new_owner) {
            return Err(LedgerError::InactiveOwner(new_owner.to_string()));
        }
        self.batches
            .get_mut(batch_id)?
            .advance(new_owner.clone(), stage, location.clone(), env.now)?;
        Ok(Applied::new(
            (),
            EventKind::OwnershipTransferred {
                batch_id,
                from: owner,
                to: new_owner.clone(),
                stage,
                location,
            },
        ))
    }

    pub(crate) fn update_quality(
        &mut self,
        env: &WriteEnv<'_>,
        caller: &Principal,
        batch_id: BatchId,
        grade: QualityGrade,
        reason: String,
    ) -> Result<Applied<()>, LedgerError> {
        let batch = self.batches.get(batch_id)?;
        let product_id = batch.product_id();
        let participant = self.participants.require_active(caller)?;
        let is_owner = batch.owner() == caller;
        if !is_owner && !env.config.can_assess_quality(participant.role) {
            return Err(LedgerError::Unauthorized(format!(
                "{caller} neither owns {batch_id} nor holds a quality assessor role"
            )));
        }

        self.products.set_quality(product_id, grade)?;
        if !reason.trim().is_empty() {
            self.batches.get_mut(batch_id)?.push_note(
                caller.clone(),
                format!("Quality updated to {grade}: {reason}"),
                env.now,
            );
        }
        Ok(Applied::new(
            (),
            EventKind::QualityUpdated {
                batch_id,
                product_id,
                grade,
            },
        ))
    }

    pub(crate) fn add_note(
        &mut self,
        env: &WriteEnv<'_>,
        caller: &Principal,
        batch_id: BatchId,
        note: String,
    ) -> Result<Applied<()>, LedgerError> {
        self.participants.require_active(caller)?;
        let batch = self.batches.get_mut(batch_id)?;
        require_text("note", &note)?;
        batch.push_note(caller.clone(), note, env.now);
        Ok(Applied::new((), EventKind::NoteAdded { batch_id }))
    }

    // ── Provenance Log ──────────────────────────────────────────────

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn record_provenance(
        &mut self,
        env: &WriteEnv<'_>,
        caller: &Principal,
        batch_id: BatchId,
        temperature: Centi,
        humidity: Centi,
        location: String,
        notes: String,
    ) -> Result<Applied<usize>, LedgerError> {
        self.participants.require_active(caller)?;
        self.batches.get(batch_id)?;
        let index = self.provenance.append(ProvenanceRecord {
            batch_id,
            recorded_at: env.now,
            temperature,
            humidity,
            location,
            recorded_by: caller.clone(),
            notes,
        })?;
        Ok(Applied::new(
            index,
            EventKind::EnvironmentRecorded { batch_id, index },
        ))
    }

    // ── Escrow Transaction Manager ──────────────────────────────────

    pub(crate) fn create_transaction(
        &mut self,
        env: &WriteEnv<'_>,
        caller: &Principal,
        batch_id: BatchId,
        buyer: &Principal,
        price: u64,
        tx_type: String,
    ) -> Result<Applied<TransactionId>, LedgerError> {
        let batch = self.batches.get(batch_id)?;
        if batch.owner() != caller {
            return Err(LedgerError::Unauthorized(format!(
                "{caller} does not own {batch_id}"
            )));
        }
        if !self.participants.is_active(buyer) {
            return Err(LedgerError::InactiveParticipant(buyer.to_string()));
        }
        let id = self
            .escrow
            .open(batch_id, caller.clone(), buyer.clone(), price, tx_type, env.now)?;
        Ok(Applied::new(
            id,
            EventKind::TransactionCreated {
                transaction_id: id,
                batch_id,
                seller: caller.clone(),
                buyer: buyer.clone(),
                price,
            },
        ))
    }

    /// Settle a pending transaction.
    ///
    /// The credits to the seller and the refund are staged first, so an
    /// overflow is rejected before anything changes. Then effects before
    /// interactions: the completed flag and the batch's new owner are
    /// written, and only then are the staged credits applied.
    pub(crate) fn complete_transaction(
        &mut self,
        env: &WriteEnv<'_>,
        caller: &Principal,
        transaction_id: TransactionId,
        payment: u64,
    ) -> Result<Applied<Settlement>, LedgerError> {
        let tx = self.escrow.check_completion(transaction_id, caller, payment)?;
        let settlement = Settlement {
            transaction_id,
            batch_id: tx.batch_id,
            seller: tx.seller.clone(),
            buyer: tx.buyer.clone(),
            price: tx.price,
            refund: payment - tx.price,
        };
        let batch = self.batches.get(settlement.batch_id)?;
        if batch.owner() != &settlement.seller {
            return Err(LedgerError::Unauthorized(format!(
                "seller {} no longer owns {}",
                settlement.seller, settlement.batch_id
            )));
        }

        let credits = self.balances.stage(&[
            (&settlement.seller, settlement.price),
            (caller, settlement.refund),
        ])?;

        // Effects.
        self.escrow.mark_completed(transaction_id, env.now)?;
        self.batches
            .get_mut(settlement.batch_id)?
            .reassign_owner(settlement.buyer.clone(), env.now);

        // Interactions.
        self.balances.apply(credits);

        Ok(Applied::new(
            settlement.clone(),
            EventKind::TransactionCompleted {
                transaction_id,
                batch_id: settlement.batch_id,
                seller: settlement.seller,
                buyer: settlement.buyer,
                price: settlement.price,
                refund: settlement.refund,
            },
        ))
    }
}

fn require_administrator(config: &LedgerConfig, caller: &Principal) -> Result<(), LedgerError> {
    if !config.is_administrator(caller) {
        return Err(LedgerError::Unauthorized(format!(
            "{caller} does not hold the administrative capability"
        )));
    }
    Ok(())
}
