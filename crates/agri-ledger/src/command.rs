//! # Command Model
//!
//! The request shape a facade forwards to the engine. A [`Submission`]
//! pairs the authenticated caller with one [`Command`]; the engine answers
//! with a [`Receipt`] naming the journal entry the write produced.
//!
//! Commands deserialize from tagged JSON:
//!
//! ```json
//! {
//!   "caller": "farm-a",
//!   "command": {
//!     "op": "create_batch",
//!     "product_id": 1,
//!     "external_code": "QR1",
//!     "location": "Warehouse"
//!   }
//! }
//! ```

use serde::{Deserialize, Serialize};

use agri_core::{
    BatchId, Centi, ContentDigest, LedgerError, Principal, ProductId, QualityGrade, Role, Stage,
    TransactionId,
};

use crate::catalog::NewProduct;
use crate::escrow::Settlement;
use crate::state::{Applied, LedgerState, WriteEnv};

/// One write operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Command {
    Register {
        name: String,
        location: String,
        role: Role,
    },
    SetReputation {
        principal: Principal,
        reputation: u32,
    },
    Deactivate {
        principal: Principal,
    },
    CreateProduct(NewProduct),
    CreateBatch {
        product_id: ProductId,
        external_code: String,
        location: String,
    },
    TransferOwnership {
        batch_id: BatchId,
        new_owner: Principal,
        stage: Stage,
        location: String,
    },
    UpdateQuality {
        batch_id: BatchId,
        grade: QualityGrade,
        #[serde(default)]
        reason: String,
    },
    AddNote {
        batch_id: BatchId,
        note: String,
    },
    RecordProvenance {
        batch_id: BatchId,
        temperature: Centi,
        humidity: Centi,
        location: String,
        #[serde(default)]
        notes: String,
    },
    CreateTransaction {
        batch_id: BatchId,
        buyer: Principal,
        price: u64,
        tx_type: String,
    },
    CompleteTransaction {
        transaction_id: TransactionId,
        /// Value attached to the call.
        payment: u64,
    },
}

impl Command {
    /// Operation name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Register { .. } => "register",
            Self::SetReputation { .. } => "set_reputation",
            Self::Deactivate { .. } => "deactivate",
            Self::CreateProduct(_) => "create_product",
            Self::CreateBatch { .. } => "create_batch",
            Self::TransferOwnership { .. } => "transfer_ownership",
            Self::UpdateQuality { .. } => "update_quality",
            Self::AddNote { .. } => "add_note",
            Self::RecordProvenance { .. } => "record_provenance",
            Self::CreateTransaction { .. } => "create_transaction",
            Self::CompleteTransaction { .. } => "complete_transaction",
        }
    }

    pub(crate) fn apply(
        self,
        state: &mut LedgerState,
        env: &WriteEnv<'_>,
        caller: &Principal,
    ) -> Result<Applied<Outcome>, LedgerError> {
        match self {
            Self::Register {
                name,
                location,
                role,
            } => state
                .register(env, caller, name, location, role)
                .map(|a| a.map(|()| Outcome::Registered)),
            Self::SetReputation {
                principal,
                reputation,
            } => state
                .set_reputation(env, caller, &principal, reputation)
                .map(|a| a.map(|()| Outcome::ReputationUpdated)),
            Self::Deactivate { principal } => state
                .deactivate(env, caller, &principal)
                .map(|a| a.map(|()| Outcome::Deactivated)),
            Self::CreateProduct(new) => state
                .create_product(env, caller, new)
                .map(|a| a.map(|product_id| Outcome::ProductCreated { product_id })),
            Self::CreateBatch {
                product_id,
                external_code,
                location,
            } => state
                .create_batch(env, caller, product_id, external_code, location)
                .map(|a| a.map(|batch_id| Outcome::BatchCreated { batch_id })),
            Self::TransferOwnership {
                batch_id,
                new_owner,
                stage,
                location,
            } => state
                .transfer_ownership(env, caller, batch_id, &new_owner, stage, location)
                .map(|a| a.map(|()| Outcome::OwnershipTransferred)),
            Self::UpdateQuality {
                batch_id,
                grade,
                reason,
            } => state
                .update_quality(env, caller, batch_id, grade, reason)
                .map(|a| a.map(|()| Outcome::QualityUpdated)),
            Self::AddNote { batch_id, note } => state
                .add_note(env, caller, batch_id, note)
                .map(|a| a.map(|()| Outcome::NoteAdded)),
            Self::RecordProvenance {
                batch_id,
                temperature,
                humidity,
                location,
                notes,
            } => state
                .record_provenance(env, caller, batch_id, temperature, humidity, location, notes)
                .map(|a| a.map(|index| Outcome::EnvironmentRecorded { index })),
            Self::CreateTransaction {
                batch_id,
                buyer,
                price,
                tx_type,
            } => state
                .create_transaction(env, caller, batch_id, &buyer, price, tx_type)
                .map(|a| a.map(|transaction_id| Outcome::TransactionCreated { transaction_id })),
            Self::CompleteTransaction {
                transaction_id,
                payment,
            } => state
                .complete_transaction(env, caller, transaction_id, payment)
                .map(|a| a.map(Outcome::TransactionCompleted)),
        }
    }
}

/// A command together with the principal submitting it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub caller: Principal,
    pub command: Command,
}

/// What a successful command returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Outcome {
    Registered,
    ReputationUpdated,
    Deactivated,
    ProductCreated { product_id: ProductId },
    BatchCreated { batch_id: BatchId },
    OwnershipTransferred,
    QualityUpdated,
    NoteAdded,
    EnvironmentRecorded { index: usize },
    TransactionCreated { transaction_id: TransactionId },
    TransactionCompleted(Settlement),
}

/// Acknowledgement of a committed command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    /// Sequence number of the journal entry the write produced.
    pub sequence: u64,
    /// Digest of that journal entry.
    pub digest: ContentDigest,
    pub outcome: Outcome,
}
