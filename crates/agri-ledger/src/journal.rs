//! # Event Journal
//!
//! Append-only audit trail of committed writes. Every successful write
//! appends exactly one [`LedgerEvent`]; rejected writes append nothing.
//!
//! ## Security Invariant
//!
//! Events are hash-chained. Each event carries the digest of its
//! predecessor (`prev_digest`, all zeros for the first event) and its own
//! `digest`, computed with `sha256_digest` over the canonical bytes of the
//! event body including `prev_digest`. Altering, dropping or reordering any
//! event breaks every later link, which [`EventJournal::verify`] reports.
//!
//! External observers subscribe through [`EventSink`]. The journal is
//! authoritative; sinks are notified after commit and are never consulted
//! for the engine's own correctness.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use agri_core::{
    sha256_digest, BatchId, CanonicalBytes, CanonicalizationError, ContentDigest, Principal,
    ProductId, QualityGrade, Role, Stage, Timestamp, TransactionId,
};

/// What a committed write did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    ParticipantRegistered {
        principal: Principal,
        role: Role,
    },
    ReputationUpdated {
        principal: Principal,
        reputation: u32,
    },
    ParticipantDeactivated {
        principal: Principal,
    },
    ProductCreated {
        product_id: ProductId,
        producer: Principal,
    },
    BatchCreated {
        batch_id: BatchId,
        product_id: ProductId,
        external_code: String,
    },
    OwnershipTransferred {
        batch_id: BatchId,
        from: Principal,
        to: Principal,
        stage: Stage,
        location: String,
    },
    QualityUpdated {
        batch_id: BatchId,
        product_id: ProductId,
        grade: QualityGrade,
    },
    NoteAdded {
        batch_id: BatchId,
    },
    EnvironmentRecorded {
        batch_id: BatchId,
        index: usize,
    },
    TransactionCreated {
        transaction_id: TransactionId,
        batch_id: BatchId,
        seller: Principal,
        buyer: Principal,
        price: u64,
    },
    TransactionCompleted {
        transaction_id: TransactionId,
        batch_id: BatchId,
        seller: Principal,
        buyer: Principal,
        price: u64,
        refund: u64,
    },
}

impl EventKind {
    /// Short name of the event type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ParticipantRegistered { .. } => "participant_registered",
            Self::ReputationUpdated { .. } => "reputation_updated",
            Self::ParticipantDeactivated { .. } => "participant_deactivated",
            Self::ProductCreated { .. } => "product_created",
            Self::BatchCreated { .. } => "batch_created",
            Self::OwnershipTransferred { .. } => "ownership_transferred",
            Self::QualityUpdated { .. } => "quality_updated",
            Self::NoteAdded { .. } => "note_added",
            Self::EnvironmentRecorded { .. } => "environment_recorded",
            Self::TransactionCreated { .. } => "transaction_created",
            Self::TransactionCompleted { .. } => "transaction_completed",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One sealed journal entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEvent {
    /// Position in the journal, starting at 0.
    pub sequence: u64,
    pub recorded_at: Timestamp,
    /// The principal whose write produced the event.
    pub actor: Principal,
    pub kind: EventKind,
    pub prev_digest: ContentDigest,
    pub digest: ContentDigest,
}

/// The digested portion of an event.
#[derive(Serialize)]
struct EventBody<'a> {
    sequence: u64,
    recorded_at: &'a Timestamp,
    actor: &'a Principal,
    kind: &'a EventKind,
    prev_digest: &'a ContentDigest,
}

fn seal(
    sequence: u64,
    recorded_at: &Timestamp,
    actor: &Principal,
    kind: &EventKind,
    prev_digest: &ContentDigest,
) -> Result<ContentDigest, CanonicalizationError> {
    let body = EventBody {
        sequence,
        recorded_at,
        actor,
        kind,
        prev_digest,
    };
    Ok(sha256_digest(&CanonicalBytes::new(&body)?))
}

/// Errors raised by the journal.
#[derive(Error, Debug)]
pub enum JournalError {
    /// The event body could not be canonicalized.
    #[error("event canonicalization failed: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    /// An event's sequence number is not its position.
    #[error("event at position {position} carries sequence {sequence}")]
    SequenceGap {
        /// Position in the journal.
        position: u64,
        /// Sequence number found.
        sequence: u64,
    },

    /// An event does not link to its predecessor.
    #[error("event {sequence} does not link to its predecessor")]
    BrokenLink {
        /// The offending event.
        sequence: u64,
    },

    /// An event's digest does not match its contents.
    #[error("event {sequence} digest mismatch: expected {expected}, found {found}")]
    DigestMismatch {
        /// The offending event.
        sequence: u64,
        /// Recomputed digest.
        expected: String,
        /// Stored digest.
        found: String,
    },
}

/// Ordered, hash-chained list of committed events.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventJournal {
    events: Vec<LedgerEvent>,
}

impl EventJournal {
    /// All events, oldest first.
    pub fn events(&self) -> &[LedgerEvent] {
        &self.events
    }

    /// Number of events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether no write has committed yet.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Digest of the newest event, or zero for an empty journal.
    pub fn head(&self) -> ContentDigest {
        self.events.last().map_or(ContentDigest::ZERO, |e| e.digest)
    }

    /// Seal and append an event. On error nothing is appended.
    pub fn append(
        &mut self,
        actor: Principal,
        recorded_at: Timestamp,
        kind: EventKind,
    ) -> Result<&LedgerEvent, JournalError> {
        let sequence = self.events.len() as u64;
        let prev_digest = self.head();
        let digest = seal(sequence, &recorded_at, &actor, &kind, &prev_digest)?;
        self.events.push(LedgerEvent {
            sequence,
            recorded_at,
            actor,
            kind,
            prev_digest,
            digest,
        });
        Ok(&self.events[self.events.len() - 1])
    }

    /// Recompute the whole chain and report the first broken event.
    pub fn verify(&self) -> Result<(), JournalError> {
        let mut prev = ContentDigest::ZERO;
        for (position, event) in self.events.iter().enumerate() {
            let position = position as u64;
            if event.sequence != position {
                return Err(JournalError::SequenceGap {
                    position,
                    sequence: event.sequence,
                });
            }
            if event.prev_digest != prev {
                return Err(JournalError::BrokenLink {
                    sequence: event.sequence,
                });
            }
            let expected = seal(
                event.sequence,
                &event.recorded_at,
                &event.actor,
                &event.kind,
                &event.prev_digest,
            )?;
            if expected != event.digest {
                return Err(JournalError::DigestMismatch {
                    sequence: event.sequence,
                    expected: expected.to_hex(),
                    found: event.digest.to_hex(),
                });
            }
            prev = event.digest;
        }
        Ok(())
    }
}

/// Observer of committed events.
///
/// Called after the write is visible to readers, in journal order. A sink
/// may call back into the ledger.
pub trait EventSink: Send + Sync {
    fn on_event(&self, event: &LedgerEvent);
}
