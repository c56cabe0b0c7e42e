//! # agri-ledger — Provenance Ledger Execution Engine
//!
//! A deterministic, single-writer state machine for agricultural supply
//! chains. Participants register under a role, producers create products
//! and batches, batches move forward through their lifecycle as ownership
//! changes hands, environmental readings accumulate in an append-only log,
//! and two-phase escrow transactions settle a batch to its buyer.
//!
//! ## Architecture
//!
//! - [`registry`], [`catalog`], [`batch`], [`provenance`], [`escrow`] and
//!   [`balances`] each own one table and its local validation.
//! - [`state::LedgerState`] composes the tables and runs the cross-table
//!   authorization for every write.
//! - [`journal`] seals each committed write into a hash-chained event.
//! - [`engine::Ledger`] serializes writes, applies each in place once its
//!   checks pass and commits it atomically with its event.
//! - [`command`] is the serializable request shape; [`query`] holds the
//!   read-only projections.
//!
//! ## Crate Policy
//!
//! - No `unsafe` code.
//! - No static mutable state; every ledger is an owned value.
//! - The library logs through `tracing` and never installs a subscriber.

pub mod balances;
pub mod batch;
pub mod catalog;
pub mod command;
pub mod config;
pub mod engine;
pub mod escrow;
pub mod journal;
pub mod provenance;
pub mod query;
pub mod registry;
pub mod state;

pub use balances::Balances;
pub use batch::{Batch, BatchBook, HistoryEntry, NoteEntry};
pub use catalog::{NewProduct, Product, ProductCatalog};
pub use command::{Command, Outcome, Receipt, Submission};
pub use config::{ConfigError, LedgerConfig};
pub use engine::Ledger;
pub use escrow::{EscrowBook, EscrowTransaction, Settlement};
pub use journal::{EventJournal, EventKind, EventSink, JournalError, LedgerEvent};
pub use provenance::{ProvenanceLog, ProvenanceRecord};
pub use query::{BatchDetail, CodeResolution, ProductDetail};
pub use registry::{Participant, ParticipantRegistry};
pub use state::LedgerState;
