//! # agri-core — Foundational Types for the Provenance Ledger
//!
//! Defines the type-system primitives shared by the ledger engine and any
//! facade in front of it. Depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype identifiers.** `Principal`, `ProductId`, `BatchId`,
//!    `TransactionId` cannot be confused with one another. Id 0 is never
//!    assigned.
//!
//! 2. **Closed enums.** `Role`, `Stage`, `QualityGrade` each have one
//!    definition and a total mapping to a canonical string name.
//!
//! 3. **No floats.** Temperature and humidity are `Centi` scaled integers;
//!    canonical serialization rejects floats outright.
//!
//! 4. **UTC-only timestamps, injected clocks.** The engine reads time from a
//!    `Clock`, never from the system directly.
//!
//! 5. **One rejection taxonomy.** `LedgerError` with a flat `ErrorKind`.
//!
//! ## Crate Policy
//!
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod canonical;
pub mod digest;
pub mod domain;
pub mod error;
pub mod identity;
pub mod temporal;

pub use canonical::CanonicalBytes;
pub use digest::{sha256_digest, ContentDigest};
pub use domain::{Centi, QualityGrade, Role, Stage};
pub use error::{CanonicalizationError, ErrorKind, LedgerError};
pub use identity::{BatchId, Principal, ProductId, TransactionId};
pub use temporal::{Clock, ManualClock, SystemClock, Timestamp};
