//! # Domain Enums and Measurements
//!
//! Closed sets used across the ledger: participant roles, the five batch
//! lifecycle stages, product quality grades, and the fixed-point
//! measurement type used for temperature and humidity readings.
//!
//! Each enum has a single definition with exhaustive `match` mappings to
//! its canonical string name. Adding a variant forces every consumer to
//! handle it.

use serde::{Deserialize, Serialize};

use crate::error::LedgerError;

// ─── Roles ───────────────────────────────────────────────────────────

/// The role a participant registered with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Grows and harvests products; the only role that may create products and batches.
    Producer,
    /// Processor, aggregator or inspector between producer and distribution.
    Intermediary,
    /// Moves goods between sites.
    Distributor,
    /// Sells to the end customer.
    Retailer,
}

impl Role {
    /// The canonical string name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Producer => "PRODUCER",
            Self::Intermediary => "INTERMEDIARY",
            Self::Distributor => "DISTRIBUTOR",
            Self::Retailer => "RETAILER",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Lifecycle Stages ────────────────────────────────────────────────

/// Lifecycle stage of a batch.
///
/// Stages form a strict total order. A batch only ever moves to a stage
/// with a strictly greater value than its current one; no stage is
/// revisited.
///
/// ```text
/// Harvested(0) ──▶ Processed(1) ──▶ InTransit(2) ──▶ Delivered(3) ──▶ Sold(4)
/// ```
///
/// Stages may be skipped (Harvested → Delivered is a valid forward move).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum Stage {
    Harvested = 0,
    Processed = 1,
    InTransit = 2,
    Delivered = 3,
    Sold = 4,
}

impl Stage {
    /// All stages in lifecycle order.
    pub const ALL: [Stage; 5] = [
        Self::Harvested,
        Self::Processed,
        Self::InTransit,
        Self::Delivered,
        Self::Sold,
    ];

    /// The numeric stage value (0-4).
    pub fn value(&self) -> u8 {
        *self as u8
    }

    /// Look up a stage by numeric value.
    pub fn from_value(value: u8) -> Option<Stage> {
        Self::ALL.get(usize::from(value)).copied()
    }

    /// Whether moving from `self` to `to` is a forward transition.
    pub fn can_advance_to(&self, to: Stage) -> bool {
        to > *self
    }

    /// The canonical string name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Harvested => "HARVESTED",
            Self::Processed => "PROCESSED",
            Self::InTransit => "IN_TRANSIT",
            Self::Delivered => "DELIVERED",
            Self::Sold => "SOLD",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Quality Grades ──────────────────────────────────────────────────

/// Current quality assessment of a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QualityGrade {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl QualityGrade {
    /// The canonical string name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Excellent => "EXCELLENT",
            Self::Good => "GOOD",
            Self::Fair => "FAIR",
            Self::Poor => "POOR",
        }
    }
}

impl std::fmt::Display for QualityGrade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Fixed-Point Measurements ────────────────────────────────────────

/// A signed measurement with two decimal places, stored as an integer
/// scaled by 100 (`23.45` is stored as `2345`).
///
/// Floats never enter the ledger: canonical digests reject them, and
/// scaled integers compare and serialize deterministically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Centi(pub i64);

impl Centi {
    /// Scale factor between the stored integer and the displayed value.
    pub const SCALE: i64 = 100;
}

impl std::fmt::Display for Centi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let scale = Self::SCALE.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / scale, abs % scale)
    }
}

impl std::str::FromStr for Centi {
    type Err = LedgerError;

    /// Parse a decimal string with at most two fractional digits.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || LedgerError::InvalidInput(format!("invalid measurement {s:?}"));
        let (negative, digits) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let (whole, frac) = digits.split_once('.').unwrap_or((digits, ""));
        if whole.is_empty() || frac.len() > 2 {
            return Err(invalid());
        }
        if !whole.bytes().all(|b| b.is_ascii_digit()) || !frac.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(invalid());
        }
        let whole: i64 = whole.parse().map_err(|_| invalid())?;
        let frac: i64 = match frac.len() {
            0 => 0,
            1 => frac.parse::<i64>().map_err(|_| invalid())? * 10,
            _ => frac.parse().map_err(|_| invalid())?,
        };
        let magnitude = whole
            .checked_mul(Self::SCALE)
            .and_then(|w| w.checked_add(frac))
            .ok_or_else(invalid)?;
        Ok(Self(if negative { -magnitude } else { magnitude }))
    }
}
