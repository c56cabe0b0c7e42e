//! # Provenance Log
//!
//! Append-only environmental readings keyed by batch. A record's index
//! within its batch's sequence is assigned at append time and never
//! changes; records are never edited or removed.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use agri_core::{BatchId, Centi, LedgerError, Principal, Timestamp};

use crate::registry::require_text;

/// One environmental reading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvenanceRecord {
    pub batch_id: BatchId,
    pub recorded_at: Timestamp,
    /// Degrees Celsius ×100.
    pub temperature: Centi,
    /// Relative humidity percent ×100.
    pub humidity: Centi,
    pub location: String,
    pub recorded_by: Principal,
    pub notes: String,
}

/// Per-batch append-only sequences of readings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvenanceLog {
    records: BTreeMap<BatchId, Vec<ProvenanceRecord>>,
}

impl ProvenanceLog {
    /// Number of readings recorded for `batch`.
    pub fn count(&self, batch: BatchId) -> usize {
        self.records.get(&batch).map_or(0, Vec::len)
    }

    /// The reading at `index` in `batch`'s sequence.
    pub fn record_at(&self, batch: BatchId, index: usize) -> Result<&ProvenanceRecord, LedgerError> {
        let records = self.records.get(&batch).map(Vec::as_slice).unwrap_or(&[]);
        records.get(index).ok_or(LedgerError::IndexOutOfRange {
            index,
            len: records.len(),
        })
    }

    /// Up to `limit` readings starting at `offset`, in append order.
    ///
    /// An offset at or past the end yields an empty page.
    pub fn page(&self, batch: BatchId, offset: usize, limit: usize) -> &[ProvenanceRecord] {
        let records = self.records.get(&batch).map(Vec::as_slice).unwrap_or(&[]);
        let start = offset.min(records.len());
        let end = start.saturating_add(limit).min(records.len());
        &records[start..end]
    }

    /// Append a reading and return its index. Batch existence and the
    /// caller's standing are checked by the caller.
    pub(crate) fn append(&mut self, record: ProvenanceRecord) -> Result<usize, LedgerError> {
        require_text("location", &record.location)?;
        let sequence = self.records.entry(record.batch_id).or_default();
        sequence.push(record);
        Ok(sequence.len() - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agri_core::ErrorKind;

    fn reading(batch: BatchId, temperature: i64) -> ProvenanceRecord {
        ProvenanceRecord {
            batch_id: batch,
            recorded_at: Timestamp::parse("2026-04-02T10:00:00Z").unwrap(),
            temperature: Centi(temperature),
            humidity: Centi(6550),
            location: "Cold room".to_string(),
            recorded_by: Principal::new("dist").unwrap(),
            notes: String::new(),
        }
    }

    #[test]
    fn test_append_returns_sequential_indices() {
        let mut log = ProvenanceLog::default();
        assert_eq!(log.append(reading(BatchId(1), 400)).unwrap(), 0);
        assert_eq!(log.append(reading(BatchId(1), 410)).unwrap(), 1);
        assert_eq!(log.append(reading(BatchId(2), 900)).unwrap(), 0);
        assert_eq!(log.count(BatchId(1)), 2);
        assert_eq!(log.count(BatchId(2)), 1);
        assert_eq!(log.count(BatchId(3)), 0);
    }

    #[test]
    fn test_record_at_in_append_order() {
        let mut log = ProvenanceLog::default();
        for t in [100, -250, 375] {
            log.append(reading(BatchId(1), t)).unwrap();
        }
        let temps: Vec<_> = (0..log.count(BatchId(1)))
            .map(|i| log.record_at(BatchId(1), i).unwrap().temperature)
            .collect();
        assert_eq!(temps, vec![Centi(100), Centi(-250), Centi(375)]);
    }

    #[test]
    fn test_record_at_out_of_range() {
        let mut log = ProvenanceLog::default();
        log.append(reading(BatchId(1), 100)).unwrap();
        let err = log.record_at(BatchId(1), 1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IndexOutOfRange);
        assert_eq!(
            log.record_at(BatchId(7), 0).unwrap_err(),
            LedgerError::IndexOutOfRange { index: 0, len: 0 }
        );
    }

    #[test]
    fn test_append_requires_location() {
        let mut log = ProvenanceLog::default();
        let mut r = reading(BatchId(1), 100);
        r.location = " ".to_string();
        assert_eq!(log.append(r).unwrap_err().kind(), ErrorKind::InvalidInput);
        assert_eq!(log.count(BatchId(1)), 0);
    }

    #[test]
    fn test_page_bounds() {
        let mut log = ProvenanceLog::default();
        for t in 0..5 {
            log.append(reading(BatchId(1), t)).unwrap();
        }
        let page = log.page(BatchId(1), 1, 2);
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].temperature, Centi(1));
        assert_eq!(log.page(BatchId(1), 4, 10).len(), 1);
        assert!(log.page(BatchId(1), 9, 10).is_empty());
        assert!(log.page(BatchId(1), 0, usize::MAX).len() == 5);
        assert!(log.page(BatchId(2), 0, 10).is_empty());
    }
}
