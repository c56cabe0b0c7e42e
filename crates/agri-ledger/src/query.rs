//! # Query Layer
//!
//! Read-only projections composed from the registry, catalog, batch book,
//! provenance log and escrow book. Nothing here mutates; the engine runs
//! these under a read lock against the latest committed state.

use serde::{Deserialize, Serialize};

use agri_core::{BatchId, LedgerError, ProductId};

use crate::batch::{Batch, HistoryEntry};
use crate::catalog::Product;
use crate::state::LedgerState;

/// A batch with its product and the number of provenance readings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchDetail {
    pub batch: Batch,
    pub product: Product,
    pub provenance_count: usize,
}

/// What an external code resolves to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeResolution {
    pub batch_id: BatchId,
    pub batch: Batch,
    pub product: Product,
    /// Custody history, oldest first.
    pub history: Vec<HistoryEntry>,
}

/// A product and the batches cut from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDetail {
    pub product: Product,
    pub batch_ids: Vec<BatchId>,
}

impl LedgerState {
    /// Full detail of one batch. `InvalidBatch` for unknown ids.
    pub fn batch_detail(&self, batch_id: BatchId) -> Result<BatchDetail, LedgerError> {
        let batch = self.batches.get(batch_id)?;
        let product = self.products.get(batch.product_id())?;
        Ok(BatchDetail {
            batch: batch.clone(),
            product: product.clone(),
            provenance_count: self.provenance.count(batch_id),
        })
    }

    /// Custody history of one batch. `InvalidBatch` for unknown ids.
    pub fn batch_history(&self, batch_id: BatchId) -> Result<Vec<HistoryEntry>, LedgerError> {
        Ok(self.batches.get(batch_id)?.history())
    }

    /// Resolve an external code to its batch, product and history.
    ///
    /// An unmapped code is `NotFound`; use [`crate::BatchBook::id_by_code`]
    /// for the non-failing lookup.
    pub fn resolve_code(&self, code: &str) -> Result<CodeResolution, LedgerError> {
        let batch_id = self
            .batches
            .id_by_code(code)
            .ok_or_else(|| LedgerError::NotFound(format!("external code {code:?}")))?;
        let batch = self.batches.get(batch_id)?;
        let product = self.products.get(batch.product_id())?;
        Ok(CodeResolution {
            batch_id,
            batch: batch.clone(),
            product: product.clone(),
            history: batch.history(),
        })
    }

    /// A product and its batch ids in creation order.
    pub fn product_detail(&self, product_id: ProductId) -> Result<ProductDetail, LedgerError> {
        let product = self.products.get(product_id)?;
        Ok(ProductDetail {
            product: product.clone(),
            batch_ids: self.batches.of_product(product_id).map(Batch::id).collect(),
        })
    }
}
