//! # Product Catalog
//!
//! Immutable-once-created product records owned by a producer. The quality
//! grade is the only mutable field, and it changes only through the batch
//! tracker's quality-update flow.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use agri_core::{LedgerError, Principal, ProductId, QualityGrade, Timestamp};

use crate::registry::require_text;

/// Arguments of a product creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub variety: String,
    pub quantity: u64,
    /// Opaque harvest date as supplied by the producer.
    pub harvest_date: String,
    pub organic: bool,
    #[serde(default)]
    pub certifications: BTreeSet<String>,
}

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub variety: String,
    pub quantity: u64,
    pub harvest_date: String,
    /// The producer that created the product.
    pub producer: Principal,
    quality: QualityGrade,
    pub organic: bool,
    pub certifications: BTreeSet<String>,
    pub created_at: Timestamp,
}

impl Product {
    /// Current quality grade.
    pub fn quality(&self) -> QualityGrade {
        self.quality
    }
}

/// The product table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductCatalog {
    products: BTreeMap<ProductId, Product>,
    next_id: ProductId,
}

impl Default for ProductCatalog {
    fn default() -> Self {
        Self {
            products: BTreeMap::new(),
            next_id: ProductId::FIRST,
        }
    }
}

impl ProductCatalog {
    /// Look up a product.
    pub fn get(&self, id: ProductId) -> Result<&Product, LedgerError> {
        self.products
            .get(&id)
            .ok_or_else(|| LedgerError::NotFound(id.to_string()))
    }

    /// Products created by `producer`, in id order.
    pub fn by_producer<'a>(&'a self, producer: &'a Principal) -> impl Iterator<Item = &'a Product> {
        self.products.values().filter(move |p| &p.producer == producer)
    }

    /// Number of products created.
    pub fn len(&self) -> usize {
        self.products.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Store a product for an already-authorized producer.
    pub(crate) fn create(
        &mut self,
        producer: Principal,
        new: NewProduct,
        now: Timestamp,
    ) -> Result<ProductId, LedgerError> {
        require_text("product name", &new.name)?;
        if new.quantity == 0 {
            return Err(LedgerError::InvalidInput(
                "quantity must be positive".to_string(),
            ));
        }

        let id = self.next_id;
        self.products.insert(
            id,
            Product {
                id,
                name: new.name,
                variety: new.variety,
                quantity: new.quantity,
                harvest_date: new.harvest_date,
                producer,
                quality: QualityGrade::Excellent,
                organic: new.organic,
                certifications: new.certifications,
                created_at: now,
            },
        );
        self.next_id = id.next();
        Ok(id)
    }

    pub(crate) fn set_quality(
        &mut self,
        id: ProductId,
        grade: QualityGrade,
    ) -> Result<(), LedgerError> {
        let product = self
            .products
            .get_mut(&id)
            .ok_or_else(|| LedgerError::NotFound(id.to_string()))?;
        product.quality = grade;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agri_core::ErrorKind;

    fn tomatoes(quantity: u64) -> NewProduct {
        NewProduct {
            name: "Tomatoes".to_string(),
            variety: "Roma".to_string(),
            quantity,
            harvest_date: "2026-04-01".to_string(),
            organic: true,
            certifications: ["EU-ORGANIC".to_string()].into_iter().collect(),
        }
    }

    fn farm() -> Principal {
        Principal::new("farm-a").unwrap()
    }

    fn now() -> Timestamp {
        Timestamp::parse("2026-04-01T06:00:00Z").unwrap()
    }

    #[test]
    fn test_ids_start_at_one_and_increase() {
        let mut catalog = ProductCatalog::default();
        assert_eq!(catalog.create(farm(), tomatoes(1000), now()).unwrap(), ProductId(1));
        assert_eq!(catalog.create(farm(), tomatoes(5), now()).unwrap(), ProductId(2));
    }

    #[test]
    fn test_new_product_is_excellent() {
        let mut catalog = ProductCatalog::default();
        let id = catalog.create(farm(), tomatoes(1000), now()).unwrap();
        let product = catalog.get(id).unwrap();
        assert_eq!(product.quality(), QualityGrade::Excellent);
        assert_eq!(product.producer, farm());
        assert!(product.certifications.contains("EU-ORGANIC"));
    }

    #[test]
    fn test_rejects_zero_quantity_and_empty_name() {
        let mut catalog = ProductCatalog::default();
        let err = catalog.create(farm(), tomatoes(0), now()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        let mut unnamed = tomatoes(3);
        unnamed.name = String::new();
        assert_eq!(
            catalog.create(farm(), unnamed, now()).unwrap_err().kind(),
            ErrorKind::InvalidInput
        );
        assert!(catalog.is_empty());
        // A rejection does not burn an id.
        assert_eq!(catalog.create(farm(), tomatoes(1), now()).unwrap(), ProductId(1));
    }

    #[test]
    fn test_unknown_product_not_found() {
        let catalog = ProductCatalog::default();
        assert_eq!(catalog.get(ProductId(0)).unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(catalog.get(ProductId(9)).unwrap_err().kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_set_quality() {
        let mut catalog = ProductCatalog::default();
        let id = catalog.create(farm(), tomatoes(10), now()).unwrap();
        catalog.set_quality(id, QualityGrade::Fair).unwrap();
        assert_eq!(catalog.get(id).unwrap().quality(), QualityGrade::Fair);
    }
}
