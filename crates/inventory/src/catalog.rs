//! Catalog model: products, warehouses and storage locations.
//!
//! Catalog records are referenced by id from the ledger. They are plain
//! mutable records; only the ledger is append-only.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use depot_core::{DomainError, DomainResult, Entity, LocationId, ProductId, WarehouseId};

/// A stockable product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub sku: String,
    pub description: Option<String>,
    pub category: String,
    pub uom: String,
    pub barcode: Option<String>,
    pub min_stock_level: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> ProductId {
        self.id
    }
}

/// Input for creating a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub sku: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub uom: String,
    #[serde(default)]
    pub barcode: Option<String>,
    #[serde(default)]
    pub min_stock_level: Decimal,
}

impl NewProduct {
    /// Trim and validate the input, returning the normalized value.
    pub fn validated(self) -> DomainResult<Self> {
        let name = required_text("name", &self.name)?;
        let sku = required_text("sku", &self.sku)?;
        ensure_threshold(self.min_stock_level)?;
        Ok(Self {
            name,
            sku,
            description: optional_text(self.description),
            category: self.category.trim().to_string(),
            uom: self.uom.trim().to_string(),
            barcode: optional_text(self.barcode),
            min_stock_level: self.min_stock_level,
        })
    }

    pub fn into_product(self, id: ProductId, now: DateTime<Utc>) -> Product {
        Product {
            id,
            name: self.name,
            sku: self.sku,
            description: self.description,
            category: self.category,
            uom: self.uom,
            barcode: self.barcode,
            min_stock_level: self.min_stock_level,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial product update; absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub sku: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub uom: Option<String>,
    pub barcode: Option<String>,
    pub min_stock_level: Option<Decimal>,
}

impl ProductPatch {
    /// Apply the patch to `product`, validating every provided field first.
    pub fn apply(&self, product: &mut Product, now: DateTime<Utc>) -> DomainResult<()> {
        let name = self.name.as_deref().map(|v| required_text("name", v)).transpose()?;
        let sku = self.sku.as_deref().map(|v| required_text("sku", v)).transpose()?;
        if let Some(level) = self.min_stock_level {
            ensure_threshold(level)?;
        }

        if let Some(name) = name {
            product.name = name;
        }
        if let Some(sku) = sku {
            product.sku = sku;
        }
        if let Some(description) = &self.description {
            product.description = optional_text(Some(description.clone()));
        }
        if let Some(category) = &self.category {
            product.category = category.trim().to_string();
        }
        if let Some(uom) = &self.uom {
            product.uom = uom.trim().to_string();
        }
        if let Some(barcode) = &self.barcode {
            product.barcode = optional_text(Some(barcode.clone()));
        }
        if let Some(level) = self.min_stock_level {
            product.min_stock_level = level;
        }
        product.updated_at = now;
        Ok(())
    }
}

/// A physical warehouse grouping storage locations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warehouse {
    pub id: WarehouseId,
    pub name: String,
}

impl Entity for Warehouse {
    type Id = WarehouseId;

    fn id(&self) -> WarehouseId {
        self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewWarehouse {
    pub name: String,
}

impl NewWarehouse {
    pub fn validated(self) -> DomainResult<Self> {
        Ok(Self {
            name: required_text("name", &self.name)?,
        })
    }
}

/// A storage point inside a warehouse.
///
/// The ledger uses an absent location to mean "outside the company"
/// (the vendor side of a receipt, the customer side of a delivery).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub id: LocationId,
    pub warehouse_id: WarehouseId,
    pub name: String,
}

impl Entity for Location {
    type Id = LocationId;

    fn id(&self) -> LocationId {
        self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLocation {
    pub warehouse_id: WarehouseId,
    pub name: String,
}

impl NewLocation {
    pub fn validated(self) -> DomainResult<Self> {
        Ok(Self {
            warehouse_id: self.warehouse_id,
            name: required_text("name", &self.name)?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationPatch {
    pub warehouse_id: Option<WarehouseId>,
    pub name: Option<String>,
}

impl LocationPatch {
    pub fn apply(&self, location: &mut Location) -> DomainResult<()> {
        if let Some(name) = &self.name {
            location.name = required_text("name", name)?;
        }
        if let Some(warehouse_id) = self.warehouse_id {
            location.warehouse_id = warehouse_id;
        }
        Ok(())
    }
}

fn required_text(field: &str, value: &str) -> DomainResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation(format!("{field} cannot be empty")));
    }
    Ok(trimmed.to_string())
}

fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn ensure_threshold(level: Decimal) -> DomainResult<()> {
    if level < Decimal::ZERO {
        return Err(DomainError::validation("min_stock_level cannot be negative"));
    }
    Ok(())
}
