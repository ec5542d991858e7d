use serde::{Deserialize, Serialize};

use stockroom_core::{DomainError, Entity, ProductId, TenantId};
use stockroom_units::same_unit;

/// A product as stored in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    id: ProductId,
    tenant_id: TenantId,
    sku: String,
    name: String,
    /// Display label of the base unit (e.g. "Lon"). Legacy rows may lack one.
    base_unit: Option<String>,
}

/// Input for [`Product::new`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub id: ProductId,
    pub tenant_id: TenantId,
    pub sku: String,
    pub name: String,
    pub base_unit: Option<String>,
}

impl Product {
    pub fn new(input: NewProduct) -> Result<Self, DomainError> {
        if input.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }

        if input.sku.trim().is_empty() {
            return Err(DomainError::validation("SKU cannot be empty"));
        }

        // A blank label is treated the same as a missing one.
        let base_unit = input
            .base_unit
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty());

        Ok(Self {
            id: input.id,
            tenant_id: input.tenant_id,
            sku: input.sku.trim().to_string(),
            name: input.name.trim().to_string(),
            base_unit,
        })
    }

    pub fn id_typed(&self) -> ProductId {
        self.id
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    pub fn sku(&self) -> &str {
        &self.sku
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base_unit(&self) -> Option<&str> {
        self.base_unit.as_deref()
    }

    /// True when `unit` names this product's base unit, compared like any other unit label.
    pub fn is_base_unit(&self, unit: &str) -> bool {
        self.base_unit.as_deref().is_some_and(|base| same_unit(base, unit))
    }
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
