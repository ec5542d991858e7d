use std::collections::HashMap;

use stockroom_core::{ProductId, ValueObject};

use crate::product::Product;

/// Immutable product lookup, built per request or session.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProductCatalog {
    products: HashMap<ProductId, Product>,
}

impl ProductCatalog {
    pub fn from_products(products: impl IntoIterator<Item = Product>) -> Self {
        Self {
            products: products.into_iter().map(|p| (p.id_typed(), p)).collect(),
        }
    }

    pub fn get(&self, product_id: ProductId) -> Option<&Product> {
        self.products.get(&product_id)
    }

    /// Base unit label of a product, if the product is known and has one.
    pub fn base_unit(&self, product_id: ProductId) -> Option<&str> {
        self.get(product_id).and_then(Product::base_unit)
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Product> {
        self.products.values()
    }
}

impl ValueObject for ProductCatalog {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::product::NewProduct;
    use stockroom_core::TenantId;

    #[test]
    fn base_unit_lookup() {
        let id = ProductId::new();
        let catalog = ProductCatalog::from_products([Product::new(NewProduct {
            id,
            tenant_id: TenantId::new(),
            sku: "NUOC-01".to_string(),
            name: "Nuoc suoi".to_string(),
            base_unit: Some("Chai".to_string()),
        })
        .unwrap()]);

        assert_eq!(catalog.base_unit(id), Some("Chai"));
        assert_eq!(catalog.base_unit(ProductId::new()), None);
        assert_eq!(catalog.len(), 1);
    }
}
