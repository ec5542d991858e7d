use serde::{Deserialize, Serialize};

use stockroom_core::{Entity, LotId, ProductId, TenantId};

/// Lot lifecycle. Only `Active` lots hold physical stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LotStatus {
    Active,
    Exported,
    Closed,
}

impl LotStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            LotStatus::Active => "active",
            LotStatus::Exported => "exported",
            LotStatus::Closed => "closed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "active" => Some(LotStatus::Active),
            "exported" => Some(LotStatus::Exported),
            "closed" => Some(LotStatus::Closed),
            _ => None,
        }
    }
}

/// One product/quantity/unit line of a lot.
///
/// `product_unit` is the product's own unit label, joined in by the store so
/// lines without an explicit unit can still be keyed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LotLine {
    pub product_id: Option<ProductId>,
    pub quantity: f64,
    pub unit: Option<String>,
    pub product_unit: Option<String>,
}

/// What a lot physically holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", content = "lines", rename_all = "snake_case")]
pub enum LotContents {
    /// The lot itself carries one product/quantity.
    SingleItem(LotLine),
    /// The lot fans out into item lines; the parent's own fields are ignored.
    MultiItem(Vec<LotLine>),
}

impl LotContents {
    /// Pick the shape from a stored parent row and its item rows.
    pub fn resolve(parent: LotLine, items: Vec<LotLine>) -> Self {
        if items.is_empty() {
            LotContents::SingleItem(parent)
        } else {
            LotContents::MultiItem(items)
        }
    }
}

/// A physical stock batch in one warehouse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lot {
    pub id: LotId,
    pub tenant_id: TenantId,
    pub warehouse: String,
    pub status: LotStatus,
    pub contents: LotContents,
}

impl Lot {
    pub fn is_active(&self) -> bool {
        self.status == LotStatus::Active
    }
}

impl Entity for Lot {
    type Id = LotId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(qty: f64) -> LotLine {
        LotLine {
            product_id: Some(ProductId::new()),
            quantity: qty,
            unit: None,
            product_unit: Some("Lon".to_string()),
        }
    }

    #[test]
    fn items_take_precedence_over_parent() {
        let contents = LotContents::resolve(line(5.0), vec![line(1.0), line(2.0)]);
        match contents {
            LotContents::MultiItem(items) => assert_eq!(items.len(), 2),
            other => panic!("expected MultiItem, got {other:?}"),
        }
    }

    #[test]
    fn empty_items_fall_back_to_parent() {
        let parent = line(5.0);
        assert_eq!(LotContents::resolve(parent.clone(), vec![]), LotContents::SingleItem(parent));
    }

    #[test]
    fn status_parse_round_trips() {
        for status in [LotStatus::Active, LotStatus::Exported, LotStatus::Closed] {
            assert_eq!(LotStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(LotStatus::parse(" Active "), Some(LotStatus::Active));
        assert_eq!(LotStatus::parse("archived"), None);
    }
}
