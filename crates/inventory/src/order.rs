use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockroom_core::{DomainError, Entity, OrderId, ProductId, TenantId};

/// Order kind used for the two legs of an unbundle.
pub const CONVERSION_KIND: &str = "Conversion";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderDirection {
    Inbound,
    Outbound,
}

impl OrderDirection {
    /// Code segment: `PNK` (phiếu nhập kho) for inbound, `PXK` (phiếu xuất kho) for outbound.
    pub fn code_prefix(self) -> &'static str {
        match self {
            OrderDirection::Inbound => "PNK",
            OrderDirection::Outbound => "PXK",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OrderDirection::Inbound => "inbound",
            OrderDirection::Outbound => "outbound",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "inbound" => Some(OrderDirection::Inbound),
            "outbound" => Some(OrderDirection::Outbound),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    Pending,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Completed => "Completed",
            OrderStatus::Cancelled => "Cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "pending" => Some(OrderStatus::Pending),
            "completed" => Some(OrderStatus::Completed),
            "cancelled" | "canceled" => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub product_name: String,
    pub unit: String,
    pub quantity: Decimal,
    pub price: Decimal,
}

/// A stock movement order (inbound or outbound) with its lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub tenant_id: TenantId,
    pub code: String,
    pub direction: OrderDirection,
    pub kind: String,
    pub status: OrderStatus,
    pub order_type: Option<String>,
    pub warehouse: String,
    pub description: Option<String>,
    pub lines: Vec<OrderLine>,
    pub created_at: DateTime<Utc>,
}

impl Order {
    pub fn is_completed(&self) -> bool {
        self.status == OrderStatus::Completed
    }

    pub fn is_conversion(&self) -> bool {
        self.kind == CONVERSION_KIND
    }

    /// Structural checks applied before an order is persisted.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.code.trim().is_empty() {
            return Err(DomainError::validation("order code cannot be empty"));
        }
        if self.warehouse.trim().is_empty() {
            return Err(DomainError::validation("warehouse cannot be empty"));
        }
        if self.lines.is_empty() {
            return Err(DomainError::validation("order must have at least one line"));
        }
        for line in &self.lines {
            if line.unit.trim().is_empty() {
                return Err(DomainError::validation("order line unit cannot be empty"));
            }
            if line.quantity.is_sign_negative() {
                return Err(DomainError::validation("order line quantity cannot be negative"));
            }
        }
        Ok(())
    }
}

impl Entity for Order {
    type Id = OrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order() -> Order {
        Order {
            id: OrderId::new(),
            tenant_id: TenantId::new(),
            code: "KC-PNK-011024-001".to_string(),
            direction: OrderDirection::Inbound,
            kind: "Import".to_string(),
            status: OrderStatus::Completed,
            order_type: None,
            warehouse: "Kho chính".to_string(),
            description: None,
            lines: vec![OrderLine {
                product_id: ProductId::new(),
                product_name: "Bia".to_string(),
                unit: "Lon".to_string(),
                quantity: Decimal::from(10),
                price: Decimal::ZERO,
            }],
            created_at: Utc::now(),
        }
    }

    #[test]
    fn valid_order_passes() {
        assert!(order().validate().is_ok());
    }

    #[test]
    fn order_without_lines_is_rejected() {
        let mut o = order();
        o.lines.clear();
        assert!(matches!(o.validate(), Err(DomainError::Validation(_))));
    }

    #[test]
    fn negative_quantity_is_rejected() {
        let mut o = order();
        o.lines[0].quantity = Decimal::from(-1);
        assert!(o.validate().is_err());
    }

    #[test]
    fn direction_prefixes() {
        assert_eq!(OrderDirection::Inbound.code_prefix(), "PNK");
        assert_eq!(OrderDirection::Outbound.code_prefix(), "PXK");
        assert_eq!(OrderDirection::parse("OUTBOUND"), Some(OrderDirection::Outbound));
        assert_eq!(OrderStatus::parse("canceled"), Some(OrderStatus::Cancelled));
        assert_eq!(OrderStatus::parse(OrderStatus::Completed.as_str()), Some(OrderStatus::Completed));
    }
}
