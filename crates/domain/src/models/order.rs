//! Order domain models and the order status state machine.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

/// Lifecycle status of a local order.
///
/// ```text
/// pending -> sent_to_iiko -> confirmed -> in_progress -> completed
/// pending -> confirmed -> completed
/// any non-terminal -> failed | cancelled | declined
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    SentToIiko,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
    Failed,
    Declined,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 8] = [
        OrderStatus::Pending,
        OrderStatus::SentToIiko,
        OrderStatus::Confirmed,
        OrderStatus::InProgress,
        OrderStatus::Completed,
        OrderStatus::Cancelled,
        OrderStatus::Failed,
        OrderStatus::Declined,
    ];

    /// No transition leaves a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Completed
                | OrderStatus::Cancelled
                | OrderStatus::Failed
                | OrderStatus::Declined
        )
    }

    /// Whether moving from `self` to `next` is allowed.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;

        if self.is_terminal() || *self == next {
            return false;
        }

        match (self, next) {
            (_, Failed | Cancelled | Declined) => true,
            (Pending, SentToIiko | Confirmed) => true,
            (SentToIiko, Confirmed) => true,
            (Confirmed, InProgress | Completed) => true,
            (InProgress, Completed) => true,
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::SentToIiko => "sent_to_iiko",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::InProgress => "in_progress",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Failed => "failed",
            OrderStatus::Declined => "declined",
        }
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s.to_lowercase())
            .ok_or_else(|| format!("Unknown order status: {}", s))
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order domain model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Order {
    pub id: Uuid,
    pub order_number: i64,
    pub external_order_id: Option<String>,
    pub organization_id: Uuid,
    pub user_id: Option<Uuid>,
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_email: Option<String>,
    pub delivery_address: Option<String>,
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub notes: Option<String>,
    pub message_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Order line with name and price captured when the order was placed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    /// Cleared when the product is deleted.
    pub product_id: Option<Uuid>,
    pub product_name: String,
    pub quantity: i32,
    pub price: Decimal,
    pub total: Decimal,
    pub created_at: DateTime<Utc>,
}

/// An order together with its lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderWithItems {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// Request to place a new order.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct CreateOrderRequest {
    pub organization_id: Uuid,
    pub user_id: Option<Uuid>,
    #[validate(length(min = 1, max = 255, message = "Customer name must be 1-255 characters"))]
    pub customer_name: String,
    #[validate(length(min = 9, max = 20, message = "Customer phone must be 9-20 characters"))]
    pub customer_phone: String,
    #[validate(email(message = "Invalid email format"))]
    pub customer_email: Option<String>,
    #[validate(length(max = 1000))]
    pub delivery_address: Option<String>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
    #[validate(length(min = 1, message = "At least one item is required"))]
    #[validate(nested)]
    pub items: Vec<CreateOrderItemRequest>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct CreateOrderItemRequest {
    pub product_id: Uuid,
    #[validate(range(min = 1, max = 1000, message = "Quantity must be between 1 and 1000"))]
    pub quantity: i32,
}

/// Order header ready to be persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    pub organization_id: Uuid,
    pub user_id: Option<Uuid>,
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_email: Option<String>,
    pub delivery_address: Option<String>,
    pub notes: Option<String>,
    pub total_amount: Decimal,
}

/// Order line ready to be persisted, with its snapshot values.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrderItem {
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub price: Decimal,
    pub total: Decimal,
}

impl NewOrderItem {
    pub fn new(product_id: Uuid, product_name: String, quantity: i32, price: Decimal) -> Self {
        Self {
            product_id,
            product_name,
            quantity,
            price,
            total: price * Decimal::from(quantity),
        }
    }
}

/// Sum of line totals.
pub fn order_total(items: &[NewOrderItem]) -> Decimal {
    items.iter().map(|item| item.total).sum()
}

/// Request to move an order to another status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
}

/// Filters for listing orders.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListOrdersQuery {
    pub organization_id: Option<Uuid>,
    pub status: Option<OrderStatus>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl ListOrdersQuery {
    /// (limit, offset) after clamping page parameters.
    pub fn limit_offset(&self) -> (i64, i64) {
        let page = self.page.unwrap_or(1).max(1);
        let per_page = self.per_page.unwrap_or(50).clamp(1, 100);
        (per_page, (page - 1).saturating_mul(per_page))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_statuses() {
        assert!(OrderStatus::Completed.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(OrderStatus::Failed.is_terminal());
        assert!(OrderStatus::Declined.is_terminal());
        assert!(!OrderStatus::Pending.is_terminal());
        assert!(!OrderStatus::SentToIiko.is_terminal());
        assert!(!OrderStatus::Confirmed.is_terminal());
        assert!(!OrderStatus::InProgress.is_terminal());
    }

    #[test]
    fn test_happy_path_transitions() {
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Confirmed));
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::SentToIiko));
        assert!(OrderStatus::SentToIiko.can_transition_to(OrderStatus::Confirmed));
        assert!(OrderStatus::Confirmed.can_transition_to(OrderStatus::InProgress));
        assert!(OrderStatus::Confirmed.can_transition_to(OrderStatus::Completed));
        assert!(OrderStatus::InProgress.can_transition_to(OrderStatus::Completed));
    }

    #[test]
    fn test_any_non_terminal_can_fail_or_cancel() {
        for status in OrderStatus::ALL.iter().filter(|s| !s.is_terminal()) {
            assert!(status.can_transition_to(OrderStatus::Failed));
            assert!(status.can_transition_to(OrderStatus::Cancelled));
            assert!(status.can_transition_to(OrderStatus::Declined));
        }
    }

    #[test]
    fn test_terminal_statuses_are_final() {
        for from in OrderStatus::ALL.iter().filter(|s| s.is_terminal()) {
            for to in OrderStatus::ALL {
                assert!(!from.can_transition_to(to), "{} -> {}", from, to);
            }
        }
    }

    #[test]
    fn test_rejected_transitions() {
        assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::Pending));
        assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::Completed));
        assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::InProgress));
        assert!(!OrderStatus::Confirmed.can_transition_to(OrderStatus::Pending));
        assert!(!OrderStatus::Confirmed.can_transition_to(OrderStatus::SentToIiko));
        assert!(!OrderStatus::InProgress.can_transition_to(OrderStatus::Confirmed));
    }

    #[test]
    fn test_status_round_trip_strings() {
        for status in OrderStatus::ALL {
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
        }
        assert!("shipped".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_status_serde_snake_case() {
        let json = serde_json::to_string(&OrderStatus::SentToIiko).unwrap();
        assert_eq!(json, "\"sent_to_iiko\"");
        let parsed: OrderStatus = serde_json::from_str("\"in_progress\"").unwrap();
        assert_eq!(parsed, OrderStatus::InProgress);
    }

    #[test]
    fn test_new_order_item_total() {
        let item = NewOrderItem::new(Uuid::new_v4(), "Tea".to_string(), 3, Decimal::new(1250, 2));
        assert_eq!(item.total, Decimal::new(3750, 2));
    }

    #[test]
    fn test_order_total_sums_lines() {
        let items = vec![
            NewOrderItem::new(Uuid::new_v4(), "Tea".to_string(), 2, Decimal::new(500, 2)),
            NewOrderItem::new(Uuid::new_v4(), "Cake".to_string(), 1, Decimal::new(1999, 2)),
        ];
        assert_eq!(order_total(&items), Decimal::new(2999, 2));
    }

    #[test]
    fn test_create_order_request_validation() {
        let request = CreateOrderRequest {
            organization_id: Uuid::new_v4(),
            user_id: None,
            customer_name: "Aziz".to_string(),
            customer_phone: "+998901234567".to_string(),
            customer_email: None,
            delivery_address: None,
            notes: None,
            items: vec![CreateOrderItemRequest {
                product_id: Uuid::new_v4(),
                quantity: 2,
            }],
        };
        assert!(request.validate().is_ok());

        let mut empty = request.clone();
        empty.items.clear();
        assert!(empty.validate().is_err());

        let mut bad_quantity = request;
        bad_quantity.items[0].quantity = 0;
        assert!(bad_quantity.validate().is_err());
    }

    #[test]
    fn test_list_orders_limit_offset() {
        let query = ListOrdersQuery {
            page: Some(3),
            per_page: Some(500),
            ..Default::default()
        };
        assert_eq!(query.limit_offset(), (100, 200));
        assert_eq!(ListOrdersQuery::default().limit_offset(), (50, 0));
    }

    #[test]
    fn test_huge_page_saturates_offset() {
        let query = ListOrdersQuery {
            page: Some(i64::MAX),
            per_page: Some(100),
            ..Default::default()
        };
        assert_eq!(query.limit_offset(), (100, i64::MAX));

        let negative = ListOrdersQuery {
            page: Some(i64::MIN),
            ..Default::default()
        };
        assert_eq!(negative.limit_offset(), (50, 0));
    }
}
