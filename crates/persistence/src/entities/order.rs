//! Order entities (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::{Order, OrderItem, OrderStatus};
use rust_decimal::Decimal;
use sqlx::FromRow;
use uuid::Uuid;

/// Database enum for order status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "order_status", rename_all = "snake_case")]
pub enum OrderStatusDb {
    Pending,
    SentToIiko,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
    Failed,
    Declined,
}

impl From<OrderStatusDb> for OrderStatus {
    fn from(db: OrderStatusDb) -> Self {
        match db {
            OrderStatusDb::Pending => OrderStatus::Pending,
            OrderStatusDb::SentToIiko => OrderStatus::SentToIiko,
            OrderStatusDb::Confirmed => OrderStatus::Confirmed,
            OrderStatusDb::InProgress => OrderStatus::InProgress,
            OrderStatusDb::Completed => OrderStatus::Completed,
            OrderStatusDb::Cancelled => OrderStatus::Cancelled,
            OrderStatusDb::Failed => OrderStatus::Failed,
            OrderStatusDb::Declined => OrderStatus::Declined,
        }
    }
}

impl From<OrderStatus> for OrderStatusDb {
    fn from(status: OrderStatus) -> Self {
        match status {
            OrderStatus::Pending => OrderStatusDb::Pending,
            OrderStatus::SentToIiko => OrderStatusDb::SentToIiko,
            OrderStatus::Confirmed => OrderStatusDb::Confirmed,
            OrderStatus::InProgress => OrderStatusDb::InProgress,
            OrderStatus::Completed => OrderStatusDb::Completed,
            OrderStatus::Cancelled => OrderStatusDb::Cancelled,
            OrderStatus::Failed => OrderStatusDb::Failed,
            OrderStatus::Declined => OrderStatusDb::Declined,
        }
    }
}

/// Database row mapping for the orders table.
#[derive(Debug, Clone, FromRow)]
pub struct OrderEntity {
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
    pub status: OrderStatusDb,
    pub notes: Option<String>,
    pub message_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<OrderEntity> for Order {
    fn from(entity: OrderEntity) -> Self {
        Self {
            id: entity.id,
            order_number: entity.order_number,
            external_order_id: entity.external_order_id,
            organization_id: entity.organization_id,
            user_id: entity.user_id,
            customer_name: entity.customer_name,
            customer_phone: entity.customer_phone,
            customer_email: entity.customer_email,
            delivery_address: entity.delivery_address,
            total_amount: entity.total_amount,
            status: entity.status.into(),
            notes: entity.notes,
            message_id: entity.message_id,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}

/// Database row mapping for the order_items table.
#[derive(Debug, Clone, FromRow)]
pub struct OrderItemEntity {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Option<Uuid>,
    pub product_name: String,
    pub quantity: i32,
    pub price: Decimal,
    pub total: Decimal,
    pub created_at: DateTime<Utc>,
}

impl From<OrderItemEntity> for OrderItem {
    fn from(entity: OrderItemEntity) -> Self {
        Self {
            id: entity.id,
            order_id: entity.order_id,
            product_id: entity.product_id,
            product_name: entity.product_name,
            quantity: entity.quantity,
            price: entity.price,
            total: entity.total,
            created_at: entity.created_at,
        }
    }
}
