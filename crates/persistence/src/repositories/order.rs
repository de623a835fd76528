//! Order repository for database operations.

use domain::models::{
    ListOrdersQuery, NewOrder, NewOrderItem, Order, OrderItem, OrderStatus, OrderWithItems,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::{OrderEntity, OrderItemEntity, OrderStatusDb};
use crate::metrics::QueryTimer;

/// Repository for order database operations.
#[derive(Clone)]
pub struct OrderRepository {
    pool: PgPool,
}

impl OrderRepository {
    /// Create a new repository instance.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert an order and its items in one transaction.
    pub async fn create(
        &self,
        order: &NewOrder,
        items: &[NewOrderItem],
    ) -> Result<OrderWithItems, sqlx::Error> {
        let timer = QueryTimer::new("orders", "create");
        let mut tx = self.pool.begin().await?;

        let entity = sqlx::query_as::<_, OrderEntity>(
            r#"
            INSERT INTO orders (
                organization_id, user_id, customer_name, customer_phone, customer_email,
                delivery_address, total_amount, status, notes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, 'pending', $8)
            RETURNING id, order_number, external_order_id, organization_id, user_id,
                      customer_name, customer_phone, customer_email, delivery_address,
                      total_amount, status, notes, message_id, created_at, updated_at
            "#,
        )
        .bind(order.organization_id)
        .bind(order.user_id)
        .bind(&order.customer_name)
        .bind(&order.customer_phone)
        .bind(&order.customer_email)
        .bind(&order.delivery_address)
        .bind(order.total_amount)
        .bind(&order.notes)
        .fetch_one(&mut *tx)
        .await?;

        let mut created_items = Vec::with_capacity(items.len());
        for (position, item) in items.iter().enumerate() {
            let item_entity = sqlx::query_as::<_, OrderItemEntity>(
                r#"
                INSERT INTO order_items (order_id, position, product_id, product_name, quantity, price, total)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                RETURNING id, order_id, product_id, product_name, quantity, price, total, created_at
                "#,
            )
            .bind(entity.id)
            .bind(i32::try_from(position).unwrap_or(i32::MAX))
            .bind(item.product_id)
            .bind(&item.product_name)
            .bind(item.quantity)
            .bind(item.price)
            .bind(item.total)
            .fetch_one(&mut *tx)
            .await?;
            created_items.push(item_entity.into());
        }

        tx.commit().await?;
        timer.committed();

        Ok(OrderWithItems {
            order: entity.into(),
            items: created_items,
        })
    }

    /// Find order by ID.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, sqlx::Error> {
        let entity = sqlx::query_as::<_, OrderEntity>(
            r#"
            SELECT id, order_number, external_order_id, organization_id, user_id,
                   customer_name, customer_phone, customer_email, delivery_address,
                   total_amount, status, notes, message_id, created_at, updated_at
            FROM orders
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(entity.map(Into::into))
    }

    /// Find order by the id the POS assigned to it.
    pub async fn find_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<Order>, sqlx::Error> {
        let entity = sqlx::query_as::<_, OrderEntity>(
            r#"
            SELECT id, order_number, external_order_id, organization_id, user_id,
                   customer_name, customer_phone, customer_email, delivery_address,
                   total_amount, status, notes, message_id, created_at, updated_at
            FROM orders
            WHERE external_order_id = $1
            "#,
        )
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(entity.map(Into::into))
    }

    /// List the items of an order in insertion order.
    pub async fn list_items(&self, order_id: Uuid) -> Result<Vec<OrderItem>, sqlx::Error> {
        let entities = sqlx::query_as::<_, OrderItemEntity>(
            r#"
            SELECT id, order_id, product_id, product_name, quantity, price, total, created_at
            FROM order_items
            WHERE order_id = $1
            ORDER BY position
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entities.into_iter().map(Into::into).collect())
    }

    /// List orders, newest first.
    pub async fn list(&self, query: &ListOrdersQuery) -> Result<Vec<Order>, sqlx::Error> {
        let (limit, offset) = query.limit_offset();
        let timer = QueryTimer::new("orders", "list");
        let entities = sqlx::query_as::<_, OrderEntity>(
            r#"
            SELECT id, order_number, external_order_id, organization_id, user_id,
                   customer_name, customer_phone, customer_email, delivery_address,
                   total_amount, status, notes, message_id, created_at, updated_at
            FROM orders
            WHERE ($1::uuid IS NULL OR organization_id = $1)
              AND ($2::order_status IS NULL OR status = $2)
            ORDER BY order_number DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(query.organization_id)
        .bind(query.status.map(OrderStatusDb::from))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await;
        timer.finish(&entities);

        Ok(entities?.into_iter().map(Into::into).collect())
    }

    /// Set the status of an order.
    pub async fn update_status(
        &self,
        id: Uuid,
        status: OrderStatus,
    ) -> Result<Option<Order>, sqlx::Error> {
        let entity = sqlx::query_as::<_, OrderEntity>(
            r#"
            UPDATE orders SET status = $2
            WHERE id = $1
            RETURNING id, order_number, external_order_id, organization_id, user_id,
                      customer_name, customer_phone, customer_email, delivery_address,
                      total_amount, status, notes, message_id, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(OrderStatusDb::from(status))
        .fetch_optional(&self.pool)
        .await?;

        Ok(entity.map(Into::into))
    }

    /// Record the POS order id. Fails with a unique violation when another
    /// order already carries it.
    pub async fn set_external_order_id(
        &self,
        id: Uuid,
        external_id: &str,
    ) -> Result<Option<Order>, sqlx::Error> {
        let entity = sqlx::query_as::<_, OrderEntity>(
            r#"
            UPDATE orders SET external_order_id = $2
            WHERE id = $1
            RETURNING id, order_number, external_order_id, organization_id, user_id,
                      customer_name, customer_phone, customer_email, delivery_address,
                      total_amount, status, notes, message_id, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(entity.map(Into::into))
    }

    /// Record the id of the admin notification message for an order.
    pub async fn set_message_id(
        &self,
        id: Uuid,
        message_id: i64,
    ) -> Result<Option<Order>, sqlx::Error> {
        let entity = sqlx::query_as::<_, OrderEntity>(
            r#"
            UPDATE orders SET message_id = $2
            WHERE id = $1
            RETURNING id, order_number, external_order_id, organization_id, user_id,
                      customer_name, customer_phone, customer_email, delivery_address,
                      total_amount, status, notes, message_id, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(message_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(entity.map(Into::into))
    }
}
