//! Order creation and lifecycle.

use std::collections::HashMap;
use std::sync::Arc;

use domain::models::{
    order_total, CreateOrderRequest, ListOrdersQuery, NewOrder, NewOrderItem, Order, OrderStatus,
    OrderWithItems, Product,
};
use domain::services::{DispatchError, DispatchOutcome, OrderDispatcher};
use domain::store::{CatalogStore, OrderStore, StoreError};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, warn, Instrument};
use uuid::Uuid;
use validator::Validate;

use crate::middleware::metrics::record_order_dispatch;

/// Locale used for the product name snapshot on order lines.
const SNAPSHOT_LANGUAGE: &str = "ru";

#[derive(Debug, Error)]
pub enum OrderServiceError {
    #[error("Organization {0} not found")]
    OrganizationNotFound(Uuid),

    #[error("Order {0} not found")]
    OrderNotFound(Uuid),

    #[error("Product {0} not found")]
    ProductNotFound(Uuid),

    #[error("Product {0} is not available")]
    ProductUnavailable(Uuid),

    #[error("Cannot move order from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error(transparent)]
    Validation(#[from] validator::ValidationErrors),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Serializable view of a dispatch attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispatchSummary {
    pub outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_order_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl From<&DispatchOutcome> for DispatchSummary {
    fn from(outcome: &DispatchOutcome) -> Self {
        let (external_order_id, reason) = match outcome {
            DispatchOutcome::Dispatched(id) => (Some(id.clone()), None),
            DispatchOutcome::Skipped(reason) => (None, Some(reason.to_string())),
            DispatchOutcome::Failed(DispatchError::Unrecorded {
                external_id,
                reason,
            }) => (Some(external_id.clone()), Some(reason.clone())),
            DispatchOutcome::Failed(error) => (None, Some(error.to_string())),
        };
        Self {
            outcome: outcome.label(),
            external_order_id,
            reason,
        }
    }
}

/// Result of a status transition.
#[derive(Debug, Clone, Serialize)]
pub struct StatusChange {
    pub order: Order,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dispatch: Option<DispatchSummary>,
}

pub struct OrderService {
    catalog: Arc<dyn CatalogStore>,
    orders: Arc<dyn OrderStore>,
    dispatcher: Arc<OrderDispatcher>,
}

impl OrderService {
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        orders: Arc<dyn OrderStore>,
        dispatcher: Arc<OrderDispatcher>,
    ) -> Self {
        Self {
            catalog,
            orders,
            dispatcher,
        }
    }

    /// Place a new `pending` order with name and price snapshots of each
    /// product.
    pub async fn create_order(
        &self,
        request: CreateOrderRequest,
    ) -> Result<OrderWithItems, OrderServiceError> {
        request.validate()?;

        self.catalog
            .find_organization(request.organization_id)
            .await?
            .ok_or(OrderServiceError::OrganizationNotFound(request.organization_id))?;

        let ids: Vec<Uuid> = request.items.iter().map(|i| i.product_id).collect();
        let products: HashMap<Uuid, Product> = self
            .catalog
            .find_products(&ids)
            .await?
            .into_iter()
            .filter(|p| p.organization_id == request.organization_id)
            .map(|p| (p.id, p))
            .collect();

        let mut items = Vec::with_capacity(request.items.len());
        for line in &request.items {
            let product = products
                .get(&line.product_id)
                .ok_or(OrderServiceError::ProductNotFound(line.product_id))?;
            if !product.is_active {
                return Err(OrderServiceError::ProductUnavailable(product.id));
            }
            items.push(NewOrderItem::new(
                product.id,
                product.name.get(SNAPSHOT_LANGUAGE).to_string(),
                line.quantity,
                product.price,
            ));
        }

        let order = NewOrder {
            organization_id: request.organization_id,
            user_id: request.user_id,
            customer_name: request.customer_name,
            customer_phone: request.customer_phone,
            customer_email: request.customer_email,
            delivery_address: request.delivery_address,
            notes: request.notes,
            total_amount: order_total(&items),
        };

        let created = self.orders.create_order(order, items).await?;
        info!(
            order_id = %created.order.id,
            order_number = created.order.order_number,
            organization_id = %created.order.organization_id,
            items = created.items.len(),
            total = %created.order.total_amount,
            "Order created"
        );
        Ok(created)
    }

    /// Move an order to `next`. Entering `confirmed` without an external id
    /// dispatches the order to the POS; the new status is kept whatever the
    /// dispatch outcome.
    pub async fn transition(
        &self,
        order_id: Uuid,
        next: OrderStatus,
    ) -> Result<StatusChange, OrderServiceError> {
        let current = self
            .orders
            .find_order(order_id)
            .await?
            .ok_or(OrderServiceError::OrderNotFound(order_id))?;

        if !current.status.can_transition_to(next) {
            return Err(OrderServiceError::InvalidTransition {
                from: current.status,
                to: next,
            });
        }

        let updated = self.orders.update_order_status(order_id, next).await?;
        info!(
            order_id = %order_id,
            from = %current.status,
            to = %next,
            "Order status changed"
        );

        if next != OrderStatus::Confirmed || updated.external_order_id.is_some() {
            return Ok(StatusChange {
                order: updated,
                dispatch: None,
            });
        }

        // The dispatch runs in its own task so a dropped request cannot cut
        // it off between the POS call and recording the external id.
        let dispatcher = self.dispatcher.clone();
        let task = tokio::spawn(
            async move {
                let outcome = dispatcher.dispatch(order_id).await;
                record_order_dispatch(outcome.label());
                if !matches!(outcome, DispatchOutcome::Dispatched(_)) {
                    warn!(order_id = %order_id, outcome = outcome.label(), "Confirmed order was not dispatched");
                }
                outcome
            }
            .in_current_span(),
        );
        let outcome = match task.await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(order_id = %order_id, error = %e, "Dispatch task did not complete");
                DispatchOutcome::Failed(DispatchError::Store(format!("dispatch task failed: {}", e)))
            }
        };

        let order = match self.orders.find_order(order_id).await? {
            Some(order) => order,
            None => updated,
        };
        Ok(StatusChange {
            order,
            dispatch: Some(DispatchSummary::from(&outcome)),
        })
    }

    pub async fn get(&self, order_id: Uuid) -> Result<OrderWithItems, OrderServiceError> {
        let order = self
            .orders
            .find_order(order_id)
            .await?
            .ok_or(OrderServiceError::OrderNotFound(order_id))?;
        let items = self.orders.list_order_items(order_id).await?;
        Ok(OrderWithItems { order, items })
    }

    pub async fn list(&self, query: &ListOrdersQuery) -> Result<Vec<Order>, OrderServiceError> {
        Ok(self.orders.list_orders(query).await?)
    }

    /// Remember the admin-channel message that announced this order.
    pub async fn set_message_reference(
        &self,
        order_id: Uuid,
        message_id: i64,
    ) -> Result<Order, OrderServiceError> {
        match self.orders.set_message_id(order_id, message_id).await {
            Ok(order) => Ok(order),
            Err(StoreError::NotFound(_)) => Err(OrderServiceError::OrderNotFound(order_id)),
            Err(e) => Err(e.into()),
        }
    }
}
