//! Order dispatch to the POS.
//!
//! Translates a confirmed local order into a POS order request, sends it, and
//! records the returned external id. Missing local data skips the dispatch;
//! provider and store failures are reported to the caller. Neither outcome
//! touches the order's status.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{error, info, warn};
use uuid::Uuid;

use super::pos::{PosCustomer, PosError, PosGateway, PosOrder, PosOrderItem, PosOrderRequest};
use crate::models::Order;
use crate::store::{CatalogStore, OrderStore, StoreError};

/// Why a dispatch did not reach the POS or produced no external id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    OrderNotFound,
    /// The order already carries an external id.
    AlreadyDispatched(String),
    /// Another dispatch of the same order is running.
    InFlight,
    /// The organization is missing or has no POS id.
    OrganizationNotMapped,
    NoActiveTerminalGroup,
    /// Every item lacked a product with a POS id.
    NoDispatchableItems,
    /// The POS accepted the request but returned no order id.
    MissingExternalOrderId,
}

impl SkipReason {
    /// True when the skip is caused by incomplete local catalog data.
    pub fn is_data_gap(&self) -> bool {
        matches!(
            self,
            SkipReason::OrganizationNotMapped
                | SkipReason::NoActiveTerminalGroup
                | SkipReason::NoDispatchableItems
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::OrderNotFound => "order_not_found",
            SkipReason::AlreadyDispatched(_) => "already_dispatched",
            SkipReason::InFlight => "in_flight",
            SkipReason::OrganizationNotMapped => "organization_not_mapped",
            SkipReason::NoActiveTerminalGroup => "no_active_terminal_group",
            SkipReason::NoDispatchableItems => "no_dispatchable_items",
            SkipReason::MissingExternalOrderId => "missing_external_order_id",
        }
    }
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Dispatch failure surfaced to the caller.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    Pos(#[from] PosError),

    #[error("Store error during dispatch: {0}")]
    Store(String),

    /// The POS created the order but its id could not be stored locally.
    #[error("POS order {external_id} was created but not recorded: {reason}")]
    Unrecorded { external_id: String, reason: String },
}

impl From<StoreError> for DispatchError {
    fn from(err: StoreError) -> Self {
        DispatchError::Store(err.to_string())
    }
}

/// Tri-state dispatch result.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    Dispatched(String),
    Skipped(SkipReason),
    Failed(DispatchError),
}

impl DispatchOutcome {
    pub fn external_id(&self) -> Option<&str> {
        match self {
            DispatchOutcome::Dispatched(id) => Some(id),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DispatchOutcome::Dispatched(_) => "dispatched",
            DispatchOutcome::Skipped(_) => "skipped",
            DispatchOutcome::Failed(_) => "failed",
        }
    }
}

/// Removes the order from the in-flight set when dropped.
struct InFlightGuard<'a> {
    in_flight: &'a Mutex<HashSet<Uuid>>,
    order_id: Uuid,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.order_id);
    }
}

/// Sends confirmed orders to the POS, at most one dispatch per order at a time.
pub struct OrderDispatcher {
    catalog: Arc<dyn CatalogStore>,
    orders: Arc<dyn OrderStore>,
    gateway: Arc<dyn PosGateway>,
    order_type_id: Option<String>,
    in_flight: Mutex<HashSet<Uuid>>,
}

impl OrderDispatcher {
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        orders: Arc<dyn OrderStore>,
        gateway: Arc<dyn PosGateway>,
    ) -> Self {
        Self {
            catalog,
            orders,
            gateway,
            order_type_id: None,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Send this POS order type with every dispatched order.
    pub fn with_order_type_id(mut self, order_type_id: Option<String>) -> Self {
        self.order_type_id = order_type_id.filter(|id| !id.trim().is_empty());
        self
    }

    /// Dispatch one order. Never changes the order's status.
    pub async fn dispatch(&self, order_id: Uuid) -> DispatchOutcome {
        let _guard = {
            let mut set = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
            if !set.insert(order_id) {
                info!(order_id = %order_id, "Dispatch already in flight, skipping");
                return DispatchOutcome::Skipped(SkipReason::InFlight);
            }
            InFlightGuard {
                in_flight: &self.in_flight,
                order_id,
            }
        };

        match self.dispatch_inner(order_id).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(order_id = %order_id, error = %e, "Order dispatch failed");
                DispatchOutcome::Failed(e)
            }
        }
    }

    async fn dispatch_inner(&self, order_id: Uuid) -> Result<DispatchOutcome, DispatchError> {
        let Some(order) = self.orders.find_order(order_id).await? else {
            warn!(order_id = %order_id, "Order not found for dispatch");
            return Ok(DispatchOutcome::Skipped(SkipReason::OrderNotFound));
        };

        if let Some(existing) = order.external_order_id.clone() {
            info!(order_id = %order_id, external_id = %existing, "Order already dispatched");
            return Ok(DispatchOutcome::Skipped(SkipReason::AlreadyDispatched(existing)));
        }

        let request = match self.build_request(&order).await? {
            Ok(request) => request,
            Err(reason) => {
                warn!(order_id = %order_id, reason = %reason, "Order not dispatchable");
                return Ok(DispatchOutcome::Skipped(reason));
            }
        };

        let Some(external_id) = self.gateway.create_order(&request).await? else {
            warn!(
                order_id = %order_id,
                "POS accepted order but returned no id; order stays undispatched"
            );
            return Ok(DispatchOutcome::Skipped(SkipReason::MissingExternalOrderId));
        };

        if let Err(e) = self.orders.set_external_order_id(order.id, &external_id).await {
            error!(
                order_id = %order_id,
                order_number = order.order_number,
                external_id = %external_id,
                error = %e,
                "POS created the order but its id was not recorded"
            );
            return Err(DispatchError::Unrecorded {
                external_id,
                reason: e.to_string(),
            });
        }

        info!(
            order_id = %order_id,
            order_number = order.order_number,
            external_id = %external_id,
            items = request.order.items.len(),
            "Order dispatched to POS"
        );
        Ok(DispatchOutcome::Dispatched(external_id))
    }

    /// Resolve POS identifiers for the order. The inner `Err` is a skip.
    pub async fn build_request(
        &self,
        order: &Order,
    ) -> Result<Result<PosOrderRequest, SkipReason>, StoreError> {
        let organization = self.catalog.find_organization(order.organization_id).await?;
        let Some(org_pos_id) = organization
            .as_ref()
            .and_then(|o| o.pos_id())
            .map(str::to_string)
        else {
            return Ok(Err(SkipReason::OrganizationNotMapped));
        };

        let terminal = self
            .catalog
            .first_active_terminal_group(order.organization_id)
            .await?;
        let Some(terminal_pos_id) = terminal
            .as_ref()
            .and_then(|t| t.pos_id())
            .map(str::to_string)
        else {
            return Ok(Err(SkipReason::NoActiveTerminalGroup));
        };

        let items = self.orders.list_order_items(order.id).await?;
        let product_ids: Vec<Uuid> = items.iter().filter_map(|i| i.product_id).collect();
        let products = self.catalog.find_products(&product_ids).await?;

        let mut pos_items = Vec::with_capacity(items.len());
        for item in &items {
            let pos_id = item
                .product_id
                .and_then(|pid| products.iter().find(|p| p.id == pid))
                .and_then(|p| p.pos_id());
            match pos_id {
                Some(pos_id) => pos_items.push(PosOrderItem::product(pos_id, item.quantity)),
                None => warn!(
                    order_id = %order.id,
                    item_id = %item.id,
                    product_name = %item.product_name,
                    "Skipping order item without a POS product"
                ),
            }
        }

        if pos_items.is_empty() {
            return Ok(Err(SkipReason::NoDispatchableItems));
        }

        Ok(Ok(PosOrderRequest {
            organization_id: org_pos_id,
            terminal_group_id: terminal_pos_id,
            order: PosOrder {
                order_type_id: self.order_type_id.clone(),
                items: pos_items,
                customer: PosCustomer::regular(order.customer_name.clone()),
                phone: order.customer_phone.clone(),
                comment: order.notes.clone(),
            },
        }))
    }
}
