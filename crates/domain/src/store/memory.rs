//! In-memory store used by tests and local runs without a database.

use std::collections::HashSet;

use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{CatalogEntity, CatalogStore, OrderStore, StoreError, StoreResult, Upserted};
use crate::models::{
    merge_images, Group, GroupRecord, ListOrdersQuery, NewOrder, NewOrderItem, Order, OrderItem,
    OrderStatus, OrderWithItems, Organization, OrganizationRecord, Product, ProductRecord,
    Section, SectionRecord, TerminalGroup, TerminalGroupRecord,
};

const FIRST_ORDER_NUMBER: i64 = 10000;

#[derive(Default)]
struct State {
    organizations: Vec<Organization>,
    groups: Vec<Group>,
    products: Vec<Product>,
    terminal_groups: Vec<TerminalGroup>,
    sections: Vec<Section>,
    orders: Vec<Order>,
    items: Vec<OrderItem>,
    next_order_number: i64,
    failing_external_ids: HashSet<String>,
}

impl State {
    fn check_failure(&self, external_id: &str) -> StoreResult<()> {
        if self.failing_external_ids.contains(external_id) {
            return Err(StoreError::Backend(format!(
                "Simulated failure for {}",
                external_id
            )));
        }
        Ok(())
    }
}

/// Store backed by vectors behind a single async mutex.
///
/// The mutex serializes all writes, so upserts for one external id never race.
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every upsert of `external_id` fail with a backend error.
    pub async fn fail_on_external_id(&self, external_id: impl Into<String>) {
        self.state
            .lock()
            .await
            .failing_external_ids
            .insert(external_id.into());
    }

    /// Delete a product, clearing references from order items.
    pub async fn remove_product(&self, id: Uuid) {
        let mut state = self.state.lock().await;
        state.products.retain(|p| p.id != id);
        for item in state.items.iter_mut().filter(|i| i.product_id == Some(id)) {
            item.product_id = None;
        }
    }

    /// Overwrite the active flag of a terminal group.
    pub async fn set_terminal_group_active(&self, id: Uuid, active: bool) {
        let mut state = self.state.lock().await;
        if let Some(tg) = state.terminal_groups.iter_mut().find(|t| t.id == id) {
            tg.is_active = active;
        }
    }

    pub async fn group_count(&self) -> usize {
        self.state.lock().await.groups.len()
    }

    pub async fn product_count(&self) -> usize {
        self.state.lock().await.products.len()
    }

    pub async fn find_group_by_external_id(&self, external_id: &str) -> Option<Group> {
        self.state
            .lock()
            .await
            .groups
            .iter()
            .find(|g| g.external_id == external_id)
            .cloned()
    }

    pub async fn find_product_by_external_id(&self, external_id: &str) -> Option<Product> {
        self.state
            .lock()
            .await
            .products
            .iter()
            .find(|p| p.external_id == external_id)
            .cloned()
    }

    pub async fn list_sections(&self, organization_id: Uuid) -> Vec<Section> {
        self.state
            .lock()
            .await
            .sections
            .iter()
            .filter(|s| s.organization_id == organization_id)
            .cloned()
            .collect()
    }
}

#[async_trait::async_trait]
impl CatalogStore for InMemoryStore {
    async fn upsert_organization(
        &self,
        record: OrganizationRecord,
    ) -> StoreResult<Upserted<Organization>> {
        let mut state = self.state.lock().await;
        state.check_failure(&record.external_id)?;
        let now = Utc::now();

        if let Some(org) = state
            .organizations
            .iter_mut()
            .find(|o| o.external_id == record.external_id)
        {
            org.name = record.name;
            org.country = record.country;
            org.restaurant_address = record.restaurant_address;
            org.use_uae_addressing = record.use_uae_addressing;
            org.timezone = record.timezone;
            org.is_active = true;
            org.updated_at = now;
            return Ok(Upserted::updated(org.clone()));
        }

        let org = Organization {
            id: Uuid::new_v4(),
            external_id: record.external_id,
            name: record.name,
            country: record.country,
            restaurant_address: record.restaurant_address,
            use_uae_addressing: record.use_uae_addressing,
            timezone: record.timezone,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        state.organizations.push(org.clone());
        Ok(Upserted::created(org))
    }

    async fn find_organization(&self, id: Uuid) -> StoreResult<Option<Organization>> {
        let state = self.state.lock().await;
        Ok(state.organizations.iter().find(|o| o.id == id).cloned())
    }

    async fn find_organization_by_external_id(
        &self,
        external_id: &str,
    ) -> StoreResult<Option<Organization>> {
        let state = self.state.lock().await;
        Ok(state
            .organizations
            .iter()
            .find(|o| o.external_id == external_id)
            .cloned())
    }

    async fn list_organizations(&self, active_only: bool) -> StoreResult<Vec<Organization>> {
        let state = self.state.lock().await;
        Ok(state
            .organizations
            .iter()
            .filter(|o| !active_only || o.is_active)
            .cloned()
            .collect())
    }

    async fn upsert_group(&self, record: GroupRecord) -> StoreResult<Upserted<Group>> {
        let mut state = self.state.lock().await;
        state.check_failure(&record.external_id)?;
        let now = Utc::now();

        if let Some(group) = state
            .groups
            .iter_mut()
            .find(|g| g.external_id == record.external_id)
        {
            group.organization_id = record.organization_id;
            group.parent_group_id = record.parent_group_id;
            group.name = record.name;
            group.description = record.description;
            group.display_order = record.display_order;
            group.is_included_in_menu = record.is_included_in_menu;
            group.is_active = true;
            group.updated_at = now;
            return Ok(Upserted::updated(group.clone()));
        }

        let group = Group {
            id: Uuid::new_v4(),
            external_id: record.external_id,
            organization_id: record.organization_id,
            parent_group_id: record.parent_group_id,
            name: record.name,
            description: record.description,
            display_order: record.display_order,
            is_included_in_menu: record.is_included_in_menu,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        state.groups.push(group.clone());
        Ok(Upserted::created(group))
    }

    async fn list_groups(&self, organization_id: Uuid) -> StoreResult<Vec<Group>> {
        let state = self.state.lock().await;
        Ok(state
            .groups
            .iter()
            .filter(|g| g.organization_id == organization_id)
            .cloned()
            .collect())
    }

    async fn upsert_product(&self, record: ProductRecord) -> StoreResult<Upserted<Product>> {
        let mut state = self.state.lock().await;
        state.check_failure(&record.external_id)?;
        let now = Utc::now();

        if let Some(product) = state
            .products
            .iter_mut()
            .find(|p| p.external_id == record.external_id)
        {
            product.organization_id = record.organization_id;
            product.group_id = record.group_id;
            product.name = record.name;
            product.description = record.description;
            product.price = record.price;
            product.images = merge_images(&product.images, record.images);
            product.is_active = true;
            product.updated_at = now;
            return Ok(Upserted::updated(product.clone()));
        }

        let product = Product {
            id: Uuid::new_v4(),
            external_id: record.external_id,
            organization_id: record.organization_id,
            group_id: record.group_id,
            name: record.name,
            description: record.description,
            price: record.price,
            images: record.images,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        state.products.push(product.clone());
        Ok(Upserted::created(product))
    }

    async fn find_product(&self, id: Uuid) -> StoreResult<Option<Product>> {
        let state = self.state.lock().await;
        Ok(state.products.iter().find(|p| p.id == id).cloned())
    }

    async fn find_products(&self, ids: &[Uuid]) -> StoreResult<Vec<Product>> {
        let state = self.state.lock().await;
        Ok(state
            .products
            .iter()
            .filter(|p| ids.contains(&p.id))
            .cloned()
            .collect())
    }

    async fn upsert_terminal_group(
        &self,
        record: TerminalGroupRecord,
    ) -> StoreResult<Upserted<TerminalGroup>> {
        let mut state = self.state.lock().await;
        state.check_failure(&record.external_id)?;
        let now = Utc::now();

        if let Some(tg) = state
            .terminal_groups
            .iter_mut()
            .find(|t| t.external_id == record.external_id)
        {
            tg.organization_id = record.organization_id;
            tg.name = record.name;
            tg.is_active = true;
            tg.updated_at = now;
            return Ok(Upserted::updated(tg.clone()));
        }

        let tg = TerminalGroup {
            id: Uuid::new_v4(),
            external_id: record.external_id,
            organization_id: record.organization_id,
            name: record.name,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        state.terminal_groups.push(tg.clone());
        Ok(Upserted::created(tg))
    }

    async fn list_terminal_groups(&self, organization_id: Uuid) -> StoreResult<Vec<TerminalGroup>> {
        let state = self.state.lock().await;
        Ok(state
            .terminal_groups
            .iter()
            .filter(|t| t.organization_id == organization_id)
            .cloned()
            .collect())
    }

    async fn first_active_terminal_group(
        &self,
        organization_id: Uuid,
    ) -> StoreResult<Option<TerminalGroup>> {
        let state = self.state.lock().await;
        Ok(state
            .terminal_groups
            .iter()
            .find(|t| t.organization_id == organization_id && t.is_active)
            .cloned())
    }

    async fn upsert_section(&self, record: SectionRecord) -> StoreResult<Upserted<Section>> {
        let mut state = self.state.lock().await;
        state.check_failure(&record.external_id)?;
        let now = Utc::now();

        if let Some(section) = state
            .sections
            .iter_mut()
            .find(|s| s.external_id == record.external_id)
        {
            section.organization_id = record.organization_id;
            section.terminal_group_id = record.terminal_group_id;
            section.name = record.name;
            section.table_number = record.table_number;
            section.is_active = true;
            section.updated_at = now;
            return Ok(Upserted::updated(section.clone()));
        }

        let section = Section {
            id: Uuid::new_v4(),
            external_id: record.external_id,
            organization_id: record.organization_id,
            terminal_group_id: record.terminal_group_id,
            name: record.name,
            table_number: record.table_number,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        state.sections.push(section.clone());
        Ok(Upserted::created(section))
    }

    async fn mark_missing_inactive(
        &self,
        kind: CatalogEntity,
        organization_id: Uuid,
        present: &[String],
    ) -> StoreResult<u64> {
        let mut state = self.state.lock().await;
        let now = Utc::now();
        let keep = |ext: &str| present.iter().any(|p| p == ext);
        let mut changed = 0u64;

        macro_rules! deactivate {
            ($items:expr) => {
                for row in $items.iter_mut().filter(|r| {
                    r.organization_id == organization_id && r.is_active && !keep(&r.external_id)
                }) {
                    row.is_active = false;
                    row.updated_at = now;
                    changed += 1;
                }
            };
        }

        match kind {
            CatalogEntity::Group => deactivate!(state.groups),
            CatalogEntity::Product => deactivate!(state.products),
            CatalogEntity::TerminalGroup => deactivate!(state.terminal_groups),
            CatalogEntity::Section => deactivate!(state.sections),
        }

        Ok(changed)
    }
}

#[async_trait::async_trait]
impl OrderStore for InMemoryStore {
    async fn create_order(
        &self,
        order: NewOrder,
        items: Vec<NewOrderItem>,
    ) -> StoreResult<OrderWithItems> {
        let mut state = self.state.lock().await;
        if !state
            .organizations
            .iter()
            .any(|o| o.id == order.organization_id)
        {
            return Err(StoreError::NotFound(format!(
                "Organization {} not found",
                order.organization_id
            )));
        }

        let now = Utc::now();
        let order_number = FIRST_ORDER_NUMBER.max(state.next_order_number);
        state.next_order_number = order_number + 1;

        let order = Order {
            id: Uuid::new_v4(),
            order_number,
            external_order_id: None,
            organization_id: order.organization_id,
            user_id: order.user_id,
            customer_name: order.customer_name,
            customer_phone: order.customer_phone,
            customer_email: order.customer_email,
            delivery_address: order.delivery_address,
            total_amount: order.total_amount,
            status: OrderStatus::Pending,
            notes: order.notes,
            message_id: None,
            created_at: now,
            updated_at: now,
        };
        let items: Vec<OrderItem> = items
            .into_iter()
            .map(|item| OrderItem {
                id: Uuid::new_v4(),
                order_id: order.id,
                product_id: Some(item.product_id),
                product_name: item.product_name,
                quantity: item.quantity,
                price: item.price,
                total: item.total,
                created_at: now,
            })
            .collect();

        state.orders.push(order.clone());
        state.items.extend(items.iter().cloned());
        Ok(OrderWithItems { order, items })
    }

    async fn find_order(&self, id: Uuid) -> StoreResult<Option<Order>> {
        let state = self.state.lock().await;
        Ok(state.orders.iter().find(|o| o.id == id).cloned())
    }

    async fn find_order_by_external_id(&self, external_id: &str) -> StoreResult<Option<Order>> {
        let state = self.state.lock().await;
        Ok(state
            .orders
            .iter()
            .find(|o| o.external_order_id.as_deref() == Some(external_id))
            .cloned())
    }

    async fn list_order_items(&self, order_id: Uuid) -> StoreResult<Vec<OrderItem>> {
        let state = self.state.lock().await;
        Ok(state
            .items
            .iter()
            .filter(|i| i.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn list_orders(&self, query: &ListOrdersQuery) -> StoreResult<Vec<Order>> {
        let state = self.state.lock().await;
        let (limit, offset) = query.limit_offset();
        let mut orders: Vec<Order> = state
            .orders
            .iter()
            .filter(|o| query.organization_id.map_or(true, |id| o.organization_id == id))
            .filter(|o| query.status.map_or(true, |s| o.status == s))
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.order_number.cmp(&a.order_number));
        Ok(orders
            .into_iter()
            .skip(usize::try_from(offset).unwrap_or(usize::MAX))
            .take(usize::try_from(limit).unwrap_or(0))
            .collect())
    }

    async fn update_order_status(&self, id: Uuid, status: OrderStatus) -> StoreResult<Order> {
        let mut state = self.state.lock().await;
        let order = state
            .orders
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("Order {} not found", id)))?;
        order.status = status;
        order.updated_at = Utc::now();
        Ok(order.clone())
    }

    async fn set_external_order_id(&self, id: Uuid, external_id: &str) -> StoreResult<Order> {
        let mut state = self.state.lock().await;
        if state
            .orders
            .iter()
            .any(|o| o.id != id && o.external_order_id.as_deref() == Some(external_id))
        {
            return Err(StoreError::Conflict(format!(
                "External order id {} already recorded",
                external_id
            )));
        }
        let order = state
            .orders
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("Order {} not found", id)))?;
        order.external_order_id = Some(external_id.to_string());
        order.updated_at = Utc::now();
        Ok(order.clone())
    }

    async fn set_message_id(&self, id: Uuid, message_id: i64) -> StoreResult<Order> {
        let mut state = self.state.lock().await;
        let order = state
            .orders
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("Order {} not found", id)))?;
        order.message_id = Some(message_id);
        order.updated_at = Utc::now();
        Ok(order.clone())
    }
}
