//! PostgreSQL implementation of the domain store traits.

use domain::models::{
    Group, GroupRecord, ListOrdersQuery, NewOrder, NewOrderItem, Order, OrderItem, OrderStatus,
    OrderWithItems, Organization, OrganizationRecord, Product, ProductRecord, Section,
    SectionRecord, TerminalGroup, TerminalGroupRecord,
};
use domain::store::{
    CatalogEntity, CatalogStore, OrderStore, StoreError, StoreResult, Upserted,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::repositories::{
    CatalogRepository, GroupRepository, OrderRepository, OrganizationRepository,
    ProductRepository, SectionRepository, TerminalGroupRepository,
};

/// Map a sqlx error onto the store taxonomy.
///
/// Unique violations become conflicts and foreign key violations become
/// not-found, matching how the API reports them.
pub fn map_sqlx_error(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::RowNotFound => StoreError::NotFound("Row not found".to_string()),
        sqlx::Error::Database(db_err) => match db_err.code().as_deref() {
            Some("23505") => StoreError::Conflict(db_err.message().to_string()),
            Some("23503") => StoreError::NotFound(db_err.message().to_string()),
            _ => StoreError::Backend(err.to_string()),
        },
        _ => StoreError::Backend(err.to_string()),
    }
}

fn order_not_found(id: Uuid) -> StoreError {
    StoreError::NotFound(format!("Order {} not found", id))
}

/// Store backed by a PostgreSQL pool.
///
/// Upserts rely on `INSERT ... ON CONFLICT (external_id)`, so concurrent
/// writes for one external id are serialized by the database.
#[derive(Clone)]
pub struct PgStore {
    organizations: OrganizationRepository,
    groups: GroupRepository,
    products: ProductRepository,
    terminal_groups: TerminalGroupRepository,
    sections: SectionRepository,
    catalog: CatalogRepository,
    orders: OrderRepository,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            organizations: OrganizationRepository::new(pool.clone()),
            groups: GroupRepository::new(pool.clone()),
            products: ProductRepository::new(pool.clone()),
            terminal_groups: TerminalGroupRepository::new(pool.clone()),
            sections: SectionRepository::new(pool.clone()),
            catalog: CatalogRepository::new(pool.clone()),
            orders: OrderRepository::new(pool),
        }
    }
}

#[async_trait::async_trait]
impl CatalogStore for PgStore {
    async fn upsert_organization(
        &self,
        record: OrganizationRecord,
    ) -> StoreResult<Upserted<Organization>> {
        self.organizations
            .upsert(&record)
            .await
            .map_err(map_sqlx_error)
    }

    async fn find_organization(&self, id: Uuid) -> StoreResult<Option<Organization>> {
        self.organizations
            .find_by_id(id)
            .await
            .map_err(map_sqlx_error)
    }

    async fn find_organization_by_external_id(
        &self,
        external_id: &str,
    ) -> StoreResult<Option<Organization>> {
        self.organizations
            .find_by_external_id(external_id)
            .await
            .map_err(map_sqlx_error)
    }

    async fn list_organizations(&self, active_only: bool) -> StoreResult<Vec<Organization>> {
        self.organizations
            .list(active_only)
            .await
            .map_err(map_sqlx_error)
    }

    async fn upsert_group(&self, record: GroupRecord) -> StoreResult<Upserted<Group>> {
        self.groups.upsert(&record).await.map_err(map_sqlx_error)
    }

    async fn list_groups(&self, organization_id: Uuid) -> StoreResult<Vec<Group>> {
        self.groups
            .list_by_organization(organization_id)
            .await
            .map_err(map_sqlx_error)
    }

    async fn upsert_product(&self, record: ProductRecord) -> StoreResult<Upserted<Product>> {
        self.products.upsert(&record).await.map_err(map_sqlx_error)
    }

    async fn find_product(&self, id: Uuid) -> StoreResult<Option<Product>> {
        self.products.find_by_id(id).await.map_err(map_sqlx_error)
    }

    async fn find_products(&self, ids: &[Uuid]) -> StoreResult<Vec<Product>> {
        self.products.find_by_ids(ids).await.map_err(map_sqlx_error)
    }

    async fn upsert_terminal_group(
        &self,
        record: TerminalGroupRecord,
    ) -> StoreResult<Upserted<TerminalGroup>> {
        self.terminal_groups
            .upsert(&record)
            .await
            .map_err(map_sqlx_error)
    }

    async fn list_terminal_groups(&self, organization_id: Uuid) -> StoreResult<Vec<TerminalGroup>> {
        self.terminal_groups
            .list_by_organization(organization_id)
            .await
            .map_err(map_sqlx_error)
    }

    async fn first_active_terminal_group(
        &self,
        organization_id: Uuid,
    ) -> StoreResult<Option<TerminalGroup>> {
        self.terminal_groups
            .first_active(organization_id)
            .await
            .map_err(map_sqlx_error)
    }

    async fn upsert_section(&self, record: SectionRecord) -> StoreResult<Upserted<Section>> {
        self.sections.upsert(&record).await.map_err(map_sqlx_error)
    }

    async fn mark_missing_inactive(
        &self,
        kind: CatalogEntity,
        organization_id: Uuid,
        present: &[String],
    ) -> StoreResult<u64> {
        self.catalog
            .mark_missing_inactive(kind, organization_id, present)
            .await
            .map_err(map_sqlx_error)
    }
}

#[async_trait::async_trait]
impl OrderStore for PgStore {
    async fn create_order(
        &self,
        order: NewOrder,
        items: Vec<NewOrderItem>,
    ) -> StoreResult<OrderWithItems> {
        self.orders
            .create(&order, &items)
            .await
            .map_err(map_sqlx_error)
    }

    async fn find_order(&self, id: Uuid) -> StoreResult<Option<Order>> {
        self.orders.find_by_id(id).await.map_err(map_sqlx_error)
    }

    async fn find_order_by_external_id(&self, external_id: &str) -> StoreResult<Option<Order>> {
        self.orders
            .find_by_external_id(external_id)
            .await
            .map_err(map_sqlx_error)
    }

    async fn list_order_items(&self, order_id: Uuid) -> StoreResult<Vec<OrderItem>> {
        self.orders
            .list_items(order_id)
            .await
            .map_err(map_sqlx_error)
    }

    async fn list_orders(&self, query: &ListOrdersQuery) -> StoreResult<Vec<Order>> {
        self.orders.list(query).await.map_err(map_sqlx_error)
    }

    async fn update_order_status(&self, id: Uuid, status: OrderStatus) -> StoreResult<Order> {
        self.orders
            .update_status(id, status)
            .await
            .map_err(map_sqlx_error)?
            .ok_or_else(|| order_not_found(id))
    }

    async fn set_external_order_id(&self, id: Uuid, external_id: &str) -> StoreResult<Order> {
        self.orders
            .set_external_order_id(id, external_id)
            .await
            .map_err(map_sqlx_error)?
            .ok_or_else(|| order_not_found(id))
    }

    async fn set_message_id(&self, id: Uuid, message_id: i64) -> StoreResult<Order> {
        self.orders
            .set_message_id(id, message_id)
            .await
            .map_err(map_sqlx_error)?
            .ok_or_else(|| order_not_found(id))
    }
}
