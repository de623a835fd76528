//! Persistent store contract consumed by the reconcilers and the dispatcher.
//!
//! The PostgreSQL implementation lives in the persistence crate; an in-memory
//! implementation is provided here for tests and local development.

mod memory;

use uuid::Uuid;

use crate::models::{
    Group, GroupRecord, ListOrdersQuery, NewOrder, NewOrderItem, Order, OrderItem, OrderStatus,
    OrderWithItems, Organization, OrganizationRecord, Product, ProductRecord, Section,
    SectionRecord, TerminalGroup, TerminalGroupRecord,
};

pub use memory::InMemoryStore;

/// Errors returned by store implementations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Result of an upsert-by-external-id.
#[derive(Debug, Clone, PartialEq)]
pub struct Upserted<T> {
    pub entity: T,
    /// True when no record with the external id existed before.
    pub created: bool,
}

impl<T> Upserted<T> {
    pub fn created(entity: T) -> Self {
        Self {
            entity,
            created: true,
        }
    }

    pub fn updated(entity: T) -> Self {
        Self {
            entity,
            created: false,
        }
    }
}

/// Catalog entity kinds scoped to one organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CatalogEntity {
    Group,
    Product,
    TerminalGroup,
    Section,
}

impl CatalogEntity {
    pub fn as_str(&self) -> &'static str {
        match self {
            CatalogEntity::Group => "group",
            CatalogEntity::Product => "product",
            CatalogEntity::TerminalGroup => "terminal_group",
            CatalogEntity::Section => "section",
        }
    }
}

impl std::fmt::Display for CatalogEntity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Catalog storage: organizations and the entities they own.
///
/// Every upsert is keyed by external id and overwrites all non-identity
/// fields. Writes for one external id must be serialized by the
/// implementation.
#[async_trait::async_trait]
pub trait CatalogStore: Send + Sync {
    async fn upsert_organization(
        &self,
        record: OrganizationRecord,
    ) -> StoreResult<Upserted<Organization>>;

    async fn find_organization(&self, id: Uuid) -> StoreResult<Option<Organization>>;

    async fn find_organization_by_external_id(
        &self,
        external_id: &str,
    ) -> StoreResult<Option<Organization>>;

    async fn list_organizations(&self, active_only: bool) -> StoreResult<Vec<Organization>>;

    async fn upsert_group(&self, record: GroupRecord) -> StoreResult<Upserted<Group>>;

    async fn list_groups(&self, organization_id: Uuid) -> StoreResult<Vec<Group>>;

    /// Stored image list survives an upsert carrying no images.
    async fn upsert_product(&self, record: ProductRecord) -> StoreResult<Upserted<Product>>;

    async fn find_product(&self, id: Uuid) -> StoreResult<Option<Product>>;

    async fn find_products(&self, ids: &[Uuid]) -> StoreResult<Vec<Product>>;

    async fn upsert_terminal_group(
        &self,
        record: TerminalGroupRecord,
    ) -> StoreResult<Upserted<TerminalGroup>>;

    async fn list_terminal_groups(&self, organization_id: Uuid) -> StoreResult<Vec<TerminalGroup>>;

    /// Oldest active terminal group of an organization.
    async fn first_active_terminal_group(
        &self,
        organization_id: Uuid,
    ) -> StoreResult<Option<TerminalGroup>>;

    async fn upsert_section(&self, record: SectionRecord) -> StoreResult<Upserted<Section>>;

    /// Flip `is_active` to false for every active entity of `kind` in the
    /// organization whose external id is not in `present`. Returns the number
    /// of rows changed.
    async fn mark_missing_inactive(
        &self,
        kind: CatalogEntity,
        organization_id: Uuid,
        present: &[String],
    ) -> StoreResult<u64>;
}

/// Order storage.
#[async_trait::async_trait]
pub trait OrderStore: Send + Sync {
    /// Insert the order and its items atomically. The order starts `pending`.
    async fn create_order(
        &self,
        order: NewOrder,
        items: Vec<NewOrderItem>,
    ) -> StoreResult<OrderWithItems>;

    async fn find_order(&self, id: Uuid) -> StoreResult<Option<Order>>;

    async fn find_order_by_external_id(&self, external_id: &str) -> StoreResult<Option<Order>>;

    async fn list_order_items(&self, order_id: Uuid) -> StoreResult<Vec<OrderItem>>;

    async fn list_orders(&self, query: &ListOrdersQuery) -> StoreResult<Vec<Order>>;

    async fn update_order_status(&self, id: Uuid, status: OrderStatus) -> StoreResult<Order>;

    async fn set_external_order_id(&self, id: Uuid, external_id: &str) -> StoreResult<Order>;

    async fn set_message_id(&self, id: Uuid, message_id: i64) -> StoreResult<Order>;
}
