//! Database entity definitions.
//!
//! Entities are direct mappings to database rows.

pub mod group;
pub mod order;
pub mod organization;
pub mod product;
pub mod terminal_group;

pub use group::GroupEntity;
pub use order::{OrderEntity, OrderItemEntity, OrderStatusDb};
pub use organization::OrganizationEntity;
pub use product::ProductEntity;
pub use terminal_group::{SectionEntity, TerminalGroupEntity};

use sqlx::FromRow;

/// Row returned by an `INSERT ... ON CONFLICT ... RETURNING` upsert.
///
/// `inserted` is computed as `(xmax = 0)`, which is true only for rows the
/// statement inserted.
#[derive(Debug, Clone, FromRow)]
pub struct UpsertRow<E> {
    #[sqlx(flatten)]
    pub entity: E,
    pub inserted: bool,
}
