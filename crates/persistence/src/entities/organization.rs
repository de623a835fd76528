//! Organization entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::Organization;
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the organizations table.
#[derive(Debug, Clone, FromRow)]
pub struct OrganizationEntity {
    pub id: Uuid,
    pub external_id: String,
    pub name: String,
    pub country: Option<String>,
    pub restaurant_address: Option<String>,
    pub use_uae_addressing: bool,
    pub timezone: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<OrganizationEntity> for Organization {
    fn from(entity: OrganizationEntity) -> Self {
        Self {
            id: entity.id,
            external_id: entity.external_id,
            name: entity.name,
            country: entity.country,
            restaurant_address: entity.restaurant_address,
            use_uae_addressing: entity.use_uae_addressing,
            timezone: entity.timezone,
            is_active: entity.is_active,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}
