//! Menu group entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::{Group, LocalizedText};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the groups table.
#[derive(Debug, Clone, FromRow)]
pub struct GroupEntity {
    pub id: Uuid,
    pub external_id: String,
    pub organization_id: Uuid,
    pub parent_group_id: Option<Uuid>,
    pub name_uz: String,
    pub name_ru: String,
    pub name_en: String,
    pub description_uz: String,
    pub description_ru: String,
    pub description_en: String,
    pub display_order: i32,
    pub is_included_in_menu: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<GroupEntity> for Group {
    fn from(entity: GroupEntity) -> Self {
        Self {
            id: entity.id,
            external_id: entity.external_id,
            organization_id: entity.organization_id,
            parent_group_id: entity.parent_group_id,
            name: LocalizedText {
                uz: entity.name_uz,
                ru: entity.name_ru,
                en: entity.name_en,
            },
            description: LocalizedText {
                uz: entity.description_uz,
                ru: entity.description_ru,
                en: entity.description_en,
            },
            display_order: entity.display_order,
            is_included_in_menu: entity.is_included_in_menu,
            is_active: entity.is_active,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}
