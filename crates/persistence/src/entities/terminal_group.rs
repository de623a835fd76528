//! Terminal group and section entities (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::{Section, TerminalGroup};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the terminal_groups table.
#[derive(Debug, Clone, FromRow)]
pub struct TerminalGroupEntity {
    pub id: Uuid,
    pub external_id: String,
    pub organization_id: Uuid,
    pub name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<TerminalGroupEntity> for TerminalGroup {
    fn from(entity: TerminalGroupEntity) -> Self {
        Self {
            id: entity.id,
            external_id: entity.external_id,
            organization_id: entity.organization_id,
            name: entity.name,
            is_active: entity.is_active,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}

/// Database row mapping for the sections table.
#[derive(Debug, Clone, FromRow)]
pub struct SectionEntity {
    pub id: Uuid,
    pub external_id: String,
    pub organization_id: Uuid,
    pub terminal_group_id: Option<Uuid>,
    pub name: String,
    pub table_number: Option<i32>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<SectionEntity> for Section {
    fn from(entity: SectionEntity) -> Self {
        Self {
            id: entity.id,
            external_id: entity.external_id,
            organization_id: entity.organization_id,
            terminal_group_id: entity.terminal_group_id,
            name: entity.name,
            table_number: entity.table_number,
            is_active: entity.is_active,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}
