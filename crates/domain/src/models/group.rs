//! Menu group domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::LocalizedText;

/// A node of an organization's menu group forest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Group {
    pub id: Uuid,
    pub external_id: String,
    pub organization_id: Uuid,
    pub parent_group_id: Option<Uuid>,
    pub name: LocalizedText,
    pub description: LocalizedText,
    pub display_order: i32,
    pub is_included_in_menu: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Incoming group values with the parent already resolved to a local id.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupRecord {
    pub external_id: String,
    pub organization_id: Uuid,
    pub parent_group_id: Option<Uuid>,
    pub name: LocalizedText,
    pub description: LocalizedText,
    pub display_order: i32,
    pub is_included_in_menu: bool,
}
