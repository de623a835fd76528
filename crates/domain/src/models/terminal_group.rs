//! Terminal group and restaurant section domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A group of POS terminals that can accept orders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct TerminalGroup {
    pub id: Uuid,
    pub external_id: String,
    pub organization_id: Uuid,
    pub name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TerminalGroup {
    pub fn pos_id(&self) -> Option<&str> {
        let id = self.external_id.trim();
        (!id.is_empty()).then_some(id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TerminalGroupRecord {
    pub external_id: String,
    pub organization_id: Uuid,
    pub name: String,
}

/// A dining area or a single table within one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Section {
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

#[derive(Debug, Clone, PartialEq)]
pub struct SectionRecord {
    pub external_id: String,
    pub organization_id: Uuid,
    pub terminal_group_id: Option<Uuid>,
    pub name: String,
    pub table_number: Option<i32>,
}
