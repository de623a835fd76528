//! Product domain models.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::LocalizedText;

/// A sellable menu item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Product {
    pub id: Uuid,
    pub external_id: String,
    pub organization_id: Uuid,
    pub group_id: Option<Uuid>,
    pub name: LocalizedText,
    pub description: LocalizedText,
    pub price: Decimal,
    pub images: Vec<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// POS id usable for outbound calls, if any.
    pub fn pos_id(&self) -> Option<&str> {
        let id = self.external_id.trim();
        (!id.is_empty()).then_some(id)
    }
}

/// Incoming product values keyed by external id.
///
/// An empty `images` list leaves the stored list untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductRecord {
    pub external_id: String,
    pub organization_id: Uuid,
    pub group_id: Option<Uuid>,
    pub name: LocalizedText,
    pub description: LocalizedText,
    pub price: Decimal,
    pub images: Vec<String>,
}

/// Resolve the image list an upsert should store.
pub fn merge_images(existing: &[String], incoming: Vec<String>) -> Vec<String> {
    if incoming.is_empty() {
        existing.to_vec()
    } else {
        incoming
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_images_keeps_existing_on_empty() {
        let existing = vec!["a.png".to_string()];
        assert_eq!(merge_images(&existing, vec![]), existing);
    }

    #[test]
    fn test_merge_images_replaces_on_non_empty() {
        let existing = vec!["a.png".to_string()];
        let merged = merge_images(&existing, vec!["b.png".to_string()]);
        assert_eq!(merged, vec!["b.png".to_string()]);
    }
}
