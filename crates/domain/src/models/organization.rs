//! Organization domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A POS organization mirrored into the local store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Organization {
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

impl Organization {
    /// POS id usable for outbound calls, if any.
    pub fn pos_id(&self) -> Option<&str> {
        let id = self.external_id.trim();
        (!id.is_empty()).then_some(id)
    }
}

/// Incoming organization values keyed by external id.
///
/// Upserting a record always marks the organization active.
#[derive(Debug, Clone, PartialEq)]
pub struct OrganizationRecord {
    pub external_id: String,
    pub name: String,
    pub country: Option<String>,
    pub restaurant_address: Option<String>,
    pub use_uae_addressing: bool,
    pub timezone: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn organization(external_id: &str) -> Organization {
        Organization {
            id: Uuid::new_v4(),
            external_id: external_id.to_string(),
            name: "Main".to_string(),
            country: None,
            restaurant_address: None,
            use_uae_addressing: false,
            timezone: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_pos_id_present() {
        assert_eq!(organization("org-1").pos_id(), Some("org-1"));
    }

    #[test]
    fn test_pos_id_blank() {
        assert_eq!(organization("  ").pos_id(), None);
    }
}
