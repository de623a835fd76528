//! POS gateway contract.
//!
//! Wire types mirror the iiko Cloud API payloads. Field aliases accept both the
//! older Resto names (`parent`, `deleted`) and the Cloud names (`parentGroup`,
//! `isDeleted`).

use std::collections::HashMap;
use std::time::Duration;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::models::{LocalizedText, OrganizationRecord};

/// Errors from the POS provider.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PosError {
    /// Credential exchange failed or returned no token.
    #[error("POS authentication failed: {0}")]
    Auth(String),

    /// Network failure or timeout.
    #[error("POS transport error: {0}")]
    Transport(String),

    /// Non-success status from the provider.
    #[error("POS returned status {status}: {body}")]
    Remote { status: u16, body: String },

    /// Success status but the expected field is missing or has the wrong shape.
    #[error("Malformed POS response: {0}")]
    MalformedResponse(String),
}

impl PosError {
    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            PosError::Auth(_) => "auth",
            PosError::Transport(_) => "transport",
            PosError::Remote { .. } => "remote",
            PosError::MalformedResponse(_) => "malformed",
        }
    }
}

pub type PosResult<T> = Result<T, PosError>;

pub const UNNAMED_GROUP: &str = "Unnamed Group";
pub const UNNAMED_PRODUCT: &str = "Unnamed Product";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteOrganization {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub restaurant_address: Option<String>,
    #[serde(default)]
    pub use_uae_addressing_system: Option<bool>,
    #[serde(default)]
    pub timezone: Option<String>,
}

impl RemoteOrganization {
    pub fn to_record(&self) -> OrganizationRecord {
        OrganizationRecord {
            external_id: self.id.clone(),
            name: self.name.clone().unwrap_or_default(),
            country: self.country.clone(),
            restaurant_address: self.restaurant_address.clone(),
            use_uae_addressing: self.use_uae_addressing_system.unwrap_or(false),
            timezone: self.timezone.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteGroup {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, alias = "parentGroup")]
    pub parent: Option<String>,
    #[serde(default, alias = "isDeleted")]
    pub deleted: Option<bool>,
    #[serde(default)]
    pub order: Option<i32>,
    #[serde(default)]
    pub is_included_in_menu: Option<bool>,
}

impl RemoteGroup {
    pub fn is_deleted(&self) -> bool {
        self.deleted.unwrap_or(false)
    }

    /// Parent external id, treating blank strings as absent.
    pub fn parent_id(&self) -> Option<&str> {
        self.parent.as_deref().filter(|p| !p.trim().is_empty())
    }

    pub fn display_name(&self) -> LocalizedText {
        LocalizedText::uniform(non_blank(&self.name).unwrap_or(UNNAMED_GROUP))
    }

    pub fn display_description(&self) -> LocalizedText {
        LocalizedText::uniform(non_blank(&self.description).unwrap_or_default())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemotePrice {
    #[serde(default)]
    pub current_price: Option<Decimal>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteSizePrice {
    #[serde(default)]
    pub price: Option<RemotePrice>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteProduct {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, alias = "parentGroup")]
    pub parent: Option<String>,
    #[serde(default, alias = "isDeleted")]
    pub deleted: Option<bool>,
    #[serde(default)]
    pub default_sale_price: Option<Decimal>,
    #[serde(default)]
    pub size_prices: Vec<RemoteSizePrice>,
    #[serde(default)]
    pub image_links: Vec<String>,
}

impl RemoteProduct {
    pub fn is_deleted(&self) -> bool {
        self.deleted.unwrap_or(false)
    }

    pub fn parent_id(&self) -> Option<&str> {
        self.parent.as_deref().filter(|p| !p.trim().is_empty())
    }

    pub fn display_name(&self) -> LocalizedText {
        LocalizedText::uniform(non_blank(&self.name).unwrap_or(UNNAMED_PRODUCT))
    }

    pub fn display_description(&self) -> LocalizedText {
        LocalizedText::uniform(non_blank(&self.description).unwrap_or_default())
    }

    /// `defaultSalePrice`, then the first size price, then zero.
    pub fn effective_price(&self) -> Decimal {
        self.default_sale_price
            .or_else(|| {
                self.size_prices
                    .iter()
                    .find_map(|sp| sp.price.as_ref().and_then(|p| p.current_price))
            })
            .unwrap_or(Decimal::ZERO)
    }
}

/// Groups and products of one organization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Nomenclature {
    #[serde(default)]
    pub groups: Vec<RemoteGroup>,
    #[serde(default)]
    pub products: Vec<RemoteProduct>,
    #[serde(default)]
    pub revision: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteTerminalGroup {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Terminal groups of one organization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TerminalGroupBucket {
    pub organization_id: String,
    #[serde(default)]
    pub items: Vec<RemoteTerminalGroup>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteTable {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub number: Option<i32>,
    #[serde(default)]
    pub is_deleted: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteSection {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub terminal_group_id: Option<String>,
    #[serde(default)]
    pub tables: Vec<RemoteTable>,
}

/// One local section derived from a remote section or one of its tables.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionSlot {
    pub external_id: String,
    pub name: String,
    pub table_number: Option<i32>,
}

impl RemoteSection {
    /// Every live table becomes a slot; a section without tables is one slot.
    pub fn slots(&self) -> Vec<SectionSlot> {
        let section_name = non_blank(&self.name).unwrap_or_default().to_string();

        if self.tables.is_empty() {
            return vec![SectionSlot {
                external_id: self.id.clone(),
                name: section_name,
                table_number: None,
            }];
        }

        self.tables
            .iter()
            .filter(|t| !t.is_deleted.unwrap_or(false))
            .map(|t| SectionSlot {
                external_id: t.id.clone(),
                name: non_blank(&t.name)
                    .map(str::to_string)
                    .unwrap_or_else(|| section_name.clone()),
                table_number: t.number,
            })
            .collect()
    }
}

/// Outbound order for the POS.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PosOrderRequest {
    pub organization_id: String,
    pub terminal_group_id: String,
    pub order: PosOrder,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PosOrder {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_type_id: Option<String>,
    pub items: Vec<PosOrderItem>,
    pub customer: PosCustomer,
    pub phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PosOrderItem {
    pub product_id: String,
    #[serde(rename = "type")]
    pub item_type: String,
    pub amount: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl PosOrderItem {
    pub fn product(product_id: impl Into<String>, amount: i32) -> Self {
        Self {
            product_id: product_id.into(),
            item_type: "Product".to_string(),
            amount,
            comment: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PosCustomer {
    pub name: String,
    #[serde(rename = "type")]
    pub customer_type: String,
}

impl PosCustomer {
    pub fn regular(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            customer_type: "regular".to_string(),
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Typed operations against the POS provider.
///
/// Implementations never retry; callers decide what to do with a failure.
#[async_trait::async_trait]
pub trait PosGateway: Send + Sync {
    async fn list_organizations(&self) -> PosResult<Vec<RemoteOrganization>>;

    async fn get_nomenclature(&self, organization_id: &str) -> PosResult<Nomenclature>;

    async fn list_terminal_groups(
        &self,
        organization_ids: &[String],
    ) -> PosResult<Vec<TerminalGroupBucket>>;

    async fn list_available_sections(
        &self,
        terminal_group_ids: &[String],
    ) -> PosResult<Vec<RemoteSection>>;

    /// Returns the provider's order id, or `None` when the response has none.
    async fn create_order(&self, request: &PosOrderRequest) -> PosResult<Option<String>>;
}

/// Scripted gateway for development and testing.
///
/// Responses are configured up front; every `create_order` request is recorded.
#[derive(Debug, Default)]
pub struct MockPosGateway {
    organizations: Vec<RemoteOrganization>,
    nomenclature: HashMap<String, Nomenclature>,
    terminal_groups: Vec<TerminalGroupBucket>,
    sections: Vec<RemoteSection>,
    failures: HashMap<&'static str, PosError>,
    nomenclature_failures: HashMap<String, PosError>,
    order_id: Option<String>,
    create_delay: Option<Duration>,
    created_orders: Mutex<Vec<PosOrderRequest>>,
    nomenclature_calls: Mutex<Vec<String>>,
}

impl MockPosGateway {
    pub fn new() -> Self {
        Self {
            order_id: Some("pos-order-1".to_string()),
            ..Default::default()
        }
    }

    pub fn with_organizations(mut self, organizations: Vec<RemoteOrganization>) -> Self {
        self.organizations = organizations;
        self
    }

    pub fn with_nomenclature(mut self, organization_id: &str, nomenclature: Nomenclature) -> Self {
        self.nomenclature
            .insert(organization_id.to_string(), nomenclature);
        self
    }

    pub fn with_terminal_groups(mut self, buckets: Vec<TerminalGroupBucket>) -> Self {
        self.terminal_groups = buckets;
        self
    }

    pub fn with_sections(mut self, sections: Vec<RemoteSection>) -> Self {
        self.sections = sections;
        self
    }

    /// Id returned by `create_order`; `None` simulates a response without one.
    pub fn with_order_id(mut self, order_id: Option<&str>) -> Self {
        self.order_id = order_id.map(str::to_string);
        self
    }

    /// Delay `create_order` responses, like a slow provider.
    pub fn with_create_delay(mut self, delay: Duration) -> Self {
        self.create_delay = Some(delay);
        self
    }

    /// Make one operation fail. Operation names match the trait methods.
    pub fn failing(mut self, operation: &'static str, error: PosError) -> Self {
        self.failures.insert(operation, error);
        self
    }

    /// Make `get_nomenclature` fail for one organization only.
    pub fn failing_nomenclature_for(mut self, organization_id: &str, error: PosError) -> Self {
        self.nomenclature_failures
            .insert(organization_id.to_string(), error);
        self
    }

    pub async fn created_orders(&self) -> Vec<PosOrderRequest> {
        self.created_orders.lock().await.clone()
    }

    pub async fn nomenclature_calls(&self) -> Vec<String> {
        self.nomenclature_calls.lock().await.clone()
    }

    fn check(&self, operation: &'static str) -> PosResult<()> {
        match self.failures.get(operation) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait::async_trait]
impl PosGateway for MockPosGateway {
    async fn list_organizations(&self) -> PosResult<Vec<RemoteOrganization>> {
        self.check("list_organizations")?;
        Ok(self.organizations.clone())
    }

    async fn get_nomenclature(&self, organization_id: &str) -> PosResult<Nomenclature> {
        self.nomenclature_calls
            .lock()
            .await
            .push(organization_id.to_string());
        self.check("get_nomenclature")?;
        if let Some(error) = self.nomenclature_failures.get(organization_id) {
            return Err(error.clone());
        }
        Ok(self
            .nomenclature
            .get(organization_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn list_terminal_groups(
        &self,
        organization_ids: &[String],
    ) -> PosResult<Vec<TerminalGroupBucket>> {
        self.check("list_terminal_groups")?;
        Ok(self
            .terminal_groups
            .iter()
            .filter(|b| organization_ids.contains(&b.organization_id))
            .cloned()
            .collect())
    }

    async fn list_available_sections(
        &self,
        terminal_group_ids: &[String],
    ) -> PosResult<Vec<RemoteSection>> {
        self.check("list_available_sections")?;
        Ok(self
            .sections
            .iter()
            .filter(|s| {
                s.terminal_group_id
                    .as_ref()
                    .map_or(true, |tg| terminal_group_ids.contains(tg))
            })
            .cloned()
            .collect())
    }

    async fn create_order(&self, request: &PosOrderRequest) -> PosResult<Option<String>> {
        self.created_orders.lock().await.push(request.clone());
        if let Some(delay) = self.create_delay {
            tokio::time::sleep(delay).await;
        }
        self.check("create_order")?;
        tracing::info!(
            organization_id = %request.organization_id,
            items = request.order.items.len(),
            "Mock: Would create POS order"
        );
        Ok(self.order_id.clone())
    }
}
