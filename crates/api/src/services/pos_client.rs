//! iiko Cloud API client.
//!
//! Implements the `PosGateway` trait over HTTP. A bearer token is obtained by
//! exchanging the configured API login and cached for the token lifetime minus
//! a safety margin. Refresh is single-flight: concurrent callers that find the
//! cache stale wait on one exchange instead of each starting their own.

use std::time::{Duration, Instant};

use domain::services::pos::{RemoteTerminalGroup, TerminalGroupBucket};
use domain::services::{
    Nomenclature, PosError, PosGateway, PosOrderRequest, PosResult, RemoteOrganization,
    RemoteSection,
};
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::config::PosConfig;
use crate::middleware::metrics::{record_pos_auth_refresh, record_pos_request};

const ACCESS_TOKEN_PATH: &str = "/api/1/access_token";
const ORGANIZATIONS_PATH: &str = "/api/1/organizations";
const NOMENCLATURE_PATH: &str = "/api/1/nomenclature";
const TERMINAL_GROUPS_PATH: &str = "/api/1/terminal_groups";
const SECTIONS_PATH: &str = "/api/1/reserve/available_restaurant_sections";

/// Longest response body kept in error messages.
const MAX_ERROR_BODY: usize = 512;

/// HTTP client for the iiko Cloud API.
pub struct IikoClient {
    client: Client,
    base_url: String,
    api_login: String,
    create_order_path: String,
    /// How long a fresh token is trusted.
    token_validity: Duration,
    token_cache: RwLock<Option<CachedToken>>,
    /// Held while a token exchange is in progress.
    refresh_lock: Mutex<()>,
}

/// Cached bearer token.
struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

impl CachedToken {
    fn is_valid(&self) -> bool {
        self.expires_at > Instant::now()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AccessTokenRequest<'a> {
    api_login: &'a str,
}

#[derive(Debug, Deserialize)]
struct AccessTokenResponse {
    #[serde(default)]
    token: Option<String>,
}

fn truncate_body(body: String) -> String {
    if body.len() <= MAX_ERROR_BODY {
        return body;
    }
    let mut end = MAX_ERROR_BODY;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}

/// Deserialize the field `field` of a JSON response.
fn extract<T: DeserializeOwned>(value: Value, field: &str) -> PosResult<T> {
    let Value::Object(mut object) = value else {
        return Err(PosError::MalformedResponse(format!(
            "expected a JSON object containing '{}'",
            field
        )));
    };
    let inner = object
        .remove(field)
        .ok_or_else(|| PosError::MalformedResponse(format!("missing field '{}'", field)))?;
    serde_json::from_value(inner)
        .map_err(|e| PosError::MalformedResponse(format!("invalid '{}': {}", field, e)))
}

/// Provider order id from an order creation response.
fn extract_order_id(value: &Value) -> PosResult<Option<String>> {
    if !value.is_object() {
        return Err(PosError::MalformedResponse(
            "order response is not a JSON object".to_string(),
        ));
    }
    Ok(value
        .get("orderInfo")
        .and_then(|info| info.get("id"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string))
}

impl IikoClient {
    /// Create a client from configuration.
    pub fn new(config: &PosConfig) -> PosResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| PosError::Transport(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_login: config.api_login.clone(),
            create_order_path: config.create_order_path.clone(),
            token_validity: Duration::from_secs(
                config
                    .token_ttl_secs
                    .saturating_sub(config.token_safety_margin_secs),
            ),
            token_cache: RwLock::new(None),
            refresh_lock: Mutex::new(()),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Bearer token for the POS. A cached token is returned while it is
    /// inside its validity window; otherwise one exchange refreshes it.
    pub async fn authenticate(&self) -> PosResult<String> {
        self.access_token().await
    }

    /// Exchange the API login for a new token, bypassing the cache.
    async fn refresh_token(&self) -> PosResult<String> {
        let start = Instant::now();
        let result = self.exchange_token().await;
        let outcome = match &result {
            Ok(_) => "ok",
            Err(e) => e.kind(),
        };
        record_pos_request("authenticate", outcome, start.elapsed().as_secs_f64());
        if result.is_ok() {
            record_pos_auth_refresh();
        }
        result
    }

    async fn exchange_token(&self) -> PosResult<String> {
        let response = self
            .client
            .post(self.url(ACCESS_TOKEN_PATH))
            .json(&AccessTokenRequest {
                api_login: &self.api_login,
            })
            .send()
            .await
            .map_err(|e| PosError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PosError::Auth(format!(
                "token exchange returned {}: {}",
                status.as_u16(),
                truncate_body(body)
            )));
        }

        let body: AccessTokenResponse = response
            .json()
            .await
            .map_err(|e| PosError::Auth(format!("unreadable token response: {}", e)))?;

        body.token
            .filter(|token| !token.is_empty())
            .ok_or_else(|| PosError::Auth("token missing from response".to_string()))
    }

    /// Return a valid token, refreshing it if necessary.
    async fn access_token(&self) -> PosResult<String> {
        if let Some(token) = self.cached_token().await {
            return Ok(token);
        }

        let _refresh = self.refresh_lock.lock().await;

        // Another caller may have refreshed while we waited.
        if let Some(token) = self.cached_token().await {
            return Ok(token);
        }

        let access_token = self.refresh_token().await?;
        *self.token_cache.write().await = Some(CachedToken {
            access_token: access_token.clone(),
            expires_at: Instant::now() + self.token_validity,
        });
        debug!(
            valid_for_secs = self.token_validity.as_secs(),
            "POS access token refreshed"
        );

        Ok(access_token)
    }

    async fn cached_token(&self) -> Option<String> {
        self.token_cache
            .read()
            .await
            .as_ref()
            .filter(|token| token.is_valid())
            .map(|token| token.access_token.clone())
    }

    /// Drop the cached token so the next call re-authenticates.
    pub async fn invalidate_token(&self) {
        *self.token_cache.write().await = None;
    }

    /// Perform an authenticated request and return the JSON body.
    ///
    /// Never retries. A 401 clears the cached token before the error is
    /// returned.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        query: Option<&[(&str, &str)]>,
    ) -> PosResult<Value> {
        self.send("request", method, path, body, query).await
    }

    async fn send(
        &self,
        operation: &'static str,
        method: Method,
        path: &str,
        body: Option<&Value>,
        query: Option<&[(&str, &str)]>,
    ) -> PosResult<Value> {
        let token = self.access_token().await?;
        let start = Instant::now();
        let result = self.send_with_token(&token, method, path, body, query).await;

        let outcome = match &result {
            Ok(_) => "ok",
            Err(e) => e.kind(),
        };
        record_pos_request(operation, outcome, start.elapsed().as_secs_f64());

        if let Err(PosError::Remote { status: 401, .. }) = &result {
            warn!(operation = operation, "POS rejected the access token");
            self.invalidate_token().await;
        }

        result
    }

    async fn send_with_token(
        &self,
        token: &str,
        method: Method,
        path: &str,
        body: Option<&Value>,
        query: Option<&[(&str, &str)]>,
    ) -> PosResult<Value> {
        let mut builder = self
            .client
            .request(method, self.url(path))
            .bearer_auth(token);
        if let Some(query) = query {
            builder = builder.query(query);
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| PosError::Transport(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| PosError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(PosError::Remote {
                status: status.as_u16(),
                body: truncate_body(text),
            });
        }

        if text.trim().is_empty() && status == StatusCode::NO_CONTENT {
            return Ok(Value::Null);
        }

        serde_json::from_str(&text).map_err(|e| PosError::Remote {
            status: status.as_u16(),
            body: format!("non-JSON response ({}): {}", e, truncate_body(text)),
        })
    }
}

#[async_trait::async_trait]
impl PosGateway for IikoClient {
    async fn list_organizations(&self) -> PosResult<Vec<RemoteOrganization>> {
        let body = json!({ "returnAdditionalInfo": true });
        let response = self
            .send("list_organizations", Method::POST, ORGANIZATIONS_PATH, Some(&body), None)
            .await?;
        let organizations: Vec<RemoteOrganization> = extract(response, "organizations")?;
        info!(count = organizations.len(), "Fetched organizations from POS");
        Ok(organizations)
    }

    async fn get_nomenclature(&self, organization_id: &str) -> PosResult<Nomenclature> {
        let body = json!({ "organizationId": organization_id });
        let response = self
            .send("get_nomenclature", Method::POST, NOMENCLATURE_PATH, Some(&body), None)
            .await?;
        if !response.is_object() {
            return Err(PosError::MalformedResponse(
                "nomenclature response is not a JSON object".to_string(),
            ));
        }
        let nomenclature: Nomenclature = serde_json::from_value(response)
            .map_err(|e| PosError::MalformedResponse(format!("invalid nomenclature: {}", e)))?;
        info!(
            organization_id = organization_id,
            groups = nomenclature.groups.len(),
            products = nomenclature.products.len(),
            "Fetched nomenclature from POS"
        );
        Ok(nomenclature)
    }

    async fn list_terminal_groups(
        &self,
        organization_ids: &[String],
    ) -> PosResult<Vec<TerminalGroupBucket>> {
        let body = json!({ "organizationIds": organization_ids });
        let response = self
            .send("list_terminal_groups", Method::POST, TERMINAL_GROUPS_PATH, Some(&body), None)
            .await?;
        let terminal_groups: Vec<TerminalGroupBucket> = extract(response, "terminalGroups")?;
        let total: usize = terminal_groups
            .iter()
            .map(|bucket| bucket.items.len())
            .sum();
        info!(count = total, "Fetched terminal groups from POS");
        Ok(terminal_groups)
    }

    async fn list_available_sections(
        &self,
        terminal_group_ids: &[String],
    ) -> PosResult<Vec<RemoteSection>> {
        let body = json!({ "terminalGroupIds": terminal_group_ids });
        let response = self
            .send("list_available_sections", Method::POST, SECTIONS_PATH, Some(&body), None)
            .await?;
        let restaurant_sections: Vec<RemoteSection> =
            extract(response, "restaurantSections")?;
        info!(count = restaurant_sections.len(), "Fetched restaurant sections from POS");
        Ok(restaurant_sections)
    }

    async fn create_order(&self, request: &PosOrderRequest) -> PosResult<Option<String>> {
        let body = serde_json::to_value(request)
            .map_err(|e| PosError::MalformedResponse(format!("unserializable order: {}", e)))?;
        let path = self.create_order_path.clone();
        let response = self
            .send("create_order", Method::POST, &path, Some(&body), None)
            .await?;
        extract_order_id(&response)
    }
}

/// Flatten terminal group buckets into `(organization external id, group)` pairs.
pub fn flatten_terminal_groups(
    buckets: Vec<TerminalGroupBucket>,
) -> Vec<(String, RemoteTerminalGroup)> {
    buckets
        .into_iter()
        .flat_map(|bucket| {
            let organization_id = bucket.organization_id;
            bucket
                .items
                .into_iter()
                .map(move |item| (organization_id.clone(), item))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use axum::extract::State;
    use axum::http::{HeaderMap, StatusCode as AxumStatus};
    use axum::routing::post;
    use axum::{Json, Router};

    #[derive(Clone, Default)]
    struct FakeIiko {
        auth_calls: Arc<AtomicUsize>,
        /// Reject this many authenticated calls with 401 before succeeding.
        reject_next: Arc<AtomicUsize>,
    }

    async fn access_token(
        State(fake): State<FakeIiko>,
        Json(body): Json<Value>,
    ) -> (AxumStatus, Json<Value>) {
        tokio::time::sleep(Duration::from_millis(50)).await;
        if body["apiLogin"] != "good-login" {
            return (AxumStatus::UNAUTHORIZED, Json(json!({"errorDescription": "bad login"})));
        }
        let n = fake.auth_calls.fetch_add(1, Ordering::SeqCst) + 1;
        (AxumStatus::OK, Json(json!({ "token": format!("token-{}", n) })))
    }

    fn authorized(headers: &HeaderMap, fake: &FakeIiko) -> bool {
        if fake
            .reject_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return false;
        }
        headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(|v| v.starts_with("Bearer token-"))
            .unwrap_or(false)
    }

    async fn organizations(
        State(fake): State<FakeIiko>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> (AxumStatus, Json<Value>) {
        if !authorized(&headers, &fake) {
            return (AxumStatus::UNAUTHORIZED, Json(json!({})));
        }
        assert_eq!(body["returnAdditionalInfo"], true);
        (
            AxumStatus::OK,
            Json(json!({
                "organizations": [
                    {"id": "org-1", "name": "Cafe", "country": "Uzbekistan", "timezone": "Asia/Tashkent"}
                ]
            })),
        )
    }

    async fn nomenclature(headers: HeaderMap, State(fake): State<FakeIiko>) -> (AxumStatus, Json<Value>) {
        if !authorized(&headers, &fake) {
            return (AxumStatus::UNAUTHORIZED, Json(json!({})));
        }
        (
            AxumStatus::OK,
            Json(json!({
                "groups": [{"id": "g1", "name": "Drinks", "parentGroup": null}],
                "products": [{"id": "p1", "name": "Tea", "parentGroup": "g1",
                              "sizePrices": [{"price": {"currentPrice": 12000}}]}],
                "revision": 7
            })),
        )
    }

    async fn terminal_groups(headers: HeaderMap, State(fake): State<FakeIiko>) -> (AxumStatus, Json<Value>) {
        if !authorized(&headers, &fake) {
            return (AxumStatus::UNAUTHORIZED, Json(json!({})));
        }
        (AxumStatus::OK, Json(json!({ "unexpected": [] })))
    }

    async fn create_order(headers: HeaderMap, State(fake): State<FakeIiko>) -> (AxumStatus, Json<Value>) {
        if !authorized(&headers, &fake) {
            return (AxumStatus::UNAUTHORIZED, Json(json!({})));
        }
        (AxumStatus::OK, Json(json!({ "orderInfo": { "id": "iiko-42" } })))
    }

    async fn broken() -> (AxumStatus, &'static str) {
        (AxumStatus::INTERNAL_SERVER_ERROR, "boom")
    }

    async fn start_fake(fake: FakeIiko) -> String {
        let app = Router::new()
            .route(ACCESS_TOKEN_PATH, post(access_token))
            .route(ORGANIZATIONS_PATH, post(organizations))
            .route(NOMENCLATURE_PATH, post(nomenclature))
            .route(TERMINAL_GROUPS_PATH, post(terminal_groups))
            .route("/api/1/order/create", post(create_order))
            .route(SECTIONS_PATH, post(broken))
            .with_state(fake);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn config(base_url: &str, api_login: &str) -> PosConfig {
        PosConfig {
            base_url: base_url.to_string(),
            api_login: api_login.to_string(),
            request_timeout_ms: 5_000,
            token_ttl_secs: 3600,
            token_safety_margin_secs: 600,
            order_type_id: None,
            create_order_path: "/api/1/order/create".to_string(),
        }
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_token_exchange() {
        let fake = FakeIiko::default();
        let base_url = start_fake(fake.clone()).await;
        let client = Arc::new(IikoClient::new(&config(&base_url, "good-login")).unwrap());

        let mut handles = Vec::new();
        for _ in 0..10 {
            let client = client.clone();
            handles.push(tokio::spawn(async move { client.list_organizations().await }));
        }
        for handle in handles {
            let organizations = handle.await.unwrap().unwrap();
            assert_eq!(organizations[0].id, "org-1");
        }

        assert_eq!(fake.auth_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_authenticate_reuses_token_within_validity() {
        let fake = FakeIiko::default();
        let base_url = start_fake(fake.clone()).await;
        let client = IikoClient::new(&config(&base_url, "good-login")).unwrap();

        let first = client.authenticate().await.unwrap();
        let second = client.authenticate().await.unwrap();

        assert_eq!(first, "token-1");
        assert_eq!(second, first);
        assert_eq!(fake.auth_calls.load(Ordering::SeqCst), 1);

        client.invalidate_token().await;
        assert_eq!(client.authenticate().await.unwrap(), "token-2");
        assert_eq!(fake.auth_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_bad_login_is_auth_error() {
        let base_url = start_fake(FakeIiko::default()).await;
        let client = IikoClient::new(&config(&base_url, "wrong")).unwrap();

        let result = client.list_organizations().await;
        assert!(matches!(result, Err(PosError::Auth(_))));
    }

    #[tokio::test]
    async fn test_rejected_token_is_dropped_without_retry() {
        let fake = FakeIiko::default();
        let base_url = start_fake(fake.clone()).await;
        let client = IikoClient::new(&config(&base_url, "good-login")).unwrap();

        client.list_organizations().await.unwrap();
        fake.reject_next.store(1, Ordering::SeqCst);

        let result = client.list_organizations().await;
        assert!(matches!(result, Err(PosError::Remote { status: 401, .. })));
        assert_eq!(fake.auth_calls.load(Ordering::SeqCst), 1);

        client.list_organizations().await.unwrap();
        assert_eq!(fake.auth_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_nomenclature_parses_cloud_shape() {
        let base_url = start_fake(FakeIiko::default()).await;
        let client = IikoClient::new(&config(&base_url, "good-login")).unwrap();

        let nomenclature = client.get_nomenclature("org-1").await.unwrap();
        assert_eq!(nomenclature.groups.len(), 1);
        assert_eq!(nomenclature.products[0].parent_id(), Some("g1"));
        assert_eq!(nomenclature.revision, Some(7));
    }

    #[tokio::test]
    async fn test_raw_request_returns_json() {
        let base_url = start_fake(FakeIiko::default()).await;
        let client = IikoClient::new(&config(&base_url, "good-login")).unwrap();

        let body = json!({ "organizationId": "org-1" });
        let value = client
            .request(Method::POST, NOMENCLATURE_PATH, Some(&body), Some(&[("lang", "ru")]))
            .await
            .unwrap();
        assert_eq!(value["revision"], 7);
    }

    #[tokio::test]
    async fn test_missing_field_is_malformed() {
        let base_url = start_fake(FakeIiko::default()).await;
        let client = IikoClient::new(&config(&base_url, "good-login")).unwrap();

        let result = client.list_terminal_groups(&["org-1".to_string()]).await;
        assert!(matches!(result, Err(PosError::MalformedResponse(_))));
    }

    #[tokio::test]
    async fn test_server_error_is_remote_error() {
        let base_url = start_fake(FakeIiko::default()).await;
        let client = IikoClient::new(&config(&base_url, "good-login")).unwrap();

        match client.list_available_sections(&["tg-1".to_string()]).await {
            Err(PosError::Remote { status, body }) => {
                assert_eq!(status, 500);
                assert_eq!(body, "boom");
            }
            other => panic!("expected remote error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_create_order_extracts_order_id() {
        let base_url = start_fake(FakeIiko::default()).await;
        let client = IikoClient::new(&config(&base_url, "good-login")).unwrap();
        let request: PosOrderRequest = serde_json::from_value(json!({
            "organizationId": "org-1",
            "terminalGroupId": "tg-1",
            "order": {
                "items": [{"productId": "p1", "type": "Product", "amount": 1}],
                "customer": {"name": "Aziz", "type": "regular"},
                "phone": "+998901234567"
            }
        }))
        .unwrap();

        let id = client.create_order(&request).await.unwrap();
        assert_eq!(id.as_deref(), Some("iiko-42"));
    }

    #[tokio::test]
    async fn test_unreachable_provider_is_transport_error() {
        let client = IikoClient::new(&config("http://127.0.0.1:1", "good-login")).unwrap();
        let result = client.authenticate().await;
        assert!(matches!(result, Err(PosError::Transport(_))));
    }

    #[test]
    fn test_extract_order_id_absent() {
        assert_eq!(extract_order_id(&json!({"orderInfo": {}})).unwrap(), None);
        assert_eq!(extract_order_id(&json!({"orderInfo": {"id": " "}})).unwrap(), None);
        assert!(extract_order_id(&json!([1, 2])).is_err());
    }

    #[test]
    fn test_extract_field() {
        let ids: Vec<String> = extract(json!({"ids": ["a", "b"]}), "ids").unwrap();
        assert_eq!(ids, vec!["a", "b"]);
        assert!(matches!(
            extract::<Vec<String>>(json!({}), "ids"),
            Err(PosError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_truncate_body() {
        let long = "é".repeat(MAX_ERROR_BODY);
        let truncated = truncate_body(long);
        assert!(truncated.ends_with("..."));
        assert!(truncated.len() <= MAX_ERROR_BODY + 3);
    }

    #[test]
    fn test_flatten_terminal_groups() {
        let buckets: Vec<TerminalGroupBucket> = serde_json::from_value(json!([
            {"organizationId": "org-1", "items": [{"id": "tg-1", "name": "Hall"}, {"id": "tg-2", "name": "Bar"}]},
            {"organizationId": "org-2", "items": []}
        ]))
        .unwrap();
        let flat = flatten_terminal_groups(buckets);
        assert_eq!(flat.len(), 2);
        assert_eq!(flat[1].0, "org-1");
        assert_eq!(flat[1].1.id, "tg-2");
    }
}
