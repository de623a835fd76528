//! Outbound user notifications.

use axum::extract::State;
use axum::Json;
use domain::services::{ActivationNotice, NotificationResult};
use serde::Serialize;

use crate::app::AppState;

#[derive(Debug, Serialize)]
pub struct NotificationResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<NotificationResult> for NotificationResponse {
    fn from(result: NotificationResult) -> Self {
        match result {
            NotificationResult::Sent(message_id) => Self {
                status: "sent",
                message_id,
                error: None,
            },
            NotificationResult::Skipped => Self {
                status: "skipped",
                message_id: None,
                error: None,
            },
            NotificationResult::Failed(error) => Self {
                status: "failed",
                message_id: None,
                error: Some(error),
            },
        }
    }
}

/// POST /api/v1/notifications/activation
///
/// Always 200: delivery is best effort and the outcome is in the body.
pub async fn notify_activation(
    State(state): State<AppState>,
    Json(notice): Json<ActivationNotice>,
) -> Json<NotificationResponse> {
    Json(state.notifier.notify_activation(&notice).await.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_shapes() {
        let sent = serde_json::to_value(NotificationResponse::from(NotificationResult::Sent(
            Some(5),
        )))
        .unwrap();
        assert_eq!(sent["status"], "sent");
        assert_eq!(sent["message_id"], 5);

        let failed = serde_json::to_value(NotificationResponse::from(
            NotificationResult::Failed("blocked".to_string()),
        ))
        .unwrap();
        assert_eq!(failed["status"], "failed");
        assert_eq!(failed["error"], "blocked");
        assert!(failed.get("message_id").is_none());
    }
}
