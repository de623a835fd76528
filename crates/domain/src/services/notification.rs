//! Notification sink for customer-facing messages.
//!
//! One-way: callers fire a notification and never fail because of it.

use serde::{Deserialize, Serialize};

use crate::models::LocalizedText;

/// Language of a notification recipient.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Uz,
    #[default]
    Ru,
    En,
}

impl Language {
    pub fn code(&self) -> &'static str {
        match self {
            Language::Uz => "uz",
            Language::Ru => "ru",
            Language::En => "en",
        }
    }
}

/// Request to tell a user their account was activated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivationNotice {
    /// Messenger chat id of the recipient.
    pub chat_id: String,
    #[serde(default)]
    pub language: Language,
}

impl ActivationNotice {
    pub fn text(&self) -> &'static str {
        activation_text(self.language)
    }
}

fn activation_text(language: Language) -> &'static str {
    match language {
        Language::Uz => {
            "Sizning hisobingiz faollashtirildi! \nEndi buyurtma berishingiz mumkin. \n/start ni bosing."
        }
        Language::Ru => {
            "Ваш аккаунт активирован! \nТеперь вы можете делать заказы. \nНажмите /start."
        }
        Language::En => "Your account has been activated! \nYou can now place orders. \nPress /start.",
    }
}

/// All activation texts, keyed by locale.
pub fn activation_texts() -> LocalizedText {
    LocalizedText {
        uz: activation_text(Language::Uz).to_string(),
        ru: activation_text(Language::Ru).to_string(),
        en: activation_text(Language::En).to_string(),
    }
}

/// Result of a notification send attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum NotificationResult {
    /// Delivered; carries the message id when the channel returns one.
    Sent(Option<i64>),
    /// Sink is not configured.
    Skipped,
    /// Sending failed (but was non-blocking).
    Failed(String),
}

/// Outbound notification sink.
#[async_trait::async_trait]
pub trait ActivationNotifier: Send + Sync {
    async fn notify_activation(&self, notice: &ActivationNotice) -> NotificationResult;
}

/// Mock notifier for development and testing.
///
/// Logs notifications but doesn't actually send them.
#[derive(Debug, Clone, Default)]
pub struct MockActivationNotifier {
    /// Whether to simulate failures for testing.
    pub simulate_failure: bool,
}

impl MockActivationNotifier {
    pub fn new() -> Self {
        Self {
            simulate_failure: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            simulate_failure: true,
        }
    }
}

#[async_trait::async_trait]
impl ActivationNotifier for MockActivationNotifier {
    async fn notify_activation(&self, notice: &ActivationNotice) -> NotificationResult {
        if self.simulate_failure {
            tracing::warn!(
                chat_id = %notice.chat_id,
                "Mock notifier simulating failure"
            );
            return NotificationResult::Failed("Simulated failure".to_string());
        }

        tracing::info!(
            chat_id = %notice.chat_id,
            language = notice.language.code(),
            "Mock: Would send activation notification"
        );
        NotificationResult::Sent(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_activation_text_per_language() {
        let notice = ActivationNotice {
            chat_id: "1".to_string(),
            language: Language::En,
        };
        assert!(notice.text().starts_with("Your account has been activated"));
        assert!(activation_texts().ru.contains("активирован"));
    }

    #[test]
    fn test_language_defaults_to_russian() {
        let notice: ActivationNotice = serde_json::from_str(r#"{"chat_id": "42"}"#).unwrap();
        assert_eq!(notice.language, Language::Ru);
    }

    #[tokio::test]
    async fn test_mock_notifier_send() {
        let notifier = MockActivationNotifier::new();
        let notice = ActivationNotice {
            chat_id: "42".to_string(),
            language: Language::Uz,
        };
        assert_eq!(
            notifier.notify_activation(&notice).await,
            NotificationResult::Sent(None)
        );
    }

    #[tokio::test]
    async fn test_mock_notifier_failure() {
        let notifier = MockActivationNotifier::failing();
        let notice = ActivationNotice {
            chat_id: "42".to_string(),
            language: Language::Ru,
        };
        assert!(matches!(
            notifier.notify_activation(&notice).await,
            NotificationResult::Failed(_)
        ));
    }
}
