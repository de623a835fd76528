//! Multilingual display text.

use serde::{Deserialize, Serialize};

/// Display text in the three menu locales.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalizedText {
    pub uz: String,
    pub ru: String,
    pub en: String,
}

impl LocalizedText {
    /// Same text in every locale. The POS feed carries a single name, so this
    /// is how synced records are populated.
    pub fn uniform(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            uz: text.clone(),
            ru: text.clone(),
            en: text,
        }
    }

    /// Pick the text for a language code, falling back to Russian.
    pub fn get(&self, lang: &str) -> &str {
        match lang {
            "uz" => &self.uz,
            "en" => &self.en,
            _ => &self.ru,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_fills_every_locale() {
        let text = LocalizedText::uniform("Pizza");
        assert_eq!(text.uz, "Pizza");
        assert_eq!(text.ru, "Pizza");
        assert_eq!(text.en, "Pizza");
    }

    #[test]
    fn test_get_falls_back_to_russian() {
        let text = LocalizedText {
            uz: "Osh".to_string(),
            ru: "Плов".to_string(),
            en: "Pilaf".to_string(),
        };
        assert_eq!(text.get("uz"), "Osh");
        assert_eq!(text.get("en"), "Pilaf");
        assert_eq!(text.get("de"), "Плов");
    }
}
