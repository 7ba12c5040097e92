use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::document::{path, KeyPath};

/// Leaves of the settings document that are stored encrypted
pub const SENSITIVE_PATHS: &[&str] = &["openai.apiKey", "anthropic.apiKey"];

/// Placeholder shown instead of a secret
pub const REDACTED: &str = "********";

/// Application settings as persisted in `settings.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default = "ProviderSettings::openai")]
    pub openai: ProviderSettings,
    #[serde(default = "ProviderSettings::anthropic")]
    pub anthropic: ProviderSettings,
    #[serde(default)]
    pub general: GeneralSettings,
}

/// Credentials and endpoint for one model provider
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderSettings {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub base_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
}

impl ProviderSettings {
    pub fn openai() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.openai.com/v1".to_string(),
            default_model: None,
        }
    }

    pub fn anthropic() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.anthropic.com".to_string(),
            default_model: None,
        }
    }

    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneralSettings {
    #[serde(default = "default_theme")]
    pub theme: String,
    #[serde(default = "default_send_on_enter")]
    pub send_on_enter: bool,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            theme: default_theme(),
            send_on_enter: default_send_on_enter(),
        }
    }
}

fn default_theme() -> String {
    "system".to_string()
}

fn default_send_on_enter() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            openai: ProviderSettings::openai(),
            anthropic: ProviderSettings::anthropic(),
            general: GeneralSettings::default(),
        }
    }
}

/// The document a fresh install starts from
pub fn default_document() -> Value {
    serde_json::to_value(Settings::default()).unwrap_or_else(|_| Value::Object(Default::default()))
}

/// Copy every key of `defaults` missing from `doc`, recursing into objects
/// present on both sides. Existing values are never overwritten.
pub fn fill_defaults(doc: &mut Value, defaults: &Value) {
    if let (Value::Object(target), Value::Object(source)) = (doc, defaults) {
        for (key, default) in source {
            match target.get_mut(key) {
                Some(existing) => fill_defaults(existing, default),
                None => {
                    target.insert(key.clone(), default.clone());
                }
            }
        }
    }
}

/// Replace every non-empty secret with [`REDACTED`] for display
pub fn redact(doc: &mut Value) {
    for raw in SENSITIVE_PATHS {
        let Ok(key_path) = KeyPath::parse(raw) else {
            continue;
        };
        if let Some(Value::String(secret)) = path::get_mut(doc, &key_path) {
            if !secret.is_empty() {
                *secret = REDACTED.to_string();
            }
        }
    }
}
