//! User settings record (`aeryth_settings`)

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Assistant persona
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Tone {
    #[default]
    #[serde(rename = "Friend (Casual)")]
    Friend,
    #[serde(rename = "Coach (Motivational)")]
    Coach,
    #[serde(rename = "Sage (Wise)")]
    Sage,
    #[serde(rename = "Assistant (Formal)")]
    Assistant,
}

impl Tone {
    pub const ALL: [Tone; 4] = [Tone::Friend, Tone::Coach, Tone::Sage, Tone::Assistant];

    pub fn label(&self) -> &'static str {
        match self {
            Tone::Friend => "Friend (Casual)",
            Tone::Coach => "Coach (Motivational)",
            Tone::Sage => "Sage (Wise)",
            Tone::Assistant => "Assistant (Formal)",
        }
    }

    /// Short word used when describing the persona
    pub fn adjective(&self) -> &'static str {
        match self {
            Tone::Friend => "casual",
            Tone::Coach => "motivational",
            Tone::Sage => "reflective",
            Tone::Assistant => "formal",
        }
    }
}

impl std::fmt::Display for Tone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub occupation: String,
    #[serde(default)]
    pub goals: String,
}

/// The `aeryth_settings` field
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default)]
    pub aeryth_tone: Tone,
    #[serde(default)]
    pub user_info: UserInfo,
    #[serde(default)]
    pub routine_criteria: String,
    /// Keys written by other clients
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tone_wire_names() {
        assert_eq!(serde_json::to_value(Tone::Sage).unwrap(), json!("Sage (Wise)"));
        let tone: Tone = serde_json::from_value(json!("Coach (Motivational)")).unwrap();
        assert_eq!(tone, Tone::Coach);
        for tone in Tone::ALL {
            assert_eq!(serde_json::to_value(tone).unwrap(), json!(tone.label()));
        }
    }

    #[test]
    fn test_partial_settings() {
        let settings: Settings =
            serde_json::from_value(json!({"aerythTone": "Sage (Wise)"})).unwrap();
        assert_eq!(settings.aeryth_tone, Tone::Sage);
        assert!(settings.user_info.name.is_empty());
    }

    #[test]
    fn test_unknown_keys_preserved() {
        let raw = json!({
            "aerythTone": "Friend (Casual)",
            "userInfo": {"name": "Sam"},
            "routineCriteria": "mornings",
            "theme": "dark"
        });
        let settings: Settings = serde_json::from_value(raw).unwrap();
        assert_eq!(settings.extra["theme"], json!("dark"));
        let back = serde_json::to_value(&settings).unwrap();
        assert_eq!(back["theme"], json!("dark"));
        assert_eq!(back["userInfo"]["name"], json!("Sam"));
    }
}
