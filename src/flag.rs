use serde::{Deserialize, Serialize};

/// Descriptive part of a flag as sent by the flags API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Details {
    pub name: String,
    #[serde(default)]
    pub id: String,
}

/// A single named boolean toggle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureFlag {
    pub enabled: bool,
    pub details: Details,
}

impl FeatureFlag {
    pub fn new(name: &str, enabled: bool) -> Self {
        Self {
            enabled,
            details: Details {
                name: name.to_string(),
                id: String::new(),
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.details.name
    }
}

/// Body of a `GET /flags` response. Fields not listed here are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiResponse {
    #[serde(rename = "intervalAllowed")]
    pub interval_allowed: i64,
    #[serde(default)]
    pub flags: Vec<FeatureFlag>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_api_response_ignores_secret_menu() {
        let body = r#"{
            "intervalAllowed": 60,
            "secretMenu": {"sequence": ["b","b","b"]},
            "flags": [
                {"enabled": true, "details": {"name": "enabled-flag", "id": "1"}},
                {"enabled": false, "details": {"name": "disabled-flag"}}
            ]
        }"#;
        let resp: ApiResponse = serde_json::from_str(body).unwrap();
        assert_eq!(resp.interval_allowed, 60);
        assert_eq!(resp.flags.len(), 2);
        assert_eq!(resp.flags[0].name(), "enabled-flag");
        assert_eq!(resp.flags[0].details.id, "1");
        assert!(resp.flags[0].enabled);
        assert_eq!(resp.flags[1].details.id, "");
        assert!(!resp.flags[1].enabled);
    }

    #[test]
    fn test_decode_rejects_missing_interval() {
        let body = r#"{"flags": []}"#;
        assert!(serde_json::from_str::<ApiResponse>(body).is_err());
    }
}
