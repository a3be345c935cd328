use std::time::Duration;

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::Deserialize;

use crate::error::FlagsError;
use crate::flag::ApiResponse;

pub const DEFAULT_BASE_URL: &str = "https://api.flags.gg";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

const USER_AGENT: &str = "Flags-Rust";

/// Identity sent with every request to the flags API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Auth {
    #[serde(default)]
    pub project_id: String,
    #[serde(default)]
    pub agent_id: String,
    #[serde(default)]
    pub environment_id: String,
}

impl Auth {
    pub fn new(project_id: &str, agent_id: &str, environment_id: &str) -> Self {
        Self {
            project_id: project_id.to_string(),
            agent_id: agent_id.to_string(),
            environment_id: environment_id.to_string(),
        }
    }

    /// Fails on the first empty identifier.
    pub fn validate(&self) -> Result<(), FlagsError> {
        if self.project_id.is_empty() {
            return Err(FlagsError::AuthConfiguration("project ID"));
        }
        if self.agent_id.is_empty() {
            return Err(FlagsError::AuthConfiguration("agent ID"));
        }
        if self.environment_id.is_empty() {
            return Err(FlagsError::AuthConfiguration("environment ID"));
        }
        Ok(())
    }
}

/// Somewhere the current flag set can be fetched from.
pub trait FlagSource: Send + Sync {
    fn fetch(&self) -> Result<ApiResponse, FlagsError>;
}

/// Fetches flags from the flags API over blocking HTTP.
pub struct RemoteFetcher {
    base_url: String,
    auth: Auth,
    http: reqwest::blocking::Client,
}

impl RemoteFetcher {
    pub fn new(base_url: &str, auth: Auth, timeout: Duration) -> Result<Self, FlagsError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            auth,
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn flags_url(&self) -> String {
        format!("{}/flags", self.base_url)
    }
}

impl FlagSource for RemoteFetcher {
    fn fetch(&self) -> Result<ApiResponse, FlagsError> {
        self.auth.validate()?;

        let response = self
            .http
            .get(self.flags_url())
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json")
            .header("X-Project-ID", &self.auth.project_id)
            .header("X-Agent-ID", &self.auth.agent_id)
            .header("X-Environment-ID", &self.auth.environment_id)
            .send()?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(FlagsError::UnexpectedStatus(status.as_u16()));
        }

        let body = response.text()?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth() -> Auth {
        Auth::new("test-project", "test-agent", "test-environment")
    }

    #[test]
    fn test_missing_credentials() {
        let cases = [
            (Auth::new("", "a", "e"), "project ID"),
            (Auth::new("p", "", "e"), "agent ID"),
            (Auth::new("p", "a", ""), "environment ID"),
        ];
        for (auth, field) in cases {
            match auth.validate() {
                Err(FlagsError::AuthConfiguration(f)) => assert_eq!(f, field),
                other => panic!("expected auth error for {}, got {:?}", field, other),
            }
        }
        assert!(auth().validate().is_ok());
    }

    #[test]
    fn test_auth_checked_before_request() {
        let mut server = mockito::Server::new();
        let mock = server.mock("GET", "/flags").expect(0).create();

        let fetcher =
            RemoteFetcher::new(&server.url(), Auth::default(), DEFAULT_REQUEST_TIMEOUT).unwrap();
        let err = fetcher.fetch().unwrap_err();
        assert!(err.is_auth());
        mock.assert();
    }

    #[test]
    fn test_fetch_sends_identity_headers() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/flags")
            .match_header("x-project-id", "test-project")
            .match_header("x-agent-id", "test-agent")
            .match_header("x-environment-id", "test-environment")
            .match_header("accept", "application/json")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"intervalAllowed": 30, "flags": [{"enabled": true, "details": {"name": "a", "id": "1"}}]}"#,
            )
            .create();

        let url = format!("{}/", server.url());
        let fetcher = RemoteFetcher::new(&url, auth(), DEFAULT_REQUEST_TIMEOUT).unwrap();
        let resp = fetcher.fetch().unwrap();
        assert_eq!(resp.interval_allowed, 30);
        assert_eq!(resp.flags[0].name(), "a");
        mock.assert();
    }

    #[test]
    fn test_non_200_status() {
        let mut server = mockito::Server::new();
        let _mock = server.mock("GET", "/flags").with_status(503).create();

        let fetcher = RemoteFetcher::new(&server.url(), auth(), DEFAULT_REQUEST_TIMEOUT).unwrap();
        assert!(matches!(
            fetcher.fetch(),
            Err(FlagsError::UnexpectedStatus(503))
        ));
    }

    #[test]
    fn test_malformed_body() {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("GET", "/flags")
            .with_status(200)
            .with_body("not json")
            .create();

        let fetcher = RemoteFetcher::new(&server.url(), auth(), DEFAULT_REQUEST_TIMEOUT).unwrap();
        assert!(matches!(fetcher.fetch(), Err(FlagsError::Decode(_))));
    }

    #[test]
    fn test_connection_refused() {
        let fetcher = RemoteFetcher::new(
            "http://127.0.0.1:1",
            auth(),
            Duration::from_millis(500),
        )
        .unwrap();
        assert!(matches!(fetcher.fetch(), Err(FlagsError::Transport(_))));
    }
}
