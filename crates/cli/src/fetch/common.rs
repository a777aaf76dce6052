//! Shared HTTP plumbing for upstream API clients.
//!
//! - `FetchClient`: blocking HTTP client with status-code classification
//! - `resolve_api_key`: flag > env > error
//!
//! Requests are made exactly once. Any transport failure or non-2xx status
//! becomes a `CliError` carrying the matching exit code.

use std::time::Duration;

use crate::exit_codes;
use crate::CliError;

pub(super) const USER_AGENT: &str = concat!("stripe-csv/", env!("CARGO_PKG_VERSION"));
const TIMEOUT_SECS: u64 = 30;

// ── FetchClient ─────────────────────────────────────────────────────

/// Shared HTTP client that maps HTTP status codes to exit codes.
///
/// Clients own their API key, base URL, and auth method. They pass a
/// request-building closure to [`FetchClient::request`].
pub(super) struct FetchClient {
    http: reqwest::blocking::Client,
    source_name: String,
    error_extractor: fn(&serde_json::Value, u16) -> String,
}

impl FetchClient {
    pub(super) fn new(
        source_name: &str,
        error_extractor: fn(&serde_json::Value, u16) -> String,
    ) -> Result<Self, CliError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| CliError {
                code: exit_codes::EXIT_ERROR,
                message: format!("failed to build HTTP client: {}", e),
                hint: None,
            })?;

        Ok(Self {
            http,
            source_name: source_name.to_string(),
            error_extractor,
        })
    }

    /// Send one GET request and parse the JSON body.
    ///
    /// `build_request` receives the underlying `reqwest::blocking::Client`
    /// and must return a fully configured `RequestBuilder` (URL, auth,
    /// headers, query params).
    pub(super) fn request(
        &self,
        build_request: impl FnOnce(&reqwest::blocking::Client) -> reqwest::blocking::RequestBuilder,
    ) -> Result<serde_json::Value, CliError> {
        let resp = build_request(&self.http).send().map_err(|e| CliError {
            code: exit_codes::EXIT_FETCH_UPSTREAM,
            message: format!("{} request failed: {}", self.source_name, e),
            hint: None,
        })?;

        let status = resp.status().as_u16();
        if !(200..300).contains(&status) {
            let body = resp
                .text()
                .ok()
                .and_then(|text| serde_json::from_str(text.trim_start_matches('\u{feff}')).ok())
                .unwrap_or(serde_json::Value::Null);
            let msg = (self.error_extractor)(&body, status);
            return Err(self.status_error(status, msg));
        }

        let text = resp.text().map_err(|e| CliError {
            code: exit_codes::EXIT_FETCH_UPSTREAM,
            message: format!("failed to read {} response body: {}", self.source_name, e),
            hint: None,
        })?;
        let trimmed = text.trim_start_matches('\u{feff}');
        serde_json::from_str(trimmed).map_err(|e| CliError {
            code: exit_codes::EXIT_FETCH_UPSTREAM,
            message: format!(
                "failed to parse {} JSON response: {} (body: {})",
                self.source_name,
                e,
                truncate(trimmed, 200),
            ),
            hint: None,
        })
    }

    fn status_error(&self, status: u16, msg: String) -> CliError {
        match status {
            401 | 403 => CliError {
                code: exit_codes::EXIT_FETCH_AUTH,
                message: format!("{} auth failed ({}): {}", self.source_name, status, msg),
                hint: Some("check the API key passed with --api-key".into()),
            },
            400 => CliError {
                code: exit_codes::EXIT_FETCH_VALIDATION,
                message: format!("{} request rejected ({}): {}", self.source_name, status, msg),
                hint: None,
            },
            429 => CliError {
                code: exit_codes::EXIT_FETCH_UPSTREAM,
                message: format!("{} rate limited ({}): {}", self.source_name, status, msg),
                hint: Some("wait and re-run; requests are not retried".into()),
            },
            _ => CliError {
                code: exit_codes::EXIT_FETCH_UPSTREAM,
                message: format!("{} error ({}): {}", self.source_name, status, msg),
                hint: None,
            },
        }
    }
}

fn truncate(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

// ── Shared helpers ──────────────────────────────────────────────────

/// Resolve an API key: flag value > environment variable > error.
pub(crate) fn resolve_api_key(
    flag: Option<String>,
    source_name: &str,
    env_var: &str,
) -> Result<String, CliError> {
    let missing = || CliError {
        code: exit_codes::EXIT_FETCH_NOT_AUTH,
        message: format!(
            "missing {} API key (use --api-key or set {})",
            source_name, env_var,
        ),
        hint: None,
    };

    if let Some(key) = flag {
        let trimmed = key.trim().to_string();
        if trimmed.is_empty() {
            return Err(missing());
        }
        return Ok(trimmed);
    }

    match std::env::var(env_var) {
        Ok(key) if !key.trim().is_empty() => Ok(key.trim().to_string()),
        _ => Err(missing()),
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn extract(body: &serde_json::Value, status: u16) -> String {
        body["message"]
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| format!("HTTP {}", status))
    }

    #[test]
    fn test_resolve_api_key_flag_priority() {
        let key = resolve_api_key(Some("  token_123  ".into()), "Test", "TEST_KEY").unwrap();
        assert_eq!(key, "token_123");
    }

    #[test]
    fn test_resolve_api_key_empty_flag() {
        let err = resolve_api_key(Some("  ".into()), "Test", "TEST_KEY").unwrap_err();
        assert_eq!(err.code, exit_codes::EXIT_FETCH_NOT_AUTH);
        assert!(err.message.contains("missing Test API key"));
    }

    #[test]
    fn test_resolve_api_key_from_env() {
        std::env::set_var("__STRIPE_CSV_TEST_KEY_SET", " sk_env ");
        let key = resolve_api_key(None, "Test", "__STRIPE_CSV_TEST_KEY_SET").unwrap();
        assert_eq!(key, "sk_env");
    }

    #[test]
    fn test_resolve_api_key_missing() {
        std::env::remove_var("__STRIPE_CSV_TEST_KEY_MISSING");
        let err = resolve_api_key(None, "Test", "__STRIPE_CSV_TEST_KEY_MISSING").unwrap_err();
        assert_eq!(err.code, exit_codes::EXIT_FETCH_NOT_AUTH);
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "hé");
        assert_eq!(truncate("abc", 10), "abc");
    }

    #[test]
    fn test_status_classification() {
        let server = MockServer::start();
        let cases = [
            ("/auth", 401, exit_codes::EXIT_FETCH_AUTH),
            ("/forbidden", 403, exit_codes::EXIT_FETCH_AUTH),
            ("/bad", 400, exit_codes::EXIT_FETCH_VALIDATION),
            ("/missing", 404, exit_codes::EXIT_FETCH_UPSTREAM),
            ("/limit", 429, exit_codes::EXIT_FETCH_UPSTREAM),
            ("/down", 503, exit_codes::EXIT_FETCH_UPSTREAM),
        ];
        for (path, status, _) in &cases {
            server.mock(|when, then| {
                when.method(GET).path(*path);
                then.status(*status)
                    .json_body(serde_json::json!({ "message": "nope" }));
            });
        }

        let client = FetchClient::new("Test", extract).unwrap();
        for (path, status, code) in cases {
            let url = server.url(path);
            let err = client.request(|http| http.get(&url)).unwrap_err();
            assert_eq!(err.code, code, "status {}", status);
            assert!(err.message.contains("nope"), "message: {}", err.message);
        }
    }

    #[test]
    fn test_no_retry_on_server_error() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/flaky");
            then.status(500);
        });

        let client = FetchClient::new("Test", extract).unwrap();
        let url = server.url("/flaky");
        let err = client.request(|http| http.get(&url)).unwrap_err();
        assert_eq!(err.code, exit_codes::EXIT_FETCH_UPSTREAM);
        assert!(err.message.contains("HTTP 500"), "message: {}", err.message);
        mock.assert_calls(1);
    }

    #[test]
    fn test_error_body_decoding() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/bom");
            then.status(400)
                .header("content-type", "application/json")
                .body("\u{feff}{\"message\": \"bad currency\"}");
        });
        server.mock(|when, then| {
            when.method(GET).path("/gateway");
            then.status(502).body("<html>Bad Gateway</html>");
        });

        let client = FetchClient::new("Test", extract).unwrap();

        let url = server.url("/bom");
        let err = client.request(|http| http.get(&url)).unwrap_err();
        assert_eq!(err.code, exit_codes::EXIT_FETCH_VALIDATION);
        assert!(err.message.contains("bad currency"), "message: {}", err.message);

        // Non-JSON error pages fall back to the status line
        let url = server.url("/gateway");
        let err = client.request(|http| http.get(&url)).unwrap_err();
        assert_eq!(err.code, exit_codes::EXIT_FETCH_UPSTREAM);
        assert!(err.message.contains("HTTP 502"), "message: {}", err.message);
    }

    #[test]
    fn test_invalid_json_body() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/html");
            then.status(200).body("<html>maintenance</html>");
        });

        let client = FetchClient::new("Test", extract).unwrap();
        let url = server.url("/html");
        let err = client.request(|http| http.get(&url)).unwrap_err();
        assert_eq!(err.code, exit_codes::EXIT_FETCH_UPSTREAM);
        assert!(err.message.contains("failed to parse Test JSON"), "message: {}", err.message);
    }

    #[test]
    fn test_network_failure() {
        // Nothing listens on port 9 (discard) in test environments
        let client = FetchClient::new("Test", extract).unwrap();
        let err = client
            .request(|http| http.get("http://127.0.0.1:9/unreachable"))
            .unwrap_err();
        assert_eq!(err.code, exit_codes::EXIT_FETCH_UPSTREAM);
        assert!(err.message.contains("Test request failed"), "message: {}", err.message);
    }
}
