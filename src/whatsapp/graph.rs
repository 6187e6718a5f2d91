//! Graph API token endpoints
//! Mission: Introspect and exchange the WhatsApp Cloud API access token

use crate::whatsapp::errors::TokenManagerError;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Result of a token introspection. `expires_at == None` means the provider
/// reports the token as permanent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Introspection {
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangedToken {
    pub access_token: String,
    pub expires_in: Option<Duration>,
}

/// The two third-party calls the lifecycle manager depends on
#[async_trait]
pub trait TokenEndpoint: Send + Sync {
    /// Fails with [`TokenManagerError::Invalid`] when the provider says the
    /// token is no longer valid.
    async fn introspect(&self, token: &str) -> Result<Introspection, TokenManagerError>;

    /// Trade `token` for a refreshed long-lived one
    async fn exchange(&self, token: &str) -> Result<ExchangedToken, TokenManagerError>;
}

#[derive(Debug, Deserialize)]
struct DebugTokenResponse {
    data: DebugTokenData,
}

#[derive(Debug, Deserialize)]
struct DebugTokenData {
    #[serde(default)]
    is_valid: bool,
    #[serde(default)]
    expires_at: i64,
}

#[derive(Debug, Deserialize)]
struct ExchangeResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// reqwest client for `debug_token` and `oauth/access_token`
pub struct GraphTokenClient {
    http: reqwest::Client,
    api_url: String,
    app_id: String,
    app_secret: String,
}

impl GraphTokenClient {
    pub fn new(api_url: &str, app_id: &str, app_secret: &str) -> Result<Self, TokenManagerError> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
            app_id: app_id.to_string(),
            app_secret: app_secret.to_string(),
        })
    }

    fn app_access_token(&self) -> String {
        format!("{}|{}", self.app_id, self.app_secret)
    }
}

#[async_trait]
impl TokenEndpoint for GraphTokenClient {
    async fn introspect(&self, token: &str) -> Result<Introspection, TokenManagerError> {
        let app_token = self.app_access_token();
        let resp = self
            .http
            .get(format!("{}/debug_token", self.api_url))
            .query(&[("input_token", token), ("access_token", app_token.as_str())])
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(TokenManagerError::UnexpectedResponse(format!(
                "debug_token returned {status}: {body}"
            )));
        }

        let parsed: DebugTokenResponse = serde_json::from_str(&body)
            .map_err(|e| TokenManagerError::UnexpectedResponse(format!("debug_token: {e}")))?;

        if !parsed.data.is_valid {
            return Err(TokenManagerError::Invalid);
        }

        let expires_at = if parsed.data.expires_at > 0 {
            let at = Utc
                .timestamp_opt(parsed.data.expires_at, 0)
                .single()
                .ok_or_else(|| {
                    TokenManagerError::UnexpectedResponse(format!(
                        "expires_at out of range: {}",
                        parsed.data.expires_at
                    ))
                })?;
            Some(at)
        } else {
            None
        };

        debug!(?expires_at, "Introspected WhatsApp token");
        Ok(Introspection { expires_at })
    }

    async fn exchange(&self, token: &str) -> Result<ExchangedToken, TokenManagerError> {
        let resp = self
            .http
            .get(format!("{}/oauth/access_token", self.api_url))
            .query(&[
                ("grant_type", "fb_exchange_token"),
                ("client_id", self.app_id.as_str()),
                ("client_secret", self.app_secret.as_str()),
                ("fb_exchange_token", token),
            ])
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(TokenManagerError::ExchangeFailed(format!(
                "status {status}: {body}"
            )));
        }

        let parsed: ExchangeResponse = serde_json::from_str(&body)
            .map_err(|e| TokenManagerError::UnexpectedResponse(format!("oauth/access_token: {e}")))?;

        let access_token = parsed
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                TokenManagerError::ExchangeFailed(format!("no access token in response: {body}"))
            })?;

        let expires_in = parsed
            .expires_in
            .filter(|secs| *secs > 0)
            .map(|secs| Duration::from_secs(secs.unsigned_abs()));

        Ok(ExchangedToken {
            access_token,
            expires_in,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use serde_json::json;

    fn client(server: &Server) -> GraphTokenClient {
        GraphTokenClient::new(&server.url(), "app-123", "shh").unwrap()
    }

    #[tokio::test]
    async fn test_introspect_reports_expiry() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/debug_token")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("input_token".into(), "EAAG-seed".into()),
                Matcher::UrlEncoded("access_token".into(), "app-123|shh".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({"data": {"is_valid": true, "expires_at": 1_900_000_000, "app_id": "app-123"}})
                    .to_string(),
            )
            .create_async()
            .await;

        let info = client(&server).introspect("EAAG-seed").await.unwrap();
        assert_eq!(info.expires_at, Utc.timestamp_opt(1_900_000_000, 0).single());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_introspect_permanent_token() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/debug_token")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(json!({"data": {"is_valid": true, "expires_at": 0}}).to_string())
            .create_async()
            .await;

        let info = client(&server).introspect("EAAG-system").await.unwrap();
        assert_eq!(info.expires_at, None);
    }

    #[tokio::test]
    async fn test_introspect_invalid_token() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/debug_token")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(json!({"data": {"is_valid": false}}).to_string())
            .create_async()
            .await;

        let err = client(&server).introspect("EAAG-dead").await.unwrap_err();
        assert!(matches!(err, TokenManagerError::Invalid));
    }

    #[tokio::test]
    async fn test_introspect_error_status() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/debug_token")
            .match_query(Matcher::Any)
            .with_status(400)
            .with_body(r#"{"error":{"message":"bad"}}"#)
            .create_async()
            .await;

        let err = client(&server).introspect("EAAG-seed").await.unwrap_err();
        assert!(matches!(err, TokenManagerError::UnexpectedResponse(_)));
    }

    #[tokio::test]
    async fn test_exchange_returns_new_token() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/oauth/access_token")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("grant_type".into(), "fb_exchange_token".into()),
                Matcher::UrlEncoded("client_id".into(), "app-123".into()),
                Matcher::UrlEncoded("client_secret".into(), "shh".into()),
                Matcher::UrlEncoded("fb_exchange_token".into(), "EAAG-old".into()),
            ]))
            .with_status(200)
            .with_body(
                json!({"access_token": "EAAG-new", "token_type": "bearer", "expires_in": 5_184_000})
                    .to_string(),
            )
            .create_async()
            .await;

        let exchanged = client(&server).exchange("EAAG-old").await.unwrap();
        assert_eq!(exchanged.access_token, "EAAG-new");
        assert_eq!(exchanged.expires_in, Some(Duration::from_secs(5_184_000)));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_transport_errors_do_not_leak_app_secret() {
        // Nothing listens on port 1
        let client = GraphTokenClient::new("http://127.0.0.1:1", "app-123", "TOP-SECRET").unwrap();

        let err = client.exchange("EAAG-old").await.unwrap_err();
        assert!(matches!(err, TokenManagerError::Transport(_)));
        assert!(!err.to_string().contains("TOP-SECRET"));
        assert!(!format!("{err:?}").contains("TOP-SECRET"));

        let err = client.introspect("EAAG-old").await.unwrap_err();
        assert!(matches!(err, TokenManagerError::Transport(_)));
        assert!(!err.to_string().contains("TOP-SECRET"));
        assert!(!format!("{err:?}").contains("TOP-SECRET"));
    }

    #[tokio::test]
    async fn test_exchange_without_token_fails() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/oauth/access_token")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(json!({"token_type": "bearer"}).to_string())
            .create_async()
            .await;

        let err = client(&server).exchange("EAAG-old").await.unwrap_err();
        assert!(matches!(err, TokenManagerError::ExchangeFailed(_)));
    }
}
