//! WhatsApp Cloud API messaging
//! Mission: Send text messages with whatever token the manager currently holds

use crate::config::WhatsAppConfig;
use crate::whatsapp::errors::WhatsAppError;
use crate::whatsapp::token_manager::TokenManager;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, instrument};

const SEND_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Serialize)]
struct TextMessagePayload<'a> {
    messaging_product: &'static str,
    to: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    text: TextBody<'a>,
}

#[derive(Debug, Serialize)]
struct TextBody<'a> {
    body: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct SendResponse {
    #[serde(default)]
    messages: Vec<SentMessage>,
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MessageReceipt {
    pub success: bool,
    pub message_id: String,
    pub to: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub sent_at: DateTime<Utc>,
}

pub struct WhatsAppClient {
    http: reqwest::Client,
    messages_url: String,
    tokens: Arc<TokenManager>,
}

impl WhatsAppClient {
    pub fn new(config: &WhatsAppConfig, tokens: Arc<TokenManager>) -> Result<Self, WhatsAppError> {
        let http = reqwest::Client::builder().timeout(SEND_TIMEOUT).build()?;
        Ok(Self {
            http,
            messages_url: format!(
                "{}/{}/{}/messages",
                config.api_url.trim_end_matches('/'),
                config.api_version,
                config.phone_number_id
            ),
            tokens,
        })
    }

    pub fn tokens(&self) -> &Arc<TokenManager> {
        &self.tokens
    }

    #[instrument(skip(self, body), fields(to = %to, message_length = body.len()))]
    pub async fn send_text_message(
        &self,
        to: &str,
        body: &str,
    ) -> Result<MessageReceipt, WhatsAppError> {
        if to.trim().is_empty() {
            return Err(WhatsAppError::Invalid("recipient is required"));
        }
        if body.trim().is_empty() {
            return Err(WhatsAppError::Invalid("message body is required"));
        }

        let payload = TextMessagePayload {
            messaging_product: "whatsapp",
            to,
            kind: "text",
            text: TextBody { body },
        };

        let resp = self
            .http
            .post(&self.messages_url)
            .bearer_auth(self.tokens.get_token())
            .json(&payload)
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            error!(status = status.as_u16(), response = %text, "WhatsApp API returned error");
            return Err(WhatsAppError::Api {
                status: status.as_u16(),
                body: text,
            });
        }

        let parsed: SendResponse = serde_json::from_str(&text).unwrap_or_default();
        let message_id = parsed
            .messages
            .into_iter()
            .next()
            .map(|m| m.id)
            .unwrap_or_default();

        info!(message_id = %message_id, "WhatsApp message sent");

        Ok(MessageReceipt {
            success: true,
            message_id,
            to: to.to_string(),
            kind: "text".to_string(),
            sent_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::whatsapp::graph::GraphTokenClient;
    use crate::whatsapp::token_manager::TokenManagerSettings;
    use mockito::{Matcher, Server};
    use serde_json::json;

    fn config(api_url: &str) -> WhatsAppConfig {
        WhatsAppConfig {
            access_token: "EAAG-seed".to_string(),
            phone_number_id: "1234567890".to_string(),
            business_id: None,
            api_version: "v18.0".to_string(),
            api_url: api_url.to_string(),
            app_id: "app".to_string(),
            app_secret: "shh".to_string(),
            token_check_interval: Duration::from_secs(6 * 3600),
            token_refresh_margin: Duration::from_secs(7 * 24 * 3600),
        }
    }

    fn client(server: &Server) -> WhatsAppClient {
        let endpoint = GraphTokenClient::new(&server.url(), "app", "shh").unwrap();
        let tokens = Arc::new(TokenManager::new(
            "EAAG-seed",
            Arc::new(endpoint),
            TokenManagerSettings::default(),
        ));
        WhatsAppClient::new(&config(&server.url()), tokens).unwrap()
    }

    #[tokio::test]
    async fn test_send_text_message() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/v18.0/1234567890/messages")
            .match_header("authorization", "Bearer EAAG-seed")
            .match_body(Matcher::Json(json!({
                "messaging_product": "whatsapp",
                "to": "5511999990000",
                "type": "text",
                "text": {"body": "Your turn is next"}
            })))
            .with_status(200)
            .with_body(
                json!({
                    "messaging_product": "whatsapp",
                    "contacts": [{"input": "5511999990000", "wa_id": "5511999990000"}],
                    "messages": [{"id": "wamid.HBgM"}]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let receipt = client(&server)
            .send_text_message("5511999990000", "Your turn is next")
            .await
            .unwrap();

        assert!(receipt.success);
        assert_eq!(receipt.message_id, "wamid.HBgM");
        assert_eq!(receipt.kind, "text");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_api_error_is_surfaced() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/v18.0/1234567890/messages")
            .with_status(401)
            .with_body(r#"{"error":{"message":"Invalid OAuth access token"}}"#)
            .create_async()
            .await;

        let err = client(&server)
            .send_text_message("5511999990000", "hi")
            .await
            .unwrap_err();
        assert!(matches!(err, WhatsAppError::Api { status: 401, .. }));
    }

    #[tokio::test]
    async fn test_empty_message_rejected() {
        let server = Server::new_async().await;
        let err = client(&server)
            .send_text_message("5511999990000", "  ")
            .await
            .unwrap_err();
        assert!(matches!(err, WhatsAppError::Invalid(_)));
    }
}
