use thiserror::Error;

/// Failures of the external token lifecycle. Inside the refresh loop these
/// are logged and retried on the next tick; they never reach `get_token`.
#[derive(Debug, Error)]
pub enum TokenManagerError {
    #[error("external token is invalid")]
    Invalid,
    #[error("token exchange failed: {0}")]
    ExchangeFailed(String),
    #[error("token endpoint request failed: {0}")]
    Transport(reqwest::Error),
    #[error("unexpected token endpoint response: {0}")]
    UnexpectedResponse(String),
    #[error("token manager already started")]
    AlreadyStarted,
    #[error("token manager has been stopped")]
    Stopped,
}

impl From<reqwest::Error> for TokenManagerError {
    /// Token endpoint URLs carry the app secret in their query string, so
    /// the URL is stripped before the error can reach a log line.
    fn from(err: reqwest::Error) -> Self {
        TokenManagerError::Transport(err.without_url())
    }
}

/// Message sending failures
#[derive(Debug, Error)]
pub enum WhatsAppError {
    #[error("{0}")]
    Invalid(&'static str),
    #[error("WhatsApp API returned status {status}: {body}")]
    Api { status: u16, body: String },
    #[error("WhatsApp request failed: {0}")]
    Transport(#[from] reqwest::Error),
}
