//! WhatsApp Module
//! Mission: Cloud API messaging with a self-renewing access token

pub mod api;
pub mod client;
pub mod errors;
pub mod graph;
pub mod token_manager;

pub use client::{MessageReceipt, WhatsAppClient};
pub use errors::{TokenManagerError, WhatsAppError};
pub use graph::{GraphTokenClient, TokenEndpoint};
pub use token_manager::{TokenInfo, TokenManager, TokenManagerSettings};
