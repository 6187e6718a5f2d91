//! Runtime configuration
//!
//! Everything is read from the environment (optionally seeded from a `.env`
//! file). Durations use humantime syntax: `15m`, `168h`, `7days`.

use anyhow::{bail, Context, Result};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_path: String,
    pub bcrypt_cost: u32,
    pub jwt: JwtConfig,
    pub admin_seed: Option<AdminSeed>,
    pub whatsapp: Option<WhatsAppConfig>,
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,
}

/// Bootstrap administrator created on startup when absent
#[derive(Debug, Clone)]
pub struct AdminSeed {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct WhatsAppConfig {
    pub access_token: String,
    pub phone_number_id: String,
    pub business_id: Option<String>,
    pub api_version: String,
    pub api_url: String,
    pub app_id: String,
    pub app_secret: String,
    pub token_check_interval: Duration,
    pub token_refresh_margin: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = match get("PORT") {
            Some(raw) => raw.parse().with_context(|| format!("invalid PORT: {raw}"))?,
            None => 8080,
        };

        let database_path = get("DATABASE_PATH").unwrap_or_else(|| "./easyqueue.db".to_string());

        let bcrypt_cost = match get("BCRYPT_COST") {
            Some(raw) => {
                let cost: u32 = raw
                    .parse()
                    .with_context(|| format!("invalid BCRYPT_COST: {raw}"))?;
                if !(4..=31).contains(&cost) {
                    bail!("BCRYPT_COST must be between 4 and 31, got {cost}");
                }
                cost
            }
            None => bcrypt::DEFAULT_COST,
        };

        let jwt = JwtConfig {
            secret: get("JWT_SECRET").context("JWT_SECRET environment variable is required")?,
            access_token_ttl: duration_var(&get, "JWT_ACCESS_TOKEN_TTL", "15m")?,
            refresh_token_ttl: duration_var(&get, "JWT_REFRESH_TOKEN_TTL", "168h")?,
        };

        let admin_seed = match (get("ADMIN_EMAIL"), get("ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(AdminSeed { email, password }),
            (None, None) => None,
            _ => bail!("ADMIN_EMAIL and ADMIN_PASSWORD must be set together"),
        };

        let whatsapp = match get("WHATSAPP_ACCESS_TOKEN") {
            Some(access_token) => Some(WhatsAppConfig {
                access_token,
                phone_number_id: get("WHATSAPP_PHONE_NUMBER_ID")
                    .context("WHATSAPP_PHONE_NUMBER_ID is required when WhatsApp is enabled")?,
                business_id: get("WHATSAPP_BUSINESS_ID"),
                api_version: get("WHATSAPP_API_VERSION").unwrap_or_else(|| "v18.0".to_string()),
                api_url: get("WHATSAPP_API_URL")
                    .unwrap_or_else(|| "https://graph.facebook.com".to_string())
                    .trim_end_matches('/')
                    .to_string(),
                app_id: get("WHATSAPP_APP_ID").unwrap_or_default(),
                app_secret: get("WHATSAPP_APP_SECRET").unwrap_or_default(),
                token_check_interval: duration_var(&get, "WHATSAPP_TOKEN_CHECK_INTERVAL", "6h")?,
                token_refresh_margin: duration_var(&get, "WHATSAPP_TOKEN_REFRESH_MARGIN", "7days")?,
            }),
            None => None,
        };

        Ok(Self {
            port,
            database_path,
            bcrypt_cost,
            jwt,
            admin_seed,
            whatsapp,
        })
    }
}

fn duration_var<G>(get: &G, key: &str, default: &str) -> Result<Duration>
where
    G: Fn(&str) -> Option<String>,
{
    let raw = get(key).unwrap_or_else(|| default.to_string());
    let parsed =
        humantime::parse_duration(&raw).with_context(|| format!("invalid {key}: {raw}"))?;
    if parsed.is_zero() {
        bail!("{key} must be greater than zero");
    }
    Ok(parsed)
}
