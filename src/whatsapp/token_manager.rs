//! WhatsApp Token Manager
//! Mission: Keep the Cloud API access token alive without blocking senders
//!
//! One background task wakes up every `check_interval` (6h by default). When
//! the recorded expiry is closer than `refresh_margin` (7 days) or unknown,
//! the token is exchanged for a fresh long-lived one. Senders read the
//! current token through a read lock that is never held across I/O.

use crate::config::WhatsAppConfig;
use crate::whatsapp::errors::TokenManagerError;
use crate::whatsapp::graph::{GraphTokenClient, TokenEndpoint};
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// Permanent (system user) tokens are recorded as expiring this far out
const PERMANENT_TOKEN_YEARS: i64 = 100;

#[derive(Debug, Clone, Copy)]
pub struct TokenManagerSettings {
    pub check_interval: Duration,
    pub refresh_margin: Duration,
}

impl Default for TokenManagerSettings {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_secs(6 * 3600),
            refresh_margin: Duration::from_secs(7 * 24 * 3600),
        }
    }
}

/// Snapshot exposed to operators
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TokenInfo {
    pub expires_at: Option<DateTime<Utc>>,
    pub time_until_expiry: String,
    pub is_valid: bool,
}

#[derive(Debug, Clone)]
struct TokenState {
    token: String,
    expires_at: Option<DateTime<Utc>>,
}

struct Inner {
    state: RwLock<TokenState>,
    endpoint: Arc<dyn TokenEndpoint>,
    settings: TokenManagerSettings,
    cancel: CancellationToken,
    // Serialises check passes between the loop and `check_now`
    check_lock: tokio::sync::Mutex<()>,
}

pub struct TokenManager {
    inner: Arc<Inner>,
    started: AtomicBool,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl TokenManager {
    pub fn new(
        initial_token: impl Into<String>,
        endpoint: Arc<dyn TokenEndpoint>,
        settings: TokenManagerSettings,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: RwLock::new(TokenState {
                    token: initial_token.into(),
                    expires_at: None,
                }),
                endpoint,
                settings,
                cancel: CancellationToken::new(),
                check_lock: tokio::sync::Mutex::new(()),
            }),
            started: AtomicBool::new(false),
            task: Mutex::new(None),
        }
    }

    /// Manager backed by the Graph API endpoints named in `config`
    pub fn from_config(config: &WhatsAppConfig) -> Result<Self, TokenManagerError> {
        let endpoint = GraphTokenClient::new(&config.api_url, &config.app_id, &config.app_secret)?;
        Ok(Self::new(
            config.access_token.clone(),
            Arc::new(endpoint),
            TokenManagerSettings {
                check_interval: config.token_check_interval,
                refresh_margin: config.token_refresh_margin,
            },
        ))
    }

    /// Validate the seed token once, then spawn the periodic loop.
    ///
    /// `AlreadyStarted` and `Stopped` mean nothing was spawned. Any other
    /// error comes from the initial validation and is advisory: the loop is
    /// running and will retry on its own schedule.
    pub async fn start(&self) -> Result<(), TokenManagerError> {
        if self.inner.cancel.is_cancelled() {
            return Err(TokenManagerError::Stopped);
        }
        if self
            .started
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(TokenManagerError::AlreadyStarted);
        }

        info!(
            check_interval = %humantime::format_duration(self.inner.settings.check_interval),
            refresh_margin = %humantime::format_duration(self.inner.settings.refresh_margin),
            "Starting WhatsApp token manager"
        );

        let initial = tokio::select! {
            _ = self.inner.cancel.cancelled() => {
                debug!("Initial token validation abandoned");
                return Err(TokenManagerError::Stopped);
            }
            result = self.inner.validate_and_update_expiry() => result,
        };
        if let Err(e) = &initial {
            warn!(error = %e, "Failed to validate initial token");
        }

        let handle = tokio::spawn(Inner::run(self.inner.clone()));
        *self.task.lock() = Some(handle);

        initial.map(|_| ())
    }

    /// Signal the loop to exit. Safe to call any number of times.
    pub fn stop(&self) {
        if !self.inner.cancel.is_cancelled() {
            info!("Stopping WhatsApp token manager");
        }
        self.inner.cancel.cancel();
    }

    /// Stop and wait for the background task to finish
    pub async fn shutdown(&self) {
        self.stop();
        let handle = self.task.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(error = %e, "Token manager task ended abnormally");
            }
        }
    }

    /// Last known good token
    pub fn get_token(&self) -> String {
        self.inner.state.read().token.clone()
    }

    /// Unknown expiry reports `is_valid = false`.
    pub fn token_info(&self) -> TokenInfo {
        let state = self.inner.state.read();
        let now = Utc::now();
        match state.expires_at {
            Some(at) => TokenInfo {
                expires_at: Some(at),
                time_until_expiry: humantime::format_duration(remaining(at, now)).to_string(),
                is_valid: now < at,
            },
            None => TokenInfo {
                expires_at: None,
                time_until_expiry: "unknown".to_string(),
                is_valid: false,
            },
        }
    }

    /// Run one check-and-extend pass now. Returns whether the token was
    /// exchanged. A `stop()` while the pass is in flight abandons it with
    /// `Stopped` and leaves the last good token in place.
    pub async fn check_now(&self) -> Result<bool, TokenManagerError> {
        tokio::select! {
            biased;
            _ = self.inner.cancel.cancelled() => Err(TokenManagerError::Stopped),
            result = self.inner.check_and_refresh() => result,
        }
    }
}

impl Drop for TokenManager {
    fn drop(&mut self) {
        self.inner.cancel.cancel();
    }
}

impl Inner {
    async fn run(self: Arc<Self>) {
        let period = self.settings.check_interval;
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = ticker.tick() => {
                    tokio::select! {
                        _ = self.cancel.cancelled() => {
                            debug!("In-flight token check abandoned");
                            break;
                        }
                        result = self.check_and_refresh() => {
                            if let Err(e) = result {
                                error!(error = %e, "Failed to refresh WhatsApp token");
                            }
                        }
                    }
                }
            }
        }

        info!("WhatsApp token manager stopped");
    }

    #[instrument(skip(self))]
    async fn check_and_refresh(&self) -> Result<bool, TokenManagerError> {
        let _guard = self.check_lock.lock().await;

        let expires_at = self.state.read().expires_at;
        let due = match expires_at {
            Some(at) => remaining(at, Utc::now()) < self.settings.refresh_margin,
            None => true,
        };

        if !due {
            debug!(?expires_at, "WhatsApp token not due for extension");
            return Ok(false);
        }

        info!(current_expiry = ?expires_at, "Token expiring soon, attempting to extend");
        self.extend_token().await?;
        Ok(true)
    }

    async fn validate_and_update_expiry(&self) -> Result<DateTime<Utc>, TokenManagerError> {
        let token = self.state.read().token.clone();
        let introspection = self.endpoint.introspect(&token).await?;

        let expires_at = match introspection.expires_at {
            Some(at) => at,
            None => {
                info!("Token is permanent (never expires)");
                permanent_expiry(Utc::now())
            }
        };

        {
            let mut state = self.state.write();
            // The token may have been exchanged while the request was in flight
            if state.token == token {
                state.expires_at = Some(expires_at);
            }
        }

        info!(
            %expires_at,
            time_until_expiry = %humantime::format_duration(remaining(expires_at, Utc::now())),
            "Token validated"
        );
        Ok(expires_at)
    }

    async fn extend_token(&self) -> Result<(), TokenManagerError> {
        let token = self.state.read().token.clone();
        let exchanged = self.endpoint.exchange(&token).await?;

        let expires_at = exchanged
            .expires_in
            .and_then(|ttl| chrono::Duration::from_std(ttl).ok())
            .and_then(|ttl| Utc::now().checked_add_signed(ttl));

        {
            let mut state = self.state.write();
            state.token = exchanged.access_token;
            state.expires_at = expires_at;
        }

        match expires_at {
            Some(at) => info!(new_expiry = %at, "Token extended successfully"),
            None => {
                info!("Token extended; provider did not report a lifetime");
                if let Err(e) = self.validate_and_update_expiry().await {
                    warn!(error = %e, "Could not learn expiry of the extended token");
                }
            }
        }
        Ok(())
    }
}

fn remaining(at: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    // Whole seconds keep the humantime rendering short
    Duration::from_secs((at - now).num_seconds().max(0).unsigned_abs())
}

fn permanent_expiry(now: DateTime<Utc>) -> DateTime<Utc> {
    now + chrono::Duration::days(365 * PERMANENT_TOKEN_YEARS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::whatsapp::graph::{ExchangedToken, Introspection};
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Notify;

    const HOUR: Duration = Duration::from_secs(3600);

    #[derive(Clone, Copy)]
    enum IntrospectReply {
        Expires(DateTime<Utc>),
        Permanent,
        Invalid,
    }

    #[derive(Clone)]
    enum ExchangeReply {
        Token(&'static str, Option<Duration>),
        Fail,
    }

    struct FakeEndpoint {
        introspect: Mutex<IntrospectReply>,
        exchange: Mutex<ExchangeReply>,
        introspect_calls: AtomicUsize,
        exchange_calls: AtomicUsize,
        // (entered, release) pair that holds `exchange` open
        gate: Option<(Arc<Notify>, Arc<Notify>)>,
        // Same for `introspect`
        introspect_gate: Option<(Arc<Notify>, Arc<Notify>)>,
    }

    impl FakeEndpoint {
        fn new(introspect: IntrospectReply, exchange: ExchangeReply) -> Self {
            Self {
                introspect: Mutex::new(introspect),
                exchange: Mutex::new(exchange),
                introspect_calls: AtomicUsize::new(0),
                exchange_calls: AtomicUsize::new(0),
                gate: None,
                introspect_gate: None,
            }
        }

        fn introspections(&self) -> usize {
            self.introspect_calls.load(Ordering::SeqCst)
        }

        fn exchanges(&self) -> usize {
            self.exchange_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TokenEndpoint for FakeEndpoint {
        async fn introspect(&self, _token: &str) -> Result<Introspection, TokenManagerError> {
            self.introspect_calls.fetch_add(1, Ordering::SeqCst);
            if let Some((entered, release)) = &self.introspect_gate {
                entered.notify_one();
                release.notified().await;
            }
            let reply = *self.introspect.lock();
            match reply {
                IntrospectReply::Expires(at) => Ok(Introspection {
                    expires_at: Some(at),
                }),
                IntrospectReply::Permanent => Ok(Introspection { expires_at: None }),
                IntrospectReply::Invalid => Err(TokenManagerError::Invalid),
            }
        }

        async fn exchange(&self, _token: &str) -> Result<ExchangedToken, TokenManagerError> {
            self.exchange_calls.fetch_add(1, Ordering::SeqCst);
            if let Some((entered, release)) = &self.gate {
                entered.notify_one();
                release.notified().await;
            }
            let reply = self.exchange.lock().clone();
            match reply {
                ExchangeReply::Token(token, expires_in) => Ok(ExchangedToken {
                    access_token: token.to_string(),
                    expires_in,
                }),
                ExchangeReply::Fail => Err(TokenManagerError::ExchangeFailed(
                    "error validating application".to_string(),
                )),
            }
        }
    }

    fn manager(endpoint: Arc<FakeEndpoint>) -> TokenManager {
        TokenManager::new("EAAG-old", endpoint, TokenManagerSettings::default())
    }

    fn in_days(days: i64) -> DateTime<Utc> {
        Utc::now() + chrono::Duration::days(days)
    }

    #[tokio::test(start_paused = true)]
    async fn test_expiring_token_extended_once_on_next_tick() {
        let endpoint = Arc::new(FakeEndpoint::new(
            IntrospectReply::Expires(in_days(3)),
            ExchangeReply::Token("EAAG-new", Some(Duration::from_secs(60 * 24 * 3600))),
        ));
        let manager = manager(endpoint.clone());

        manager.start().await.unwrap();
        assert_eq!(endpoint.introspections(), 1);
        assert_eq!(endpoint.exchanges(), 0);
        assert_eq!(manager.get_token(), "EAAG-old");

        tokio::time::sleep(6 * HOUR + Duration::from_secs(1)).await;
        assert_eq!(endpoint.exchanges(), 1);
        assert_eq!(manager.get_token(), "EAAG-new");

        // 60 days left now: the next tick leaves it alone
        tokio::time::sleep(6 * HOUR).await;
        assert_eq!(endpoint.exchanges(), 1);
        assert_eq!(endpoint.introspections(), 1);

        manager.shutdown().await;
    }

    #[tokio::test]
    async fn test_get_token_during_extension_is_not_blocked() {
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let mut fake = FakeEndpoint::new(
            IntrospectReply::Expires(in_days(3)),
            ExchangeReply::Token("EAAG-new", Some(Duration::from_secs(60 * 24 * 3600))),
        );
        fake.gate = Some((entered.clone(), release.clone()));
        let manager = Arc::new(manager(Arc::new(fake)));

        let worker = {
            let manager = manager.clone();
            tokio::spawn(async move { manager.check_now().await })
        };

        entered.notified().await;
        // Exchange is in flight; readers see the old token immediately
        assert_eq!(manager.get_token(), "EAAG-old");
        assert!(!manager.token_info().is_valid);

        release.notify_one();
        assert!(worker.await.unwrap().unwrap());
        assert_eq!(manager.get_token(), "EAAG-new");
        assert!(manager.token_info().is_valid);
    }

    #[tokio::test]
    async fn test_failed_extension_keeps_last_good_token() {
        let expiry = in_days(3);
        let endpoint = Arc::new(FakeEndpoint::new(
            IntrospectReply::Expires(expiry),
            ExchangeReply::Fail,
        ));
        let manager = manager(endpoint.clone());
        manager.start().await.unwrap();

        let err = manager.check_now().await.unwrap_err();
        assert!(matches!(err, TokenManagerError::ExchangeFailed(_)));
        assert_eq!(manager.get_token(), "EAAG-old");
        assert_eq!(manager.token_info().expires_at, Some(expiry));

        manager.shutdown().await;
    }

    #[tokio::test]
    async fn test_permanent_token_gets_far_future_expiry() {
        let endpoint = Arc::new(FakeEndpoint::new(
            IntrospectReply::Permanent,
            ExchangeReply::Fail,
        ));
        let manager = manager(endpoint.clone());
        manager.start().await.unwrap();

        let info = manager.token_info();
        assert!(info.is_valid);
        assert!(info.expires_at.unwrap() > in_days(365 * 99));

        assert!(!manager.check_now().await.unwrap());
        assert_eq!(endpoint.exchanges(), 0);

        manager.shutdown().await;
    }

    #[tokio::test]
    async fn test_exchange_without_lifetime_reintrospects() {
        let endpoint = Arc::new(FakeEndpoint::new(
            IntrospectReply::Expires(in_days(3)),
            ExchangeReply::Token("EAAG-new", None),
        ));
        let manager = manager(endpoint.clone());
        manager.start().await.unwrap();

        let later = in_days(50);
        *endpoint.introspect.lock() = IntrospectReply::Expires(later);

        assert!(manager.check_now().await.unwrap());
        assert_eq!(endpoint.introspections(), 2);
        assert_eq!(manager.token_info().expires_at, Some(later));

        manager.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_initial_validation_failure_is_not_fatal() {
        let endpoint = Arc::new(FakeEndpoint::new(
            IntrospectReply::Invalid,
            ExchangeReply::Token("EAAG-new", Some(Duration::from_secs(60 * 24 * 3600))),
        ));
        let manager = manager(endpoint.clone());

        let err = manager.start().await.unwrap_err();
        assert!(matches!(err, TokenManagerError::Invalid));
        assert_eq!(manager.get_token(), "EAAG-old");

        // Unknown expiry counts as due on the first tick
        tokio::time::sleep(6 * HOUR + Duration::from_secs(1)).await;
        assert_eq!(endpoint.exchanges(), 1);
        assert_eq!(manager.get_token(), "EAAG-new");

        manager.shutdown().await;
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let endpoint = Arc::new(FakeEndpoint::new(
            IntrospectReply::Expires(in_days(30)),
            ExchangeReply::Fail,
        ));
        let manager = manager(endpoint);
        manager.start().await.unwrap();

        manager.stop();
        manager.stop();
        manager.shutdown().await;
        manager.shutdown().await;

        assert!(matches!(
            manager.start().await,
            Err(TokenManagerError::Stopped)
        ));
        assert!(matches!(
            manager.check_now().await,
            Err(TokenManagerError::Stopped)
        ));
        // Reads still work after stop
        assert_eq!(manager.get_token(), "EAAG-old");
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_abandons_in_flight_check() {
        let entered = Arc::new(Notify::new());
        let mut fake = FakeEndpoint::new(
            IntrospectReply::Expires(in_days(3)),
            ExchangeReply::Token("EAAG-new", Some(Duration::from_secs(60 * 24 * 3600))),
        );
        // The exchange is never released
        fake.gate = Some((entered.clone(), Arc::new(Notify::new())));
        let endpoint = Arc::new(fake);
        let manager = Arc::new(manager(endpoint.clone()));

        let worker = {
            let manager = manager.clone();
            tokio::spawn(async move { manager.check_now().await })
        };
        entered.notified().await;
        assert_eq!(endpoint.exchanges(), 1);

        manager.stop();
        let result = tokio::time::timeout(Duration::from_secs(1), worker)
            .await
            .expect("check_now should return promptly after stop")
            .unwrap();
        assert!(matches!(result, Err(TokenManagerError::Stopped)));
        assert_eq!(manager.get_token(), "EAAG-old");
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_during_initial_validation() {
        let entered = Arc::new(Notify::new());
        let mut fake = FakeEndpoint::new(
            IntrospectReply::Expires(in_days(30)),
            ExchangeReply::Fail,
        );
        fake.introspect_gate = Some((entered.clone(), Arc::new(Notify::new())));
        let endpoint = Arc::new(fake);
        let manager = Arc::new(manager(endpoint.clone()));

        let starter = {
            let manager = manager.clone();
            tokio::spawn(async move { manager.start().await })
        };
        entered.notified().await;

        manager.stop();
        let result = tokio::time::timeout(Duration::from_secs(1), starter)
            .await
            .expect("start should return promptly after stop")
            .unwrap();
        assert!(matches!(result, Err(TokenManagerError::Stopped)));
        assert!(manager.token_info().expires_at.is_none());
        manager.shutdown().await;
    }

    #[tokio::test]
    async fn test_double_start_rejected() {
        let endpoint = Arc::new(FakeEndpoint::new(
            IntrospectReply::Expires(in_days(30)),
            ExchangeReply::Fail,
        ));
        let manager = manager(endpoint.clone());

        manager.start().await.unwrap();
        assert!(matches!(
            manager.start().await,
            Err(TokenManagerError::AlreadyStarted)
        ));
        assert_eq!(endpoint.introspections(), 1);

        manager.shutdown().await;
    }

    #[tokio::test]
    async fn test_stop_before_start() {
        let endpoint = Arc::new(FakeEndpoint::new(
            IntrospectReply::Expires(in_days(30)),
            ExchangeReply::Fail,
        ));
        let manager = manager(endpoint.clone());
        manager.stop();
        manager.shutdown().await;

        assert!(matches!(
            manager.start().await,
            Err(TokenManagerError::Stopped)
        ));
        assert_eq!(endpoint.introspections(), 0);
    }
}
