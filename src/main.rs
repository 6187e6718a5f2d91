//! EasyQueue - queue management backend
//! Serves JWT-authenticated user and business endpoints and keeps the
//! WhatsApp access token alive in the background.

use anyhow::{Context, Result};
use clap::Parser;
use std::{path::PathBuf, sync::Arc};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use easyqueue_backend::{
    api::{build_router, AppState},
    auth::{AuthService, PasswordHasher, SqliteUserStore, UserRepository, UserService},
    business::{BusinessRepository, BusinessService, SqliteBusinessStore},
    config::Config,
    db,
    whatsapp::{TokenManager, WhatsAppClient},
};

#[derive(Parser, Debug)]
#[command(name = "easyqueue")]
#[command(about = "EasyQueue API server")]
struct Args {
    /// Port to listen on (overrides PORT)
    #[arg(long)]
    port: Option<u16>,

    /// Load environment variables from this file before reading config
    #[arg(long, env = "EASYQUEUE_ENV_FILE")]
    env_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if let Some(path) = &args.env_file {
        dotenv::from_path(path)
            .with_context(|| format!("failed to load env file {}", path.display()))?;
    }

    init_tracing();

    let mut config = Config::from_env().context("failed to load configuration")?;
    if let Some(port) = args.port {
        config.port = port;
    }

    info!(
        port = config.port,
        database = %config.database_path,
        whatsapp = config.whatsapp.is_some(),
        "Starting EasyQueue backend"
    );

    let conn = db::open(&config.database_path)
        .with_context(|| format!("failed to open database {}", config.database_path))?;
    let users: Arc<dyn UserRepository> =
        Arc::new(SqliteUserStore::new(conn.clone()).context("failed to init user store")?);
    let businesses: Arc<dyn BusinessRepository> =
        Arc::new(SqliteBusinessStore::new(conn).context("failed to init business store")?);

    let hasher = PasswordHasher::new(config.bcrypt_cost);
    let auth = Arc::new(AuthService::new(users.clone(), &config.jwt, hasher));
    let user_service = Arc::new(UserService::new(users.clone(), hasher));
    let business_service = Arc::new(BusinessService::new(businesses, users));

    if let Some(seed) = &config.admin_seed {
        let created = user_service
            .ensure_admin(seed)
            .await
            .context("failed to seed admin user")?;
        if created {
            info!(email = %seed.email, "Seeded admin user");
        }
    }

    let (token_manager, whatsapp) = match &config.whatsapp {
        Some(wa) => {
            let manager = Arc::new(
                TokenManager::from_config(wa).context("failed to build WhatsApp token manager")?,
            );
            if let Err(e) = manager.start().await {
                warn!(error = %e, "WhatsApp token manager started with errors");
            }
            let client = WhatsAppClient::new(wa, manager.clone())
                .context("failed to build WhatsApp client")?;
            (Some(manager), Some(Arc::new(client)))
        }
        None => {
            info!("WhatsApp integration disabled (WHATSAPP_ACCESS_TOKEN not set)");
            (None, None)
        }
    };

    let app = build_router(AppState {
        auth,
        users: user_service,
        businesses: business_service,
        whatsapp,
    });

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("API server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    if let Some(manager) = token_manager {
        manager.shutdown().await;
    }
    info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "easyqueue_backend=debug,easyqueue=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
