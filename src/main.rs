//! Gatehouse Server: session and token service for multi-provider login.
//!
//! Main entry point that wires all crates together and starts the server.

use std::sync::Arc;

use tracing_subscriber::{EnvFilter, fmt};

use gatehouse_api::AppState;
use gatehouse_auth::{PasswordProvider, SessionService};
use gatehouse_core::config::{AppConfig, StoreKind};
use gatehouse_core::error::AppError;
use gatehouse_database::{CredentialStore, DatabasePool, MemoryCredentialStore, PgCredentialStore};

#[tokio::main]
async fn main() {
    let env = std::env::var("GATEHOUSE_ENV").unwrap_or_else(|_| "development".to_string());

    let config = match AppConfig::load(&env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);
    tracing::info!(env = %env, "Configuration loaded");

    if let Err(e) = run(config).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main server run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting Gatehouse v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Credential store ─────────────────────────────────
    let (store, db_pool): (Arc<dyn CredentialStore>, Option<DatabasePool>) =
        match config.database.store {
            StoreKind::Postgres => {
                let pool = DatabasePool::connect(&config.database).await?;
                gatehouse_database::migration::run_migrations(pool.pool()).await?;
                let store = PgCredentialStore::new(pool.pool().clone());
                (Arc::new(store), Some(pool))
            }
            StoreKind::Memory => {
                tracing::warn!("Using in-memory credential store; all data is lost on restart");
                (Arc::new(MemoryCredentialStore::new()), None)
            }
        };
    tracing::info!(store = %config.database.store, "Credential store ready");

    // ── Step 2: Session service + providers ──────────────────────
    let sessions = Arc::new(SessionService::new(
        Arc::clone(&store),
        &config.auth,
        &config.session,
    ));

    sessions
        .register_provider(
            gatehouse_auth::provider::password::PROVIDER_NAME,
            Arc::new(PasswordProvider::new(Arc::clone(&store), &config.auth)),
        )
        .await;

    if let Some(weapp) = &config.weapp {
        let provider = gatehouse_provider_weapp::provider(weapp, Arc::clone(&store))?;
        sessions
            .register_provider(gatehouse_provider_weapp::PROVIDER_NAME, Arc::new(provider))
            .await;
    }

    if let Some(dingtalk) = &config.dingtalk {
        let provider = gatehouse_provider_dingtalk::provider(dingtalk, Arc::clone(&store))?;
        sessions
            .register_provider(gatehouse_provider_dingtalk::PROVIDER_NAME, Arc::new(provider))
            .await;
    }

    tracing::info!(
        providers = ?sessions.providers().names().await,
        "Login providers registered"
    );

    // ── Step 3: HTTP server ──────────────────────────────────────
    let state = AppState::new(Arc::new(config), Arc::clone(&sessions));
    let result = gatehouse_api::serve(state).await;

    // ── Step 4: Shutdown ─────────────────────────────────────────
    sessions.shutdown().await;
    if let Some(pool) = db_pool {
        pool.close().await;
    }

    tracing::info!("Gatehouse shut down cleanly");
    result
}
