//! Contestify Server
//!
//! Runs the contest platform REST API.

use anyhow::Result;
use clap::Parser;
use contestify_server::{
    bootstrap_admins, AppState, ChargeIntentCreator, ContestStore, CookiePolicy, MemoryStore,
    PgStore, ServerConfig, StorageBackend, StripeCharges, TokenIssuer, UnconfiguredCharges,
};
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("contestify_server=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .init();

    let config = ServerConfig::parse();

    info!("Starting Contestify Server");
    info!("  Storage: {:?}", config.storage);
    info!("  Listening on: {}", config.bind_addr());
    info!("  Credential lifetime: {}s", config.token_ttl_secs);

    if config.access_token_secret.is_empty() {
        anyhow::bail!("ACCESS_TOKEN_SECRET must not be empty");
    }

    let store: Arc<dyn ContestStore> = match config.storage {
        StorageBackend::Postgres => {
            let pg = config.pg_config();
            info!("Connecting to PostgreSQL: {:?}", pg);
            Arc::new(PgStore::connect(&pg).await?)
        }
        StorageBackend::Memory => {
            warn!("Using in-memory storage: data is lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    if config.admin_emails.is_empty() {
        warn!("ADMIN_EMAILS not set: no new administrator will be created");
    } else {
        let promoted = bootstrap_admins(store.as_ref(), &config.admin_emails).await?;
        info!(
            "Admin bootstrap: {} configured, {} promoted",
            config.admin_emails.len(),
            promoted
        );
    }

    if config.reconcile_on_start {
        let fixed = store.reconcile_participate_counts().await?;
        info!("Reconciled participate counts on {} contests", fixed);
    }

    let charges: Arc<dyn ChargeIntentCreator> = match &config.payment_secret_key {
        Some(key) if !key.is_empty() => {
            info!("Payments via {}", config.payment_api_base);
            Arc::new(StripeCharges::new(&config.payment_api_base, key))
        }
        _ => {
            warn!("PAYMENT_SECRET_KEY not set: payment intents will fail");
            Arc::new(UnconfiguredCharges)
        }
    };

    if config.insecure_cookies {
        warn!("Issuing cookies without Secure (local development only)");
    }

    let state = Arc::new(AppState {
        store,
        tokens: TokenIssuer::new(&config.access_token_secret, config.token_ttl_secs),
        cookies: CookiePolicy {
            secure: !config.insecure_cookies,
        },
        charges,
        currency: config.payment_currency.clone(),
    });

    // Start server (blocks until shutdown)
    contestify_server::run_server(state, &config.host, config.port, &config.client_origins)
        .await?;

    Ok(())
}
