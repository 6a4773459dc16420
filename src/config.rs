//! Server Configuration
//!
//! Every setting is a CLI flag that can also come from the environment:
//! - Listener (host, port)
//! - Storage backend and PostgreSQL credentials
//! - Credential signing secret and lifetime
//! - Payment processor key and currency
//! - Browser origins allowed to send the credential cookie
//! - Administrators to create at startup

use clap::{Parser, ValueEnum};
use std::fmt;

use crate::auth::DEFAULT_TOKEN_TTL_SECS;
use crate::payments::{DEFAULT_CURRENCY, DEFAULT_PAYMENT_API_BASE};
use crate::storage::pg::PgConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StorageBackend {
    /// In-process collections, lost on restart
    Memory,
    /// PostgreSQL JSONB documents
    Postgres,
}

#[derive(Parser, Clone)]
#[command(name = "contestify-server")]
#[command(about = "Contestify contest platform REST server")]
pub struct ServerConfig {
    /// Server host
    #[arg(long, default_value = "0.0.0.0", env = "HOST")]
    pub host: String,

    /// Server port
    #[arg(short, long, default_value_t = 5000, env = "PORT")]
    pub port: u16,

    /// Storage backend
    #[arg(long, value_enum, default_value = "postgres", env = "STORAGE_BACKEND")]
    pub storage: StorageBackend,

    /// Full PostgreSQL connection string (overrides the DB_* settings)
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    #[arg(long, default_value = "localhost", env = "DB_HOST")]
    pub db_host: String,

    #[arg(long, default_value_t = 5432, env = "DB_PORT")]
    pub db_port: u16,

    #[arg(long, default_value = "postgres", env = "DB_USER")]
    pub db_user: String,

    #[arg(long, default_value = "postgres", env = "DB_PASS")]
    pub db_pass: String,

    #[arg(long, default_value = "contestify", env = "DB_NAME")]
    pub db_name: String,

    #[arg(long, default_value_t = 16, env = "DB_POOL_SIZE")]
    pub db_pool_size: usize,

    /// Secret used to sign credential tokens
    #[arg(long, env = "ACCESS_TOKEN_SECRET")]
    pub access_token_secret: String,

    /// Credential lifetime in seconds
    #[arg(long, default_value_t = DEFAULT_TOKEN_TTL_SECS, env = "TOKEN_TTL_SECS")]
    pub token_ttl_secs: i64,

    /// Issue cookies without `Secure` (plain-HTTP local development)
    #[arg(long, env = "INSECURE_COOKIES")]
    pub insecure_cookies: bool,

    /// Payment processor secret key
    #[arg(long, env = "PAYMENT_SECRET_KEY")]
    pub payment_secret_key: Option<String>,

    #[arg(long, default_value = DEFAULT_PAYMENT_API_BASE, env = "PAYMENT_API_BASE")]
    pub payment_api_base: String,

    #[arg(long, default_value = DEFAULT_CURRENCY, env = "PAYMENT_CURRENCY")]
    pub payment_currency: String,

    /// Browser origins allowed to call with credentials (comma separated)
    #[arg(long, env = "CLIENT_ORIGINS", value_delimiter = ',')]
    pub client_origins: Vec<String>,

    /// Emails granted the admin role at startup (comma separated)
    #[arg(long, env = "ADMIN_EMAILS", value_delimiter = ',')]
    pub admin_emails: Vec<String>,

    /// Recompute contest participate counts from the ledger at startup
    #[arg(long, env = "RECONCILE_ON_START")]
    pub reconcile_on_start: bool,
}

impl ServerConfig {
    pub fn pg_config(&self) -> PgConfig {
        PgConfig {
            url: self.database_url.clone(),
            host: self.db_host.clone(),
            port: self.db_port,
            user: self.db_user.clone(),
            password: self.db_pass.clone(),
            dbname: self.db_name.clone(),
            pool_size: self.db_pool_size,
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("storage", &self.storage)
            .field("pg", &self.pg_config())
            .field("access_token_secret", &"[REDACTED]")
            .field("token_ttl_secs", &self.token_ttl_secs)
            .field("insecure_cookies", &self.insecure_cookies)
            .field(
                "payment_secret_key",
                &self.payment_secret_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("payment_api_base", &self.payment_api_base)
            .field("payment_currency", &self.payment_currency)
            .field("client_origins", &self.client_origins)
            .field("admin_emails", &self.admin_emails)
            .field("reconcile_on_start", &self.reconcile_on_start)
            .finish()
    }
}
