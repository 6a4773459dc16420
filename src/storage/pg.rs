use std::fmt;

use deadpool_postgres::{Config, CreatePoolError, ManagerConfig, Pool, RecyclingMethod, Runtime};
use tokio_postgres::NoTls;

pub type PgPool = Pool;

#[derive(Clone)]
pub struct PgConfig {
    /// Full connection string; takes precedence over the discrete fields
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub dbname: String,
    pub pool_size: usize,
}

impl fmt::Debug for PgConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PgConfig")
            .field("url", &self.url.as_ref().map(|_| "[REDACTED]"))
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("dbname", &self.dbname)
            .field("pool_size", &self.pool_size)
            .finish()
    }
}

pub fn default_pool_size() -> usize {
    16
}

impl Default for PgConfig {
    fn default() -> Self {
        Self {
            url: None,
            host: "localhost".to_string(),
            port: 5432,
            user: "postgres".to_string(),
            password: "postgres".to_string(),
            dbname: "contestify".to_string(),
            pool_size: default_pool_size(),
        }
    }
}

pub fn create_pool(cfg: &PgConfig) -> Result<PgPool, CreatePoolError> {
    let mut config = Config::new();
    match &cfg.url {
        Some(url) => config.url = Some(url.clone()),
        None => {
            config.host = Some(cfg.host.clone());
            config.port = Some(cfg.port);
            config.user = Some(cfg.user.clone());
            config.password = Some(cfg.password.clone());
            config.dbname = Some(cfg.dbname.clone());
        }
    }
    config.manager = Some(ManagerConfig {
        recycling_method: RecyclingMethod::Fast,
    });
    config.pool = Some(deadpool_postgres::PoolConfig::new(cfg.pool_size));

    config.create_pool(Some(Runtime::Tokio1), NoTls)
}
