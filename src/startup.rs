use crate::db::connection::{DbPool, pool_stats};
use crate::sse::broadcaster::{UpdateSender, create_update_broadcaster};
use std::net::SocketAddr;
use thiserror::Error;
use tokio::time::{Duration, interval};
use tracing::{debug, error};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(&'static str),
    #[error("Invalid BIND_ADDR: {0}")]
    InvalidBindAddr(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: SocketAddr,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| ConfigError::MissingVar("DATABASE_URL"))?;

        let bind_addr = std::env::var("BIND_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:8080".to_string());
        let bind_addr = bind_addr
            .parse()
            .map_err(|_| ConfigError::InvalidBindAddr(bind_addr))?;

        Ok(Config {
            database_url,
            bind_addr,
        })
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub updates: UpdateSender,
}

impl AppState {
    pub fn new(db: DbPool) -> Self {
        let db_clone = db.clone();
        tokio::spawn(async move {
            let mut interval = interval(Duration::from_secs(60));
            loop {
                interval.tick().await;
                match db_clone.acquire().await {
                    Ok(conn) => {
                        drop(conn);
                        debug!("{}", pool_stats(&db_clone));
                    }
                    Err(e) => {
                        error!("Database connection health check failed: {}", e);
                    }
                }
            }
        });

        AppState {
            db,
            updates: create_update_broadcaster(),
        }
    }
}
