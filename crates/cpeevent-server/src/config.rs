use std::env;
use std::fmt::Display;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};

const DEV_SECRET: &str = "dev-secret-change-me";

pub struct Config {
    pub jwt_secret: String,
    pub db_path: PathBuf,
    pub addr: SocketAddr,
    pub request_timeout: Duration,
}

impl Config {
    /// Read `CPEEVENT_*` variables, falling back to development defaults.
    pub fn from_env() -> Result<Self> {
        let jwt_secret = env::var("CPEEVENT_JWT_SECRET").unwrap_or_else(|_| {
            warn!("CPEEVENT_JWT_SECRET not set, using the development secret");
            DEV_SECRET.into()
        });
        let db_path: PathBuf = load("CPEEVENT_DB_PATH", "cpeevent.db")?;
        let host: String = load("CPEEVENT_HOST", "0.0.0.0")?;
        let port: u16 = load("CPEEVENT_PORT", "3000")?;
        let timeout_secs: u64 = load("CPEEVENT_REQUEST_TIMEOUT_SECS", "100")?;

        let addr = format!("{}:{}", host, port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", host, port))?;

        Ok(Self {
            jwt_secret,
            db_path,
            addr,
            request_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

fn load<T: FromStr>(key: &str, default: &str) -> Result<T>
where
    T::Err: Display,
{
    let raw = env::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });
    raw.parse()
        .map_err(|e| anyhow::anyhow!("invalid {key} value '{raw}': {e}"))
}
