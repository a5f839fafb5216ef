use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::AppError;

const DEFAULT_BASE_URL: &str = "http://localhost:5000/api/delivery";
const DEFAULT_ORDERS_BASE_URL: &str = "http://localhost:5000/api";
const DEFAULT_TOKEN_FILE: &str = ".courier/token";

#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Courier-scoped API root; every operation except single-order detail.
    pub base_url: String,
    /// Resource-scoped API root; serves `GET /orders/:id`.
    pub orders_base_url: String,
    pub timeout: Duration,
    /// `None` disables credential persistence (in-memory only).
    pub token_file: Option<PathBuf>,
    pub log_level: String,
    pub refresh_interval: Duration,
    pub tracking_interval: Duration,
    pub courier_email: Option<String>,
    pub courier_password: Option<String>,
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();

        let token_file = match env::var("TOKEN_FILE") {
            Ok(raw) if raw.trim().is_empty() => None,
            Ok(raw) => Some(PathBuf::from(raw)),
            Err(_) => Some(PathBuf::from(DEFAULT_TOKEN_FILE)),
        };

        Ok(Self {
            base_url: env::var("API_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            orders_base_url: env::var("ORDERS_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_ORDERS_BASE_URL.to_string()),
            timeout: Duration::from_secs(parse_or_default("REQUEST_TIMEOUT_SECS", 15)?),
            token_file,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            refresh_interval: Duration::from_secs(parse_or_default("REFRESH_INTERVAL_SECS", 30)?),
            tracking_interval: Duration::from_secs(parse_or_default("TRACKING_INTERVAL_SECS", 30)?),
            courier_email: env::var("COURIER_EMAIL").ok(),
            courier_password: env::var("COURIER_PASSWORD").ok(),
        })
    }
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|err| AppError::Config(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}
