//! Process configuration, read once at boot and injected from there on.

use thiserror::Error;

use crate::services::StockFailurePolicy;

pub const DEFAULT_VNP_URL: &str = "https://sandbox.vnpayment.vn/paymentv2/vpcpay.html";
pub const DEFAULT_RETURN_URL: &str = "http://localhost:8000/api/payments/vnpay_return";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),

    #[error("invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

/// Gateway credentials and endpoints used to sign redirects and verify callbacks.
#[derive(Debug, Clone)]
pub struct PaymentConfig {
    pub endpoint: String,
    pub tmn_code: String,
    pub hash_secret: String,
    pub return_url: String,
    pub version: String,
    pub command: String,
    pub currency: String,
    pub default_locale: String,
}

impl PaymentConfig {
    pub fn new(tmn_code: impl Into<String>, hash_secret: impl Into<String>) -> Self {
        Self {
            endpoint: DEFAULT_VNP_URL.to_string(),
            tmn_code: tmn_code.into(),
            hash_secret: hash_secret.into(),
            return_url: DEFAULT_RETURN_URL.to_string(),
            version: "2.1.0".to_string(),
            command: "pay".to_string(),
            currency: "VND".to_string(),
            default_locale: "vn".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub nats_url: Option<String>,
    pub jwt_secret: String,
    pub payment: PaymentConfig,
    pub stock_failure_policy: StockFailurePolicy,
}

impl AppConfig {
    /// Reads the process environment. Call `dotenvy::dotenv()` first to pick up `.env`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let require = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let port = parse_or(get("PORT"), "PORT", 8000)?;
        let database_max_connections = parse_or(get("DATABASE_MAX_CONNECTIONS"), "DATABASE_MAX_CONNECTIONS", 10)?;
        let stock_failure_policy = match get("STOCK_FAILURE_POLICY") {
            Some(raw) => raw.parse().map_err(|message| ConfigError::Invalid { key: "STOCK_FAILURE_POLICY", message })?,
            None => StockFailurePolicy::default(),
        };

        let mut payment = PaymentConfig::new(require("VNP_TMN_CODE")?, require("VNP_HASH_SECRET")?);
        if let Some(endpoint) = get("VNP_URL") {
            payment.endpoint = endpoint;
        }
        if let Some(return_url) = get("VNP_RETURN_URL") {
            payment.return_url = return_url;
        }

        Ok(Self {
            port,
            database_url: get("DATABASE_URL"),
            database_max_connections,
            nats_url: get("NATS_URL"),
            jwt_secret: require("JWT_SECRET")?,
            payment,
            stock_failure_policy,
        })
    }
}

fn parse_or<T: std::str::FromStr>(raw: Option<String>, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match raw {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid { key, message: e.to_string() }),
        None => Ok(default),
    }
}
