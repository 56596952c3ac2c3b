//! Environment-driven configuration.

use std::net::SocketAddr;
use std::str::FromStr;

use rust_decimal::Decimal;
use thiserror::Error;

use crate::pricing::{CustomizationFees, PricingConfig};
use crate::providers::measurement::{MeasurementProviderKind, MeasurementSettings};
use crate::providers::payment::{stripe, PaymentProviderKind, PaymentSettings};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub db_max_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub nats_url: Option<String>,
    pub app_base_url: String,
    pub pricing: PricingConfig,
    pub measurement: MeasurementSettings,
    pub payment: PaymentSettings,
}

/// Loads `.env` first, then reads the process environment.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    build_app_config(|key| std::env::var(key))
}

/// Parsing and validation over an arbitrary lookup, so tests never touch the
/// process environment.
pub fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).ok().filter(|v| !v.trim().is_empty()).ok_or_else(|| ConfigError::MissingEnvVar(var.to_string()))
    };
    let optional = |var: &str| -> Option<String> { lookup(var).ok().filter(|v| !v.trim().is_empty()) };
    let or_default = |var: &str, default: &str| -> String { optional(var).unwrap_or_else(|| default.to_string()) };

    fn parse_as<T: FromStr>(var: &str, raw: &str) -> Result<T, ConfigError>
    where
        T::Err: std::fmt::Display,
    {
        raw.trim().parse::<T>().map_err(|e| ConfigError::InvalidEnvVar { var: var.to_string(), reason: e.to_string() })
    }

    let database_url = require("DATABASE_URL")?;
    let bind_addr: SocketAddr = parse_as("BIND_ADDR", &or_default("BIND_ADDR", "0.0.0.0:8083"))?;
    let log_level = or_default("LOG_LEVEL", "info");
    let db_max_connections: u32 = parse_as("DB_MAX_CONNECTIONS", &or_default("DB_MAX_CONNECTIONS", "10"))?;
    let db_acquire_timeout_secs: u64 = parse_as("DB_ACQUIRE_TIMEOUT_SECS", &or_default("DB_ACQUIRE_TIMEOUT_SECS", "10"))?;
    let nats_url = optional("NATS_URL");
    let app_base_url = or_default("APP_BASE_URL", "http://localhost:3000").trim_end_matches('/').to_string();
    let provider_timeout_secs: u64 = parse_as("PROVIDER_TIMEOUT_SECS", &or_default("PROVIDER_TIMEOUT_SECS", "15"))?;

    let decimal = |var: &str, default: &str| -> Result<Decimal, ConfigError> { parse_as(var, &or_default(var, default)) };
    let pricing = PricingConfig {
        currency: or_default("CURRENCY", "eur").to_lowercase(),
        tailor_share: decimal("TAILOR_SHARE", "0.60")?,
        platform_share: decimal("PLATFORM_SHARE", "0.25")?,
        risk_buffer_share: decimal("RISK_BUFFER_SHARE", "0.15")?,
        fees: CustomizationFees {
            lining: decimal("LINING_FEE", "50")?,
            monogram: decimal("MONOGRAM_FEE", "30")?,
            extra_trousers: decimal("EXTRA_TROUSERS_FEE", "120")?,
        },
        commission_rate: decimal("PLATFORM_COMMISSION_RATE", "0.10")?,
    };

    let measurement_kind: MeasurementProviderKind = parse_as("MEASUREMENT_PROVIDER", &or_default("MEASUREMENT_PROVIDER", "mock"))?;
    let measurement = MeasurementSettings {
        kind: measurement_kind,
        app_base_url: app_base_url.clone(),
        api_url: match measurement_kind {
            MeasurementProviderKind::External => Some(require("MEASUREMENT_API_URL")?),
            _ => optional("MEASUREMENT_API_URL"),
        },
        api_key: optional("MEASUREMENT_API_KEY"),
        timeout_secs: provider_timeout_secs,
    };

    let payment_kind: PaymentProviderKind = parse_as("PAYMENT_PROVIDER", &or_default("PAYMENT_PROVIDER", "stripe"))?;
    let payment = PaymentSettings {
        kind: payment_kind,
        stripe_secret_key: match payment_kind {
            PaymentProviderKind::Stripe => Some(require("STRIPE_SECRET_KEY")?),
            PaymentProviderKind::Mock => optional("STRIPE_SECRET_KEY"),
        },
        stripe_api_base: or_default("STRIPE_API_BASE", stripe::DEFAULT_API_BASE),
        app_base_url: app_base_url.clone(),
        timeout_secs: provider_timeout_secs,
    };

    Ok(AppConfig {
        database_url,
        bind_addr,
        log_level,
        db_max_connections,
        db_acquire_timeout_secs,
        nats_url,
        app_base_url,
        pricing,
        measurement,
        payment,
    })
}
