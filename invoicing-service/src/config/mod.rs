//! Configuration module for invoicing-service.

use crate::lifecycle::OverridePolicy;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;

#[derive(Debug, Clone)]
pub struct InvoicingConfig {
    pub common: core_config::Config,
    pub service_name: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub database: DatabaseConfig,
    pub overrides: OverrideConfig,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Clone)]
pub struct OverrideConfig {
    pub enabled: bool,
    pub role: String,
}

impl From<&OverrideConfig> for OverridePolicy {
    fn from(config: &OverrideConfig) -> Self {
        OverridePolicy {
            enabled: config.enabled,
            role: config.role.clone(),
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl InvoicingConfig {
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        let common = core_config::Config::load()?;

        let allow_override = match env::var("ALLOW_STATUS_OVERRIDE") {
            Ok(raw) => parse_flag(&raw).ok_or_else(|| {
                AppError::ConfigError(anyhow::anyhow!(
                    "ALLOW_STATUS_OVERRIDE must be true or false, got '{}'",
                    raw
                ))
            })?,
            Err(_) => true,
        };

        Ok(Self {
            common,
            service_name: env::var("SERVICE_NAME")
                .unwrap_or_else(|_| "invoicing-service".to_string()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok().filter(|s| !s.is_empty()),
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").map_err(|_| {
                    AppError::ConfigError(anyhow::anyhow!("DATABASE_URL is required"))
                })?,
                max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10),
                min_connections: env::var("DATABASE_MIN_CONNECTIONS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(2),
            },
            overrides: OverrideConfig {
                enabled: allow_override,
                role: env::var("OVERRIDE_ROLE").unwrap_or_else(|_| "admin".to_string()),
            },
        })
    }

    /// Configuration for running against an in-memory store.
    pub fn for_memory_store() -> Self {
        Self {
            common: core_config::Config::default(),
            service_name: "invoicing-service".to_string(),
            log_level: "info".to_string(),
            otlp_endpoint: None,
            database: DatabaseConfig {
                url: String::new(),
                max_connections: 1,
                min_connections: 0,
            },
            overrides: OverrideConfig {
                enabled: true,
                role: "admin".to_string(),
            },
        }
    }
}
