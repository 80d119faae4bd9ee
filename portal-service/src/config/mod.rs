use serde::Deserialize;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct PortalConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub service_name: String,
    pub log_level: String,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub security: SecurityConfig,
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub token_expiry_hours: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    pub requests_per_minute: u32,
}

impl PortalConfig {
    pub fn load() -> Result<Self, AppError> {
        // Common config handles .env and the APP__ prefix.
        let common = core_config::Config::load()?;

        let is_prod = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string()) == "prod";

        Ok(PortalConfig {
            common,
            service_name: get_env("SERVICE_NAME", Some("portal-service"), is_prod)?,
            log_level: get_env("LOG_LEVEL", Some("info"), is_prod)?,
            database: DatabaseConfig {
                url: get_env("DATABASE_URL", None, is_prod)?,
                max_connections: get_env("DATABASE_MAX_CONNECTIONS", Some("10"), is_prod)?
                    .parse()
                    .map_err(|e| {
                        AppError::ConfigError(anyhow::anyhow!(
                            "Invalid DATABASE_MAX_CONNECTIONS: {}",
                            e
                        ))
                    })?,
                min_connections: get_env("DATABASE_MIN_CONNECTIONS", Some("1"), is_prod)?
                    .parse()
                    .map_err(|e| {
                        AppError::ConfigError(anyhow::anyhow!(
                            "Invalid DATABASE_MIN_CONNECTIONS: {}",
                            e
                        ))
                    })?,
            },
            jwt: JwtConfig {
                secret: get_env("JWT_SECRET", Some("dev-only-insecure-secret"), is_prod)?,
                token_expiry_hours: get_env("JWT_TOKEN_EXPIRY_HOURS", Some("168"), is_prod)?
                    .parse()
                    .map_err(|e| {
                        AppError::ConfigError(anyhow::anyhow!("Invalid JWT_TOKEN_EXPIRY_HOURS: {}", e))
                    })?,
            },
            security: SecurityConfig {
                allowed_origins: get_env("ALLOWED_ORIGINS", Some("http://localhost:3000"), is_prod)?
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            },
            rate_limit: RateLimitConfig {
                requests_per_minute: get_env("RATE_LIMIT_PER_MINUTE", Some("300"), is_prod)?
                    .parse()
                    .map_err(|e| {
                        AppError::ConfigError(anyhow::anyhow!("Invalid RATE_LIMIT_PER_MINUTE: {}", e))
                    })?,
            },
        })
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(format!(
                    "{} is required in production but not set",
                    key
                ))))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(format!(
                    "{} is required but not set",
                    key
                ))))
            }
        }
    }
}
