//! Runtime settings from environment variables (and `.env` via dotenvy).

use crate::error::ConfigError;
use crate::language::Language;
use std::str::FromStr;

#[derive(Clone, Debug)]
pub struct Settings {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub db_max_connections: u32,
    pub default_language: Language,
    pub page_size: u32,
    pub max_page_size: u32,
    pub max_body_size: usize,
    pub auto_migrate: bool,
    /// Allowed CORS origins; empty allows any.
    pub cors_origins: Vec<String>,
}

impl Settings {
    /// Loads `.env` if present, then reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Settings::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url = lookup("DATABASE_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Env {
                key: "DATABASE_URL",
                message: "must be set".into(),
            })?;
        let settings = Settings {
            database_url,
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: parse(&lookup, "PORT", 8000)?,
            db_max_connections: parse(&lookup, "DB_MAX_CONNECTIONS", 10)?,
            default_language: parse(&lookup, "DEFAULT_LANGUAGE", Language::PRIMARY)?,
            page_size: parse(&lookup, "PAGE_SIZE", 10)?,
            max_page_size: parse(&lookup, "MAX_PAGE_SIZE", 100)?,
            max_body_size: parse(&lookup, "MAX_BODY_SIZE", 2 * 1024 * 1024)?,
            auto_migrate: parse_bool(&lookup, "AUTO_MIGRATE", true)?,
            cors_origins: lookup("CORS_ORIGINS")
                .map(|v| {
                    v.split(',')
                        .map(str::trim)
                        .filter(|o| !o.is_empty())
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default(),
        };
        if settings.page_size == 0 || settings.page_size > settings.max_page_size {
            return Err(ConfigError::Env {
                key: "PAGE_SIZE",
                message: format!("must be between 1 and MAX_PAGE_SIZE ({})", settings.max_page_size),
            });
        }
        Ok(settings)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse<T>(lookup: &impl Fn(&str) -> Option<String>, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Env {
            key,
            message: e.to_string(),
        }),
    }
}

fn parse_bool(lookup: &impl Fn(&str) -> Option<String>, key: &'static str, default: bool) -> Result<bool, ConfigError> {
    match lookup(key).map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(default),
        Some(v) => match v.as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Env {
                key,
                message: format!("expected a boolean, got '{}'", v),
            }),
        },
    }
}
