//! Configuration loading from environment.

use std::env;

use anyhow::Context;

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    /// Use the built-in rate table when no rate is recorded for a pair
    pub fx_fallback_enabled: bool,
    pub booking_max_attempts: u32,
    pub rate_limit_per_minute: u32,
    pub otlp_endpoint: Option<String>,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads configuration from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = parse_or(&lookup, "PORT", 3000)?;

        let database_url = lookup("DATABASE_URL")
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let fx_fallback_enabled = match lookup("FX_FALLBACK_ENABLED") {
            None => true,
            Some(raw) => parse_bool(&raw)
                .with_context(|| format!("FX_FALLBACK_ENABLED has invalid value {:?}", raw))?,
        };

        let booking_max_attempts: u32 = parse_or(&lookup, "BOOKING_MAX_ATTEMPTS", 3)?;
        if booking_max_attempts == 0 {
            anyhow::bail!("BOOKING_MAX_ATTEMPTS must be at least 1");
        }

        let rate_limit_per_minute: u32 = parse_or(&lookup, "RATE_LIMIT_PER_MINUTE", 100)?;
        if rate_limit_per_minute == 0 {
            anyhow::bail!("RATE_LIMIT_PER_MINUTE must be at least 1");
        }

        let otlp_endpoint = lookup("OTEL_EXPORTER_OTLP_ENDPOINT").filter(|v| !v.trim().is_empty());

        Ok(Self {
            port,
            database_url,
            fx_fallback_enabled,
            booking_max_attempts,
            rate_limit_per_minute,
            otlp_endpoint,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} has invalid value {:?}", key, raw)),
    }
}

fn parse_bool(raw: &str) -> anyhow::Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => anyhow::bail!("expected true or false"),
    }
}
