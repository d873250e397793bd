use std::env;
use std::str::FromStr;

use anyhow::{Context, anyhow};
use chrono::Weekday;
use dotenvy::dotenv;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub server_addr: String,
    pub api_prefix: String,
    pub db_max_connections: u32,
    pub run_migrations: bool,

    // Rate limiting
    pub rate_punch_per_min: u32,
    pub rate_admin_per_min: u32,

    pub weekend_days: Vec<Weekday>,

    pub log_dir: String,
    pub log_level: tracing::Level,
}

fn optional<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("invalid {key}={raw}: {e}")),
        Err(_) => Ok(default),
    }
}

fn parse_weekend(raw: &str) -> anyhow::Result<Vec<Weekday>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| Weekday::from_str(s).map_err(|_| anyhow!("invalid weekday '{s}' in WEEKEND_DAYS")))
        .collect()
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv().ok();

        let weekend_days = match env::var("WEEKEND_DAYS") {
            Ok(raw) => parse_weekend(&raw)?,
            Err(_) => vec![Weekday::Sat, Weekday::Sun],
        };

        Ok(Self {
            server_addr: env::var("SERVER_ADDR").context("SERVER_ADDR must be set")?,
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),
            db_max_connections: optional("DB_MAX_CONNECTIONS", 10)?,
            run_migrations: optional("RUN_MIGRATIONS", true)?,

            rate_punch_per_min: optional("RATE_PUNCH_PER_MIN", 120)?,
            rate_admin_per_min: optional("RATE_ADMIN_PER_MIN", 600)?,

            weekend_days,

            log_dir: env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string()),
            log_level: optional("LOG_LEVEL", tracing::Level::INFO)?,
        })
    }
}
