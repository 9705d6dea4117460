use pos_types::domain::order::{DEFAULT_COOKING_ETA_MINUTES, DEFAULT_DELIVERY_ETA_MINUTES};
use serde::Deserialize;
use std::env;

pub const DEFAULT_TOKEN_MAX_ATTEMPTS: u32 = 5;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server_port: String,
    pub database_url: Option<String>,
    pub token_max_attempts: u32,
    pub default_cooking_eta_minutes: u32,
    pub default_delivery_eta_minutes: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: "3000".into(),
            database_url: None,
            token_max_attempts: DEFAULT_TOKEN_MAX_ATTEMPTS,
            default_cooking_eta_minutes: DEFAULT_COOKING_ETA_MINUTES,
            default_delivery_eta_minutes: DEFAULT_DELIVERY_ETA_MINUTES,
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> anyhow::Result<T>
where
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| anyhow::anyhow!("{name}={raw:?} is invalid: {e}")),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();
        let server_port = env::var("SERVER_PORT").unwrap_or(defaults.server_port);
        let database_url = env::var("DATABASE_URL").ok();
        let token_max_attempts = parse_var("TOKEN_MAX_ATTEMPTS", defaults.token_max_attempts)?;
        if token_max_attempts == 0 {
            anyhow::bail!("TOKEN_MAX_ATTEMPTS must be at least 1");
        }
        Ok(Self {
            server_port,
            database_url,
            token_max_attempts,
            default_cooking_eta_minutes: parse_var(
                "DEFAULT_COOKING_ETA_MINUTES",
                defaults.default_cooking_eta_minutes,
            )?,
            default_delivery_eta_minutes: parse_var(
                "DEFAULT_DELIVERY_ETA_MINUTES",
                defaults.default_delivery_eta_minutes,
            )?,
        })
    }
}
