use crate::error::{Error, Result};
use dotenvy::dotenv;
use std::env;
use std::sync::OnceLock;

/// Thresholds for the auto-ban policy. Injected into the anti-cheat engine so
/// boundary values can be exercised without touching the defaults.
#[derive(Debug, Clone, Copy)]
pub struct BanPolicyConfig {
    pub severity_threshold: i32,
    pub same_type_threshold: i64,
    pub total_threshold: i64,
}

impl Default for BanPolicyConfig {
    fn default() -> Self {
        Self {
            severity_threshold: 5,
            same_type_threshold: 3,
            total_threshold: 10,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub database_url: String,
    pub session_rps: u32,
    pub participant_rps: u32,
    pub uploads_dir: String,
    pub ban_severity_threshold: i32,
    pub ban_same_type_threshold: i64,
    pub ban_total_threshold: i64,
    /// Extra seconds past the test duration before the sweep abandons a
    /// session.
    pub abandon_grace_seconds: i64,
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let defaults = BanPolicyConfig::default();
        Ok(Self {
            server_address: get_env("SERVER_ADDRESS")?,
            database_url: get_env("DATABASE_URL")?,
            session_rps: get_env_parse_or("SESSION_RPS", 100)?,
            participant_rps: get_env_parse_or("PARTICIPANT_RPS", 100)?,
            uploads_dir: env::var("UPLOADS_DIR").unwrap_or_else(|_| "uploads".to_string()),
            ban_severity_threshold: get_env_parse_or(
                "BAN_SEVERITY_THRESHOLD",
                defaults.severity_threshold,
            )?,
            ban_same_type_threshold: get_env_parse_or(
                "BAN_SAME_TYPE_THRESHOLD",
                defaults.same_type_threshold,
            )?,
            ban_total_threshold: get_env_parse_or("BAN_TOTAL_THRESHOLD", defaults.total_threshold)?,
            abandon_grace_seconds: get_env_parse_or("ABANDON_GRACE_SECONDS", 120)?,
        })
    }

    pub fn ban_policy(&self) -> BanPolicyConfig {
        BanPolicyConfig {
            severity_threshold: self.ban_severity_threshold,
            same_type_threshold: self.ban_same_type_threshold,
            total_threshold: self.ban_total_threshold,
        }
    }
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_env_parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Err(_) => Ok(default),
        Ok(raw) => raw
            .parse()
            .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e))),
    }
}

pub fn init_config() -> Result<()> {
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| Error::Config("Configuration has already been initialized".to_string()))?;
    Ok(())
}

pub fn get_config() -> &'static Config {
    CONFIG
        .get()
        .expect("Configuration has not been initialized")
}
