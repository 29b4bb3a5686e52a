use crate::error::{Error, Result};
use chrono_tz::Tz;
use dotenvy::dotenv;
use std::env;
use std::sync::OnceLock;

pub const DEFAULT_REFERENCE_TIMEZONE: Tz = chrono_tz::Africa::Johannesburg;
pub const DEFAULT_REPLY_WINDOW_HOURS: i64 = 48;
pub const DEFAULT_REQUEST_CODE_LENGTH: usize = 5;
pub const DEFAULT_CLICKATELL_API_URL: &str = "https://platform.clickatell.com/messages";

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub database_url: String,
    pub database_max_connections: u32,
    pub reply_window_hours: i64,
    pub reference_timezone: Tz,
    pub request_code_length: usize,
    pub clickatell_api_url: String,
    pub clickatell_api_key: Option<String>,
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let reference_timezone = match env::var("REFERENCE_TIMEZONE") {
            Ok(name) => name
                .parse::<Tz>()
                .map_err(|e| Error::Config(format!("Invalid value for REFERENCE_TIMEZONE: {}", e)))?,
            Err(_) => DEFAULT_REFERENCE_TIMEZONE,
        };

        let config = Self {
            server_address: get_env("SERVER_ADDRESS")?,
            database_url: get_env("DATABASE_URL")?,
            database_max_connections: get_env_parse_or("DATABASE_MAX_CONNECTIONS", 5)?,
            reply_window_hours: get_env_parse_or(
                "SMS_REPLY_WINDOW_HOURS",
                DEFAULT_REPLY_WINDOW_HOURS,
            )?,
            reference_timezone,
            request_code_length: get_env_parse_or(
                "REQUEST_CODE_LENGTH",
                DEFAULT_REQUEST_CODE_LENGTH,
            )?,
            clickatell_api_url: env::var("CLICKATELL_API_URL")
                .unwrap_or_else(|_| DEFAULT_CLICKATELL_API_URL.to_string()),
            clickatell_api_key: env::var("CLICKATELL_API_KEY").ok().filter(|k| !k.is_empty()),
        };

        if config.reply_window_hours <= 0 {
            return Err(Error::Config(
                "SMS_REPLY_WINDOW_HOURS must be positive".to_string(),
            ));
        }
        if config.request_code_length < 3 {
            return Err(Error::Config(
                "REQUEST_CODE_LENGTH must be at least 3".to_string(),
            ));
        }

        Ok(config)
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
        Ok(raw) => raw
            .parse()
            .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e))),
        Err(_) => Ok(default),
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
