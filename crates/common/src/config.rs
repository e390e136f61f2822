use std::fmt;

use url::Url;

use crate::{Error, Result};

const PLACEHOLDER_API_KEY: &str = "YOUR_TESTNET_API_KEY";
const PLACEHOLDER_SECRET_KEY: &str = "YOUR_TESTNET_API_SECRET";

/// All configuration loaded from environment variables at startup.
/// Any problem here is fatal; nothing is retried.
#[derive(Debug, Clone)]
pub struct Config {
    // Exchange credentials
    pub binance_api_key: String,
    pub binance_secret_key: String,
    pub base_url: Url,
    pub testnet: bool,

    /// `recvWindow` attached to every signed request.
    pub recv_window_ms: u64,

    /// Append-only log file.
    pub log_file: String,
}

impl Config {
    /// Load configuration from the process environment.
    /// Loads `.env` if present.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv(); // ignore error if .env not present
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable lookup.
    pub fn from_vars<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let binance_api_key = required(&lookup, "BINANCE_API_KEY")?;
        let binance_secret_key = required(&lookup, "BINANCE_SECRET_KEY")?;

        if binance_api_key == PLACEHOLDER_API_KEY || binance_secret_key == PLACEHOLDER_SECRET_KEY {
            return Err(Error::Config(format!(
                "replace '{PLACEHOLDER_API_KEY}' and '{PLACEHOLDER_SECRET_KEY}' with your actual testnet credentials"
            )));
        }

        let raw_url = required(&lookup, "BASE_URL")?;
        let base_url = Url::parse(&raw_url)
            .map_err(|e| Error::Config(format!("BASE_URL '{raw_url}' is not a valid URL: {e}")))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(Error::Config(format!(
                "BASE_URL must use http or https, got '{}'",
                base_url.scheme()
            )));
        }

        let testnet = match optional(&lookup, "BINANCE_TESTNET") {
            None => true,
            Some(v) => parse_flag(&v).ok_or_else(|| {
                Error::Config(format!("BINANCE_TESTNET must be true or false, got '{v}'"))
            })?,
        };

        let recv_window_ms = match optional(&lookup, "BINANCE_RECV_WINDOW_MS") {
            None => 5_000,
            Some(v) => v
                .parse::<u64>()
                .ok()
                .filter(|ms| (1..=60_000).contains(ms))
                .ok_or_else(|| {
                    Error::Config(format!(
                        "BINANCE_RECV_WINDOW_MS must be between 1 and 60000, got '{v}'"
                    ))
                })?,
        };

        Ok(Config {
            binance_api_key,
            binance_secret_key,
            base_url,
            testnet,
            recv_window_ms,
            log_file: optional(&lookup, "LOG_FILE").unwrap_or_else(|| "trading_bot.log".to_string()),
        })
    }

    pub fn credentials(&self) -> Credentials {
        Credentials {
            api_key: self.binance_api_key.clone(),
            secret_key: self.binance_secret_key.clone(),
            base_url: self.base_url.clone(),
            testnet: self.testnet,
        }
    }
}

/// What a connector needs to open an authenticated session.
#[derive(Clone)]
pub struct Credentials {
    pub api_key: String,
    pub secret_key: String,
    pub base_url: Url,
    pub testnet: bool,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key)
            .field("secret_key", &"<redacted>")
            .field("base_url", &self.base_url.as_str())
            .field("testnet", &self.testnet)
            .finish()
    }
}

fn required<F>(lookup: &F, key: &str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    optional(lookup, key).ok_or_else(|| {
        Error::Config(format!(
            "Required environment variable '{key}' is not set. Check your .env file."
        ))
    })
}

fn optional<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}
