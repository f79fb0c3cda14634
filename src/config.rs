use color_eyre::eyre::{Report, WrapErr};
use dotenv::dotenv;
use std::env;
use tracing::debug;

const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:8080";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Postgres connection string. Polls are kept in memory when unset.
    pub database_url: Option<String>,
    pub bind_address: String,
    /// Marks the session cookie `Secure`.
    pub secure_cookies: bool,
}

impl Config {
    /// Reads the configuration from the environment, loading `.env` first if present.
    pub fn from_env() -> Result<Self, Report> {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL").ok().filter(|url| !url.is_empty());
        let bind_address = env::var("BIND_ADDRESS").unwrap_or_else(|_| {
            debug!("BIND_ADDRESS not set, using {}", DEFAULT_BIND_ADDRESS);
            DEFAULT_BIND_ADDRESS.to_owned()
        });
        let secure_cookies = match env::var("SECURE_COOKIES") {
            Ok(value) => value
                .parse()
                .wrap_err_with(|| format!("SECURE_COOKIES must be true or false, got {:?}", value))?,
            Err(_) => false,
        };

        Ok(Self {
            database_url,
            bind_address,
            secure_cookies,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: None,
            bind_address: DEFAULT_BIND_ADDRESS.to_owned(),
            secure_cookies: false,
        }
    }
}
