use std::env;
use std::fmt;

/// Deployment environment, read from `APP_ENV`.
///
/// Only `production` changes behavior: internal error causes are withheld
/// from response bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Environment::Production,
            _ => Environment::Development,
        }
    }

    /// Reads `APP_ENV` at call time. Unset means development.
    pub fn current() -> Self {
        env::var("APP_ENV")
            .map(|v| Self::parse(&v))
            .unwrap_or(Environment::Development)
    }

    pub fn is_production(self) -> bool {
        self == Environment::Production
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid { key: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "{} must be set", key),
            ConfigError::Invalid { key, value } => {
                write!(f, "{} has an invalid value: {:?}", key, value)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub server_port: u16,
    pub server_host: String,
    pub upload_dir: String,
    pub environment: Environment,
}

impl Config {
    /// Loads the configuration. `JWT_SECRET` must be present; tokens read it
    /// from the environment when they are issued and verified.
    pub fn from_env() -> Result<Self, ConfigError> {
        required("JWT_SECRET")?;
        Ok(Self {
            database_url: required("DATABASE_URL")?,
            database_max_connections: parsed("DATABASE_MAX_CONNECTIONS", 5)?,
            server_port: parsed("SERVER_PORT", 8080)?,
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            upload_dir: env::var("UPLOAD_DIR").unwrap_or_else(|_| "./uploads".to_string()),
            environment: Environment::current(),
        })
    }

    pub fn server_url(&self) -> String {
        format!("http://{}:{}", self.server_host, self.server_port)
    }
}

fn required(key: &'static str) -> Result<String, ConfigError> {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::Missing(key)),
    }
}

fn parsed<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        Err(_) => Ok(default),
    }
}
