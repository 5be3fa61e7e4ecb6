use std::env;
use std::fmt;

/// Hard ceiling for subtree reads.
pub const MAX_TREE_DEPTH: u8 = 5;

const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:8080";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Postgres URL. Without one the service runs on the in-memory store.
    pub database_url: Option<String>,
    pub bind_address: String,
    pub max_tree_depth: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Invalid { key: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Invalid { key, value } => {
                write!(f, "Invalid value for {}: {:?}", key, value)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl Default for Config {
    fn default() -> Self {
        Config {
            database_url: None,
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            max_tree_depth: MAX_TREE_DEPTH,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());
        let bind_address = lookup("BIND_ADDRESS")
            .filter(|addr| !addr.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let max_tree_depth = match lookup("MAX_TREE_DEPTH") {
            Some(raw) => raw
                .trim()
                .parse::<u8>()
                .ok()
                .filter(|depth| (1..=MAX_TREE_DEPTH).contains(depth))
                .ok_or(ConfigError::Invalid {
                    key: "MAX_TREE_DEPTH",
                    value: raw,
                })?,
            None => MAX_TREE_DEPTH,
        };

        Ok(Config {
            database_url,
            bind_address,
            max_tree_depth,
        })
    }
}
