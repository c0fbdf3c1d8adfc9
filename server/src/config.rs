use std::str::FromStr;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 5001;
pub const DEFAULT_MONGODB_URI: &str = "mongodb://127.0.0.1:27017";
pub const DEFAULT_DATABASE: &str = "youtube";

/// Which document store backs the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    MongoDb,
    /// Process-local store, lost on exit
    Memory,
}

impl FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mongodb" | "mongo" => Ok(Self::MongoDb),
            "memory" => Ok(Self::Memory),
            _ => Err(ConfigError::UnknownStore(s.to_string())),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid GATEWAY_PORT '{0}'")]
    InvalidPort(String),

    #[error("unknown GATEWAY_STORE '{0}' (expected 'mongodb' or 'memory')")]
    UnknownStore(String),
}

/// Process configuration. Defaults match the fixed deployment; each value can
/// be overridden through a `GATEWAY_*` environment variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub mongodb_uri: String,
    pub database: String,
    pub store: StoreBackend,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            mongodb_uri: DEFAULT_MONGODB_URI.to_string(),
            database: DEFAULT_DATABASE.to_string(),
            store: StoreBackend::MongoDb,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let port = match lookup("GATEWAY_PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidPort(raw.clone()))?,
            None => defaults.port,
        };
        let store = match lookup("GATEWAY_STORE") {
            Some(raw) => raw.parse()?,
            None => defaults.store,
        };

        Ok(Self {
            host: lookup("GATEWAY_HOST").unwrap_or(defaults.host),
            port,
            mongodb_uri: lookup("GATEWAY_MONGODB_URI").unwrap_or(defaults.mongodb_uri),
            database: lookup("GATEWAY_DATABASE").unwrap_or(defaults.database),
            store,
        })
    }

    /// Socket address to bind, e.g. `0.0.0.0:5001`
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
