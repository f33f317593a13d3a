use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::source::alma;
use crate::storage::Dialect;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CacheConfig {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub remote: RemoteConfig,
}

/// Local backend selection and connection details
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// sqlite, postgres or mysql
    pub kind: String,
    pub name: String,
    pub user: String,
    pub password: String,
    pub host: String,
    /// Defaults to the engine's standard port
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    pub pool_size: usize,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            kind: "sqlite".to_string(),
            name: "barcode_cache".to_string(),
            user: "user".to_string(),
            password: "password".to_string(),
            host: "localhost".to_string(),
            port: None,
            pool_size: 16,
        }
    }
}

impl DatabaseConfig {
    pub fn dialect(&self) -> crate::Result<Dialect> {
        self.kind.parse()
    }

    /// Build the connection parameter string the dialect's backend expects.
    pub fn connection_params(&self) -> crate::Result<String> {
        let params = match self.dialect()? {
            Dialect::Sqlite => format!("{}.sqlite.db", self.name),
            Dialect::Postgres => format!(
                "host={} port={} user={} password={} dbname={} sslmode=disable",
                self.host,
                self.port.unwrap_or(5432),
                self.user,
                self.password,
                self.name
            ),
            Dialect::MySql => format!(
                "mysql://{}:{}@{}:{}/{}",
                self.user,
                self.password,
                self.host,
                self.port.unwrap_or(3306),
                self.name
            ),
        };
        Ok(params)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Service name advertised to clients
    pub name: String,
    /// 0 lets the OS pick a free port
    pub port: u16,
    /// Stop after this many seconds; 0 runs until interrupted
    pub wait_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: "BarcodeServer".to_string(),
            port: 0,
            wait_secs: 0,
        }
    }
}

impl ServerConfig {
    pub fn wait(&self) -> Option<Duration> {
        (self.wait_secs > 0).then(|| Duration::from_secs(self.wait_secs))
    }
}

/// Remote catalogue settings. Without an API key the random source is used.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub endpoint: String,
    pub timeout_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: alma::DEFAULT_ENDPOINT.to_string(),
            timeout_secs: alma::DEFAULT_TIMEOUT.as_secs(),
        }
    }
}

impl RemoteConfig {
    /// The configured API key, treating an empty string as no key
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|key| !key.is_empty())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("barcode-cache.toml")
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<CacheConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: CacheConfig = toml::from_str(&contents)?;
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &CacheConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}
