//! Server configuration.
//!
//! Loaded from `kisspages.toml` in the site directory (next to `content/`).
//! Every key is optional; a missing file means stock defaults.
//!
//! ```toml
//! content_root = "content"
//! interface = "127.0.0.1"
//! port = 5000
//! allowed_extensions = ["jpg", "jpeg", "png", "gif", "svg", "pdf"]
//!
//! [admin]
//! name = "admin"
//! password = ""
//!
//! [cache]
//! backend = "memory"      # or "redis"
//! host = "127.0.0.1"
//! port = 6379
//! database = 0
//! # unix_socket = "/run/redis/redis.sock"
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::cache::{CacheResult, ContentCache, RedisBackend};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name looked up in the site directory.
pub const CONFIG_FILENAME: &str = "kisspages.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Content directory, relative to the site directory.
    pub content_root: String,
    /// Address the HTTP server binds to.
    pub interface: String,
    pub port: u16,
    /// File extensions (without the dot) served as-is from the pages tree.
    pub allowed_extensions: Vec<String>,
    pub admin: AdminConfig,
    pub cache: CacheConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            content_root: "content".to_string(),
            interface: "127.0.0.1".to_string(),
            port: 5000,
            allowed_extensions: ["jpg", "jpeg", "png", "gif", "svg", "pdf"]
                .map(String::from)
                .to_vec(),
            admin: AdminConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

impl SiteConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::Validation("port must be non-zero".into()));
        }
        for ext in &self.allowed_extensions {
            if ext.trim().is_empty() || ext.contains('.') || ext.contains('/') {
                return Err(ConfigError::Validation(format!(
                    "allowed_extensions entry '{ext}' must be a bare extension like \"jpg\""
                )));
            }
        }
        self.cache.validate()
    }

    /// Absolute-or-relative content directory for a site directory.
    pub fn content_dir(&self, site_dir: &Path) -> PathBuf {
        site_dir.join(&self.content_root)
    }

    /// Whether a request path names a file type that may be served directly.
    pub fn is_allowed_extension(&self, path: &str) -> bool {
        let Some(ext) = Path::new(path).extension() else {
            return false;
        };
        let ext = ext.to_string_lossy();
        self.allowed_extensions
            .iter()
            .any(|allowed| allowed.trim().eq_ignore_ascii_case(&ext))
    }
}

/// Admin credentials. Loaded and carried for the admin surface; the content
/// layer never reads them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AdminConfig {
    pub name: String,
    pub password: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            name: "admin".to_string(),
            password: String::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackendKind {
    #[default]
    Memory,
    Redis,
}

/// Content cache connection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    pub backend: CacheBackendKind,
    pub host: String,
    pub port: u16,
    /// Redis database index (0-15).
    pub database: u8,
    /// Connect over this Unix socket instead of TCP.
    pub unix_socket: Option<String>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackendKind::Memory,
            host: "127.0.0.1".to_string(),
            port: 6379,
            database: 0,
            unix_socket: None,
        }
    }
}

impl CacheConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database > 15 {
            return Err(ConfigError::Validation(
                "cache.database must be 0-15".into(),
            ));
        }
        if self.port == 0 {
            return Err(ConfigError::Validation("cache.port must be non-zero".into()));
        }
        if self.unix_socket.as_deref().is_some_and(|s| s.trim().is_empty()) {
            return Err(ConfigError::Validation(
                "cache.unix_socket must not be empty when set".into(),
            ));
        }
        Ok(())
    }

    /// Connection URL for the redis backend.
    ///
    /// - TCP: `redis://127.0.0.1:6379/0`
    /// - Unix socket: `redis+unix:///run/redis.sock?db=0`
    pub fn redis_url(&self) -> String {
        match &self.unix_socket {
            Some(socket) => format!("redis+unix://{}?db={}", socket, self.database),
            None => format!("redis://{}:{}/{}", self.host, self.port, self.database),
        }
    }

    /// Build the content cache this config describes. Opening a redis backend
    /// does not connect yet, so an unreachable server is not an error here.
    pub fn build_cache(&self) -> CacheResult<ContentCache> {
        Ok(match self.backend {
            CacheBackendKind::Memory => ContentCache::in_memory(),
            CacheBackendKind::Redis => ContentCache::new(RedisBackend::open(&self.redis_url())?),
        })
    }
}

/// Load `kisspages.toml` from the site directory.
///
/// Returns stock defaults when the file doesn't exist. Rejects unknown keys
/// and validates the result.
pub fn load_config(site_dir: &Path) -> Result<SiteConfig, ConfigError> {
    let path = site_dir.join(CONFIG_FILENAME);
    if !path.exists() {
        return Ok(SiteConfig::default());
    }
    let content = fs::read_to_string(&path)?;
    let config: SiteConfig = toml::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

/// Returns a fully-commented stock `kisspages.toml` with all keys and
/// explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# kisspages configuration
# =======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
# Unknown keys will cause an error.

# Content directory, relative to this file.
content_root = "content"

# Address and port the server listens on.
interface = "127.0.0.1"
port = 5000

# Files with these extensions under content/pages are served as-is
# (images, downloads). Everything else is rendered as a page.
allowed_extensions = ["jpg", "jpeg", "png", "gif", "svg", "pdf"]

# ---------------------------------------------------------------------------
# Admin credentials for the /admin edit surface
# ---------------------------------------------------------------------------
[admin]
name = "admin"
password = ""

# ---------------------------------------------------------------------------
# Content cache
# ---------------------------------------------------------------------------
[cache]
# "memory" keeps parsed content in this process.
# "redis" shares it through a Redis/Valkey server.
backend = "memory"

# Redis connection (ignored for the memory backend).
host = "127.0.0.1"
port = 6379
database = 0

# Connect through a Unix socket instead of TCP.
# unix_socket = "/run/redis/redis.sock"
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_is_valid() {
        let config = SiteConfig::default();
        config.validate().unwrap();
        assert_eq!(config.port, 5000);
        assert_eq!(config.cache.backend, CacheBackendKind::Memory);
    }

    #[test]
    fn load_config_returns_default_when_no_file() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(load_config(tmp.path()).unwrap(), SiteConfig::default());
    }

    #[test]
    fn load_config_reads_partial_file() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(CONFIG_FILENAME),
            r#"
port = 8080
allowed_extensions = ["png"]

[cache]
backend = "redis"
database = 3
"#,
        )
        .unwrap();

        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.allowed_extensions, vec!["png"]);
        assert_eq!(config.cache.backend, CacheBackendKind::Redis);
        assert_eq!(config.cache.database, 3);
        // Unspecified values should be defaults
        assert_eq!(config.cache.port, 6379);
        assert_eq!(config.admin.name, "admin");
    }

    #[test]
    fn load_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILENAME), "this is not valid toml [[[").unwrap();
        assert!(matches!(load_config(tmp.path()), Err(ConfigError::Toml(_))));
    }

    #[test]
    fn unknown_key_rejected() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILENAME), "prot = 5000\n").unwrap();
        assert!(matches!(load_config(tmp.path()), Err(ConfigError::Toml(_))));
    }

    #[test]
    fn out_of_range_database_rejected() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILENAME), "[cache]\ndatabase = 16\n").unwrap();
        assert!(matches!(
            load_config(tmp.path()),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn dotted_extension_rejected() {
        let config = SiteConfig {
            allowed_extensions: vec![".jpg".into()],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn allowed_extension_check_ignores_case() {
        let config = SiteConfig::default();
        assert!(config.is_allowed_extension("about/portrait.JPG"));
        assert!(config.is_allowed_extension("cv.pdf"));
        assert!(!config.is_allowed_extension("about"));
        assert!(!config.is_allowed_extension("secret.txt"));
    }

    #[test]
    fn redis_url_tcp_and_socket() {
        let mut cache = CacheConfig {
            database: 2,
            ..Default::default()
        };
        assert_eq!(cache.redis_url(), "redis://127.0.0.1:6379/2");
        cache.unix_socket = Some("/run/redis.sock".into());
        assert_eq!(cache.redis_url(), "redis+unix:///run/redis.sock?db=2");
    }

    #[test]
    fn build_cache_picks_backend() {
        let memory = CacheConfig::default().build_cache().unwrap();
        assert_eq!(memory.backend_name(), "memory");
        let redis = CacheConfig {
            backend: CacheBackendKind::Redis,
            ..Default::default()
        }
        .build_cache()
        .unwrap();
        assert_eq!(redis.backend_name(), "redis");
    }

    #[test]
    fn stock_config_toml_roundtrips_to_defaults() {
        let config: SiteConfig = toml::from_str(stock_config_toml()).unwrap();
        assert_eq!(config, SiteConfig::default());
    }
}
