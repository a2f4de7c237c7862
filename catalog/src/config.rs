use crate::error::{CatalogError, Result};
use crate::pagination::DEFAULT_PAGE_SIZE;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "catalog.yaml";

/// Settings shared by the server and the CLI, read from `catalog.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// SQLite database file
    pub database: PathBuf,
    /// Results per list page
    pub page_size: usize,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        CatalogConfig {
            database: PathBuf::from("catalog.db"),
            page_size: DEFAULT_PAGE_SIZE,
            server: ServerConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

impl CatalogConfig {
    /// Load configuration for a process: the file named by `path`, else
    /// `CATALOG_CONFIG`, else `catalog.yaml` if it exists, then environment
    /// overrides on top.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let explicit = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os("CATALOG_CONFIG").map(PathBuf::from));

        let mut config = match explicit {
            Some(path) => Self::from_file(&path)?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_PATH);
                if default_path.exists() {
                    Self::from_file(default_path)?
                } else {
                    Self::default()
                }
            }
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        config.check()?;
        Ok(config)
    }

    /// Parse a YAML config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CatalogError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_yaml_str(&content)
    }

    /// Parse a YAML config string. Missing keys take their defaults.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: CatalogConfig = serde_yaml::from_str(content)?;
        config.check()?;
        Ok(config)
    }

    /// Apply `CATALOG_*` overrides using `lookup` to read variables.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(database) = lookup("CATALOG_DATABASE") {
            self.database = PathBuf::from(database);
        }
        if let Some(page_size) = lookup("CATALOG_PAGE_SIZE") {
            self.page_size = page_size.parse().map_err(|_| {
                CatalogError::Config(format!("CATALOG_PAGE_SIZE is not a number: {page_size}"))
            })?;
        }
        if let Some(host) = lookup("CATALOG_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("CATALOG_PORT") {
            self.server.port = port.parse().map_err(|_| {
                CatalogError::Config(format!("CATALOG_PORT is not a port number: {port}"))
            })?;
        }
        Ok(())
    }

    fn check(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(CatalogError::Config("page_size must be at least 1".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = CatalogConfig::from_yaml_str("").unwrap();
        assert_eq!(config, CatalogConfig::default());
        assert_eq!(config.page_size, 10);
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_parse_partial_yaml() {
        let config = CatalogConfig::from_yaml_str(
            r#"
database: /var/lib/catalog/catalog.db
server:
  port: 9000
"#,
        )
        .unwrap();
        assert_eq!(config.database, PathBuf::from("/var/lib/catalog/catalog.db"));
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.page_size, 10);
    }

    #[test]
    fn test_zero_page_size_rejected() {
        let result = CatalogConfig::from_yaml_str("page_size: 0");
        assert!(matches!(result, Err(CatalogError::Config(_))));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("CATALOG_DATABASE", "other.db"),
            ("CATALOG_PAGE_SIZE", "25"),
            ("CATALOG_PORT", "8181"),
        ]);
        let mut config = CatalogConfig::default();
        config
            .apply_env(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.database, PathBuf::from("other.db"));
        assert_eq!(config.page_size, 25);
        assert_eq!(config.server.port, 8181);
        assert_eq!(config.server.host, "127.0.0.1");
    }

    #[test]
    fn test_bad_env_port() {
        let mut config = CatalogConfig::default();
        let result = config.apply_env(|key| (key == "CATALOG_PORT").then(|| "http".to_string()));
        assert!(matches!(result, Err(CatalogError::Config(_))));
    }

    #[test]
    fn test_from_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("catalog.yaml");
        std::fs::write(&path, "page_size: 5\n").unwrap();

        let config = CatalogConfig::from_file(&path).unwrap();
        assert_eq!(config.page_size, 5);

        let missing = CatalogConfig::from_file(&tmp.path().join("nope.yaml"));
        assert!(matches!(missing, Err(CatalogError::Config(_))));
    }
}
