//! Configuration loading and validation.

mod types;
mod validation;

pub use types::*;

use crate::error::{MigrateError, Result};
use std::path::Path;
use tokio_postgres::Config as PgConfig;

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Self::read(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a YAML file without validating it. Callers patch the result and
    /// call [`Config::validate`] themselves.
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&content)?)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Build a configuration from a connection URL alone, with generator defaults.
    pub fn from_url(url: &str) -> Result<Self> {
        let config = Config {
            database: DatabaseConfig {
                url: Some(url.to_string()),
                ..Default::default()
            },
            generator: GeneratorConfig::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }
}

impl DatabaseConfig {
    /// Build the tokio-postgres connection config.
    pub fn pg_config(&self) -> Result<PgConfig> {
        if let Some(url) = self.url.as_deref().filter(|u| !u.is_empty()) {
            return url
                .parse::<PgConfig>()
                .map_err(|e| MigrateError::Config(format!("invalid database.url: {}", e)));
        }

        let mut pg_config = PgConfig::new();
        pg_config.host(&self.host);
        pg_config.port(self.port);
        pg_config.dbname(&self.database);
        pg_config.user(&self.user);
        pg_config.password(&self.password);
        pg_config.application_name("ecto-ash-migrate");
        Ok(pg_config)
    }

    /// Human-readable endpoint for logs (never includes credentials).
    pub fn endpoint(&self) -> String {
        match self.url.as_deref().filter(|u| !u.is_empty()) {
            Some(url) => match url.parse::<PgConfig>() {
                Ok(cfg) => format!(
                    "{}/{}",
                    cfg.get_hosts()
                        .iter()
                        .filter_map(|h| match h {
                            tokio_postgres::config::Host::Tcp(name) => Some(name.clone()),
                            #[allow(unreachable_patterns)]
                            _ => None,
                        })
                        .collect::<Vec<_>>()
                        .join(","),
                    cfg.get_dbname().unwrap_or_default()
                ),
                Err(_) => "<invalid url>".to_string(),
            },
            None => format!("{}:{}/{}", self.host, self.port, self.database),
        }
    }
}
