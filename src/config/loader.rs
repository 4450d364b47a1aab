// Configuration loader with environment variable substitution

use super::types::*;
use crate::storage::BackendKind;
use anyhow::{bail, Context, Result};
use regex::Regex;
use std::path::Path;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from file with environment variable substitution
    pub fn load<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
        let content = std::fs::read_to_string(path.as_ref())
            .context("Failed to read config file")?;

        let config = Self::parse(&content)?;

        Self::validate(&config)?;

        Ok(config)
    }

    /// Parse YAML text after substituting environment variables
    pub fn parse(content: &str) -> Result<AppConfig> {
        let content = Self::substitute_env_vars(content)?;

        serde_yaml::from_str(&content).context("Failed to parse YAML configuration")
    }

    /// Substitute ${VAR} and ${VAR:-default} patterns with environment variables
    ///
    /// Examples:
    /// - ${DATA_HOSTNAME} -> db.local
    /// - ${MYSQL_PASSWORD:-secret} -> secret (if MYSQL_PASSWORD not set)
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}:]+)(?::-([^}]*))?\}")
            .context("Invalid substitution pattern")?;

        let substituted = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            let default_value = caps.get(2).map(|m| m.as_str());

            match std::env::var(var_name) {
                Ok(value) => value,
                Err(_) => match default_value {
                    Some(default) => default.to_string(),
                    // Keep original if no default and var not found
                    None => format!("${{{}}}", var_name),
                },
            }
        });

        Ok(substituted.into_owned())
    }

    /// Validate configuration
    pub fn validate(config: &AppConfig) -> Result<()> {
        let storage = &config.storage;

        // Unknown tokens fail here rather than at first use
        storage
            .backend
            .parse::<BackendKind>()
            .context("Invalid storage.backend")?;

        if storage.connect_timeout_seconds == 0 {
            bail!("storage.connect_timeout_seconds must be > 0");
        }

        // Namespace names are interpolated into DDL, so they must be plain identifiers
        let identifier = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$")
            .context("Invalid identifier pattern")?;
        let names = [
            ("mongo.database", &storage.mongo.database),
            ("mongo.collection", &storage.mongo.collection),
            ("cassandra.keyspace", &storage.cassandra.keyspace),
            ("cassandra.table", &storage.cassandra.table),
            ("mysql.database", &storage.mysql.database),
            ("mysql.table", &storage.mysql.table),
            ("postgres.database", &storage.postgres.database),
            ("postgres.table", &storage.postgres.table),
        ];
        for (field, name) in names {
            if !identifier.is_match(name) {
                bail!("storage.{} must be a plain identifier, got '{}'", field, name);
            }
        }

        if storage.redis.list_key.is_empty() {
            bail!("storage.redis.list_key cannot be empty");
        }

        if storage.cassandra.replication_factor == 0 {
            bail!("storage.cassandra.replication_factor must be > 0");
        }

        if storage.mysql.max_connections == 0 || storage.postgres.max_connections == 0 {
            bail!("max_connections must be > 0");
        }

        match config.logging.format.as_str() {
            "text" | "json" => {}
            other => bail!("logging.format must be 'text' or 'json', got '{}'", other),
        }

        Ok(())
    }
}
