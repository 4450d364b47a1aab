// Copyright 2025 coScene
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

// Backend factory for creating storage backends from configuration

use super::backend::StorageBackend;
use super::cassandra::CassandraBackend;
use super::mongo::MongoBackend;
use super::mysql::MySqlBackend;
use super::postgres::PostgresBackend;
use super::redis::RedisBackend;
use crate::config::StorageConfig;
use crate::error::{StorageError, StorageResult};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

/// Supported storage technologies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendKind {
    /// Key-value list store
    #[default]
    Redis,
    /// Document store
    Mongo,
    /// Wide-column store
    Cassandra,
    MySql,
    Postgres,
}

impl BackendKind {
    pub const ALL: [BackendKind; 5] = [
        BackendKind::Redis,
        BackendKind::Mongo,
        BackendKind::Cassandra,
        BackendKind::MySql,
        BackendKind::Postgres,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Redis => "redis",
            BackendKind::Mongo => "mongo",
            BackendKind::Cassandra => "cassandra",
            BackendKind::MySql => "mysql",
            BackendKind::Postgres => "postgres",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = StorageError;

    /// Case-insensitive; an empty token selects the default (redis)
    fn from_str(token: &str) -> Result<Self, Self::Err> {
        let token = token.trim().to_lowercase();
        if token.is_empty() {
            return Ok(BackendKind::default());
        }

        BackendKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == token)
            .ok_or_else(|| {
                StorageError::Configuration(format!(
                    "Unknown storage backend: '{}'. Supported: redis, mongo, cassandra, mysql, postgres",
                    token
                ))
            })
    }
}

pub struct BackendFactory;

impl BackendFactory {
    /// Create storage backend from configuration.
    ///
    /// Every call builds a new driver instance; nothing is cached. The driver
    /// connects on first use and is not provisioned yet.
    pub fn create(config: &StorageConfig) -> StorageResult<Arc<dyn StorageBackend>> {
        let kind: BackendKind = config.backend.parse()?;
        let timeout = config.connect_timeout();

        let backend: Arc<dyn StorageBackend> = match kind {
            BackendKind::Redis => Arc::new(RedisBackend::new(config.redis.clone(), timeout)?),
            BackendKind::Mongo => Arc::new(MongoBackend::new(config.mongo.clone(), timeout)),
            BackendKind::Cassandra => {
                Arc::new(CassandraBackend::new(config.cassandra.clone(), timeout))
            }
            BackendKind::MySql => Arc::new(MySqlBackend::new(config.mysql.clone(), timeout)),
            BackendKind::Postgres => {
                Arc::new(PostgresBackend::new(config.postgres.clone(), timeout))
            }
        };

        info!("Created {} storage backend", backend.backend_type());
        Ok(backend)
    }

    /// Create and provision a backend; provisioning failures abort startup
    pub async fn open(config: &StorageConfig) -> StorageResult<Arc<dyn StorageBackend>> {
        let backend = Self::create(config)?;
        backend.provision().await?;
        Ok(backend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_for(token: &str) -> StorageConfig {
        StorageConfig {
            backend: token.to_string(),
            ..StorageConfig::default()
        }
    }

    #[test]
    fn test_token_is_case_insensitive() {
        assert_eq!("MySQL".parse::<BackendKind>().unwrap(), BackendKind::MySql);
        assert_eq!("mysql".parse::<BackendKind>().unwrap(), BackendKind::MySql);
        assert_eq!(" Postgres ".parse::<BackendKind>().unwrap(), BackendKind::Postgres);
    }

    #[test]
    fn test_empty_token_defaults_to_redis() {
        assert_eq!("".parse::<BackendKind>().unwrap(), BackendKind::Redis);
        assert_eq!("   ".parse::<BackendKind>().unwrap(), BackendKind::Redis);
    }

    #[test]
    fn test_unknown_token_is_configuration_error() {
        let err = "oracle".parse::<BackendKind>().unwrap_err();
        assert!(matches!(err, StorageError::Configuration(_)));
        assert!(err.to_string().contains("Unknown storage backend"));
    }

    #[test]
    fn test_round_trip_names() {
        for kind in BackendKind::ALL {
            assert_eq!(kind.to_string().parse::<BackendKind>().unwrap(), kind);
        }
    }

    #[tokio::test]
    async fn test_create_each_backend() {
        for kind in BackendKind::ALL {
            let backend = BackendFactory::create(&config_for(kind.as_str()));
            assert!(backend.is_ok(), "failed to create {}", kind);
            assert_eq!(backend.unwrap().backend_type(), kind.as_str());
        }
    }

    #[tokio::test]
    async fn test_create_with_reserved_url_characters_in_passwords() {
        let password = "pa#ss/w?rd@1";
        let mut config = StorageConfig::default();
        config.redis.password = Some(password.to_string());
        config.mongo.username = Some("sensor".to_string());
        config.mongo.password = Some(password.to_string());
        config.mysql.password = password.to_string();
        config.postgres.password = password.to_string();

        for kind in BackendKind::ALL {
            config.backend = kind.as_str().to_string();
            let backend = BackendFactory::create(&config);
            assert!(backend.is_ok(), "failed to create {}: {:?}", kind, backend.err());
        }
    }

    #[tokio::test]
    async fn test_create_mixed_case_token() {
        let backend = BackendFactory::create(&config_for("MySQL")).unwrap();
        assert_eq!(backend.backend_type(), "mysql");
    }

    #[test]
    fn test_create_unknown_backend() {
        let backend = BackendFactory::create(&config_for("oracle"));
        assert!(matches!(backend, Err(StorageError::Configuration(_))));
    }
}
