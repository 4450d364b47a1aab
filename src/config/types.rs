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

// Configuration types for sensor-datastore

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Storage configuration with backend selection
///
/// Every backend section carries defaults, so a file only needs to name the
/// sections it changes.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Backend token: "redis", "mongo", "cassandra", "mysql", "postgres".
    /// Case-insensitive; empty selects redis.
    #[serde(default = "default_backend")]
    pub backend: String,

    /// Upper bound on establishing a backend connection
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,

    #[serde(default)]
    pub redis: RedisConfig,
    #[serde(default)]
    pub mongo: MongoConfig,
    #[serde(default)]
    pub cassandra: CassandraConfig,
    #[serde(default)]
    pub mysql: MySqlConfig,
    #[serde(default)]
    pub postgres: PostgresConfig,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            connect_timeout_seconds: default_connect_timeout(),
            redis: RedisConfig::default(),
            mongo: MongoConfig::default(),
            cassandra: CassandraConfig::default(),
            mysql: MySqlConfig::default(),
            postgres: PostgresConfig::default(),
        }
    }
}

impl StorageConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }

    /// Point every backend at the same host
    pub fn set_host(&mut self, host: &str) {
        let host = host.to_lowercase();
        self.redis.host = host.clone();
        self.mongo.host = host.clone();
        self.cassandra.host = host.clone();
        self.mysql.host = host.clone();
        self.postgres.host = host;
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RedisConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_redis_port")]
    pub port: u16,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub db: i64,
    /// List that holds the serialized records
    #[serde(default = "default_namespace")]
    pub list_key: String,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_redis_port(),
            password: None,
            db: 0,
            list_key: default_namespace(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MongoConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_mongo_port")]
    pub port: u16,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_database")]
    pub database: String,
    #[serde(default = "default_namespace")]
    pub collection: String,
}

impl Default for MongoConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_mongo_port(),
            username: None,
            password: None,
            database: default_database(),
            collection: default_namespace(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CassandraConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_cassandra_port")]
    pub port: u16,
    #[serde(default = "default_database")]
    pub keyspace: String,
    #[serde(default = "default_namespace")]
    pub table: String,
    #[serde(default = "default_replication_factor")]
    pub replication_factor: u32,
}

impl Default for CassandraConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_cassandra_port(),
            keyspace: default_database(),
            table: default_namespace(),
            replication_factor: default_replication_factor(),
        }
    }
}

impl CassandraConfig {
    pub fn contact_point(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MySqlConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_mysql_port")]
    pub port: u16,
    #[serde(default = "default_mysql_user")]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_database")]
    pub database: String,
    #[serde(default = "default_namespace")]
    pub table: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for MySqlConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_mysql_port(),
            username: default_mysql_user(),
            password: String::new(),
            database: default_database(),
            table: default_namespace(),
            max_connections: default_max_connections(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PostgresConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_postgres_port")]
    pub port: u16,
    #[serde(default = "default_postgres_user")]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_database")]
    pub database: String,
    #[serde(default = "default_namespace")]
    pub table: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_postgres_port(),
            username: default_postgres_user(),
            password: String::new(),
            database: default_database(),
            table: default_namespace(),
            max_connections: default_max_connections(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,  // "trace", "debug", "info", "warn", "error"

    #[serde(default = "default_log_format")]
    pub format: String,  // "text", "json"
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

// Default value functions
fn default_backend() -> String { "redis".to_string() }
fn default_connect_timeout() -> u64 { 5 }
fn default_host() -> String { "localhost".to_string() }
fn default_database() -> String { "sensor_data_db".to_string() }
fn default_namespace() -> String { "sensor_data".to_string() }
fn default_redis_port() -> u16 { 6379 }
fn default_mongo_port() -> u16 { 27017 }
fn default_cassandra_port() -> u16 { 9042 }
fn default_mysql_port() -> u16 { 3306 }
fn default_postgres_port() -> u16 { 5432 }
fn default_mysql_user() -> String { "root".to_string() }
fn default_postgres_user() -> String { "postgres".to_string() }
fn default_max_connections() -> u32 { 5 }
fn default_replication_factor() -> u32 { 1 }
fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "text".to_string() }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_endpoints() {
        let config = StorageConfig::default();
        assert_eq!(config.redis.port, 6379);
        assert_eq!(config.mongo.port, 27017);
        assert_eq!(config.cassandra.contact_point(), "localhost:9042");
        assert_eq!(config.mysql.username, "root");
        assert_eq!(config.postgres.username, "postgres");
        assert_eq!(config.postgres.database, "sensor_data_db");
    }

    #[test]
    fn test_passwords_load_verbatim() {
        let config: AppConfig = serde_yaml::from_str(
            "storage:\n  redis:\n    password: \"pa#ss/w?rd@1\"\n  postgres:\n    password: \"pa#ss/w?rd@1\"\n",
        )
        .unwrap();
        assert_eq!(config.storage.redis.password.as_deref(), Some("pa#ss/w?rd@1"));
        assert_eq!(config.storage.postgres.password, "pa#ss/w?rd@1");
    }

    #[test]
    fn test_set_host_applies_to_all_backends() {
        let mut config = StorageConfig::default();
        config.set_host("DB.Example");
        assert_eq!(config.redis.host, "db.example");
        assert_eq!(config.mongo.host, "db.example");
        assert_eq!(config.cassandra.host, "db.example");
        assert_eq!(config.mysql.host, "db.example");
        assert_eq!(config.postgres.host, "db.example");
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: AppConfig = serde_yaml::from_str(
            "storage:\n  backend: mysql\n  mysql:\n    password: secret\n",
        )
        .unwrap();
        assert_eq!(config.storage.backend, "mysql");
        assert_eq!(config.storage.mysql.password, "secret");
        assert_eq!(config.storage.mysql.port, 3306);
        assert_eq!(config.storage.redis.list_key, "sensor_data");
        assert_eq!(config.logging.level, "info");
    }
}
