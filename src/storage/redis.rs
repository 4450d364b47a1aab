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

// Redis backend: records are canonical JSON strings in a single list

use super::backend::{connect_within, StorageBackend};
use crate::config::RedisConfig;
use crate::error::{StorageError, StorageResult};
use crate::record::SensorRecord;
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, ConnectionAddr, ConnectionInfo, RedisConnectionInfo};
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, error, info, warn};

const BACKEND: &str = "redis";

/// Key-value list store driver.
///
/// `RPUSH` appends, so `LRANGE 0 -1` returns records in store order. Each
/// append is atomic; concurrent writers interleave in arrival order.
pub struct RedisBackend {
    client: redis::Client,
    list_key: String,
    connect_timeout: Duration,
    connection: OnceCell<MultiplexedConnection>,
}

impl RedisBackend {
    pub fn new(config: RedisConfig, connect_timeout: Duration) -> StorageResult<Self> {
        let client = redis::Client::open(connection_info(&config)).map_err(|e| {
            StorageError::Configuration(format!("Invalid Redis settings: {}", e))
        })?;

        Ok(Self {
            client,
            list_key: config.list_key,
            connect_timeout,
            connection: OnceCell::new(),
        })
    }

    /// Shared multiplexed connection, established on first use
    async fn connection(&self) -> Result<MultiplexedConnection, String> {
        let connection = self
            .connection
            .get_or_try_init(|| async {
                let connection = connect_within(
                    self.connect_timeout,
                    self.client.get_multiplexed_async_connection(),
                )
                .await?;
                info!("Connected to Redis");
                Ok::<_, String>(connection)
            })
            .await?;

        Ok(connection.clone())
    }
}

/// Connection settings built field by field so passwords need no URL escaping
fn connection_info(config: &RedisConfig) -> ConnectionInfo {
    ConnectionInfo {
        addr: ConnectionAddr::Tcp(config.host.clone(), config.port),
        redis: RedisConnectionInfo {
            db: config.db,
            password: config.password.clone(),
            ..Default::default()
        },
    }
}

#[async_trait]
impl StorageBackend for RedisBackend {
    async fn provision(&self) -> StorageResult<()> {
        // A list key needs no schema; verify the server answers
        let mut con = self
            .connection()
            .await
            .map_err(|e| StorageError::provision(BACKEND, e))?;

        let _: String = redis::cmd("PING")
            .query_async(&mut con)
            .await
            .map_err(|e| StorageError::provision(BACKEND, e))?;

        info!("Redis list '{}' ready", self.list_key);
        Ok(())
    }

    async fn store(&self, record: &SensorRecord) -> StorageResult<()> {
        let mut con = self
            .connection()
            .await
            .map_err(|e| StorageError::store(BACKEND, e))?;

        let json = record.to_json();
        con.rpush::<_, _, ()>(&self.list_key, &json)
            .await
            .map_err(|e| {
                error!("Redis RPUSH to '{}' failed: {}", self.list_key, e);
                StorageError::store(BACKEND, e)
            })?;

        debug!("Stored record in Redis: {}", json);
        Ok(())
    }

    async fn fetch_all(&self) -> StorageResult<Vec<String>> {
        let mut con = self
            .connection()
            .await
            .map_err(|e| StorageError::fetch(BACKEND, e))?;

        let values: Vec<String> = con
            .lrange(&self.list_key, 0, -1)
            .await
            .map_err(|e| {
                error!("Redis LRANGE on '{}' failed: {}", self.list_key, e);
                StorageError::fetch(BACKEND, e)
            })?;

        info!("Fetched {} records from Redis", values.len());
        Ok(values)
    }

    async fn purge(&self) -> StorageResult<()> {
        let mut con = self
            .connection()
            .await
            .map_err(|e| StorageError::purge(BACKEND, e))?;

        con.del::<_, ()>(&self.list_key).await.map_err(|e| {
            error!("Redis DEL on '{}' failed: {}", self.list_key, e);
            StorageError::purge(BACKEND, e)
        })?;

        info!("Redis sensor data purged");
        Ok(())
    }

    async fn health_check(&self) -> StorageResult<bool> {
        let mut con = match self.connection().await {
            Ok(con) => con,
            Err(e) => {
                warn!("Health check failed - cannot connect to Redis: {}", e);
                return Ok(false);
            }
        };

        let pong: redis::RedisResult<String> = redis::cmd("PING").query_async(&mut con).await;
        match pong {
            Ok(_) => Ok(true),
            Err(e) => {
                warn!("Health check failed - Redis PING error: {}", e);
                Ok(false)
            }
        }
    }

    fn backend_type(&self) -> &str {
        BACKEND
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_info_keeps_raw_password() {
        let config = RedisConfig {
            host: "cache.local".to_string(),
            password: Some("pa#ss/w?rd@1".to_string()),
            db: 3,
            ..RedisConfig::default()
        };
        let backend = RedisBackend::new(config, Duration::from_secs(1)).unwrap();

        let info = backend.client.get_connection_info();
        assert!(matches!(&info.addr, ConnectionAddr::Tcp(host, 6379) if host == "cache.local"));
        assert_eq!(info.redis.password.as_deref(), Some("pa#ss/w?rd@1"));
        assert_eq!(info.redis.db, 3);
    }

    #[test]
    fn test_connection_info_without_password() {
        let info = connection_info(&RedisConfig::default());
        assert!(info.redis.password.is_none());
        assert_eq!(info.redis.db, 0);
    }
}
