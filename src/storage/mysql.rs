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

// MySQL backend: one row per record in a relational table

use super::backend::{connect_within, StorageBackend};
use crate::config::MySqlConfig;
use crate::error::{StorageError, StorageResult};
use crate::record::SensorRecord;
use async_trait::async_trait;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection, MySqlPoolOptions, MySqlRow};
use sqlx::{Connection, MySqlPool, Row};
use std::time::Duration;
use tracing::{debug, error, info, warn};

const BACKEND: &str = "mysql";

/// Relational store driver backed by MySQL.
///
/// Rows carry a surrogate auto-increment key; `fetch_all` returns them in
/// insertion order. `purge` deletes inside a transaction because `TRUNCATE`
/// commits implicitly in MySQL.
pub struct MySqlBackend {
    server: MySqlConnectOptions,
    database: String,
    table: String,
    connect_timeout: Duration,
    pool: MySqlPool,
}

impl MySqlBackend {
    /// Build a lazily connecting pool; no I/O happens until first use
    pub fn new(config: MySqlConfig, connect_timeout: Duration) -> Self {
        let server = server_options(&config);
        let pool = MySqlPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(connect_timeout)
            .connect_lazy_with(server.clone().database(&config.database));

        Self {
            server,
            database: config.database,
            table: config.table,
            connect_timeout,
            pool,
        }
    }
}

/// Server-level options with no database selected, used to create the database
fn server_options(config: &MySqlConfig) -> MySqlConnectOptions {
    MySqlConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .username(&config.username)
        .password(&config.password)
}

/// Map a result row back to a record
fn row_to_record(row: &MySqlRow) -> Result<SensorRecord, sqlx::Error> {
    Ok(SensorRecord {
        recorded: row.try_get("recorded")?,
        location: row.try_get("location")?,
        sensor: row.try_get("sensor")?,
        measurement: row.try_get("measurement")?,
        units: row.try_get("units")?,
        value: row.try_get("value")?,
    })
}

#[async_trait]
impl StorageBackend for MySqlBackend {
    async fn provision(&self) -> StorageResult<()> {
        let mut server = connect_within(
            self.connect_timeout,
            MySqlConnection::connect_with(&self.server),
        )
        .await
        .map_err(|e| StorageError::provision(BACKEND, e))?;

        sqlx::query(&format!("CREATE DATABASE IF NOT EXISTS `{}`", self.database))
            .execute(&mut server)
            .await
            .map_err(|e| StorageError::provision(BACKEND, e))?;
        info!("MySQL database '{}' ready", self.database);

        let create_table = format!(
            r#"CREATE TABLE IF NOT EXISTS {} (
                id BIGINT AUTO_INCREMENT PRIMARY KEY,
                recorded BIGINT NOT NULL,
                location VARCHAR(255) NOT NULL,
                sensor VARCHAR(255) NOT NULL,
                measurement VARCHAR(255) NOT NULL,
                units VARCHAR(50) NOT NULL,
                value DOUBLE NOT NULL
            )"#,
            self.table
        );
        sqlx::query(&create_table)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::provision(BACKEND, e))?;

        info!("MySQL table '{}' ready", self.table);
        Ok(())
    }

    async fn store(&self, record: &SensorRecord) -> StorageResult<()> {
        let insert = format!(
            "INSERT INTO {} (recorded, location, sensor, measurement, units, value) VALUES (?, ?, ?, ?, ?, ?)",
            self.table
        );
        sqlx::query(&insert)
            .bind(record.recorded)
            .bind(&record.location)
            .bind(&record.sensor)
            .bind(&record.measurement)
            .bind(&record.units)
            .bind(record.value)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!("MySQL insert failed: {}", e);
                StorageError::store(BACKEND, e)
            })?;

        debug!("Stored record in MySQL: {:?}", record.key());
        Ok(())
    }

    async fn fetch_all(&self) -> StorageResult<Vec<String>> {
        let select = format!(
            "SELECT recorded, location, sensor, measurement, units, value FROM {} ORDER BY id",
            self.table
        );
        let rows = sqlx::query(&select)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                error!("MySQL select failed: {}", e);
                StorageError::fetch(BACKEND, e)
            })?;

        let records = rows
            .iter()
            .map(row_to_record)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| StorageError::fetch(BACKEND, e))?;

        info!("Fetched {} records from MySQL", records.len());
        Ok(records.iter().map(SensorRecord::to_json).collect())
    }

    async fn purge(&self) -> StorageResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::purge(BACKEND, e))?;

        sqlx::query(&format!("DELETE FROM {}", self.table))
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                error!("MySQL delete failed: {}", e);
                StorageError::purge(BACKEND, e)
            })?;

        tx.commit()
            .await
            .map_err(|e| StorageError::purge(BACKEND, e))?;

        info!("MySQL sensor data purged");
        Ok(())
    }

    async fn health_check(&self) -> StorageResult<bool> {
        match sqlx::query("SELECT 1").execute(&self.pool).await {
            Ok(_) => Ok(true),
            Err(e) => {
                warn!("Health check failed - MySQL error: {}", e);
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

    fn config_with_password(password: &str) -> MySqlConfig {
        MySqlConfig {
            host: "db.local".to_string(),
            password: password.to_string(),
            ..MySqlConfig::default()
        }
    }

    #[test]
    fn test_server_options_select_no_database() {
        let options = server_options(&config_with_password("pa#ss/w?rd@1"));
        assert_eq!(options.get_host(), "db.local");
        assert_eq!(options.get_port(), 3306);
        assert_eq!(options.get_username(), "root");
        assert_eq!(options.get_database(), None);
    }

    #[tokio::test]
    async fn test_pool_targets_configured_database() {
        let backend =
            MySqlBackend::new(config_with_password("pa#ss/w?rd@1"), Duration::from_secs(1));
        let options = backend.pool.connect_options();
        assert_eq!(options.get_host(), "db.local");
        assert_eq!(options.get_database(), Some("sensor_data_db"));
    }
}
