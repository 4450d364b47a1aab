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

// PostgreSQL backend: one row per record in a relational table

use super::backend::{connect_within, StorageBackend};
use crate::config::PostgresConfig;
use crate::error::{StorageError, StorageResult};
use crate::record::SensorRecord;
use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgConnection, PgPoolOptions, PgRow};
use sqlx::{Connection, PgPool, Row};
use std::time::Duration;
use tracing::{debug, error, info, warn};

const BACKEND: &str = "postgres";
const MAINTENANCE_DATABASE: &str = "postgres";

/// Relational store driver backed by PostgreSQL.
///
/// `fetch_all` returns rows in insertion order (by surrogate key) and `purge`
/// truncates transactionally.
pub struct PostgresBackend {
    server: PgConnectOptions,
    database: String,
    table: String,
    connect_timeout: Duration,
    pool: PgPool,
}

impl PostgresBackend {
    /// Build a lazily connecting pool; no I/O happens until first use
    pub fn new(config: PostgresConfig, connect_timeout: Duration) -> Self {
        let server = server_options(&config);
        let pool = PgPoolOptions::new()
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

/// Options for the `postgres` maintenance database, used to create the database
fn server_options(config: &PostgresConfig) -> PgConnectOptions {
    PgConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .username(&config.username)
        .password(&config.password)
        .database(MAINTENANCE_DATABASE)
}

/// SQLSTATE 42P04, raised when a concurrent provisioner created the database first
fn is_duplicate_database(error: &sqlx::Error) -> bool {
    matches!(
        error.as_database_error().and_then(|e| e.code()).as_deref(),
        Some("42P04")
    )
}

/// Map a result row back to a record
fn row_to_record(row: &PgRow) -> Result<SensorRecord, sqlx::Error> {
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
impl StorageBackend for PostgresBackend {
    async fn provision(&self) -> StorageResult<()> {
        let mut server = connect_within(
            self.connect_timeout,
            PgConnection::connect_with(&self.server),
        )
        .await
        .map_err(|e| StorageError::provision(BACKEND, e))?;

        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM pg_database WHERE datname = $1)")
                .bind(&self.database)
                .fetch_one(&mut server)
                .await
                .map_err(|e| StorageError::provision(BACKEND, e))?;
        if !exists {
            info!("Creating PostgreSQL database '{}'", self.database);
            match sqlx::query(&format!("CREATE DATABASE \"{}\"", self.database))
                .execute(&mut server)
                .await
            {
                Ok(_) => {}
                Err(e) if is_duplicate_database(&e) => {}
                Err(e) => return Err(StorageError::provision(BACKEND, e)),
            }
        }

        let create_table = format!(
            r#"CREATE TABLE IF NOT EXISTS {} (
                id BIGSERIAL PRIMARY KEY,
                recorded BIGINT NOT NULL,
                location VARCHAR NOT NULL,
                sensor VARCHAR NOT NULL,
                measurement VARCHAR NOT NULL,
                units VARCHAR NOT NULL,
                value DOUBLE PRECISION NOT NULL
            )"#,
            self.table
        );
        sqlx::query(&create_table)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::provision(BACKEND, e))?;

        info!("PostgreSQL table '{}' ready", self.table);
        Ok(())
    }

    async fn store(&self, record: &SensorRecord) -> StorageResult<()> {
        let insert = format!(
            "INSERT INTO {} (recorded, location, sensor, measurement, units, value) VALUES ($1, $2, $3, $4, $5, $6)",
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
                error!("PostgreSQL insert failed: {}", e);
                StorageError::store(BACKEND, e)
            })?;

        debug!("Stored record in PostgreSQL: {:?}", record.key());
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
                error!("PostgreSQL select failed: {}", e);
                StorageError::fetch(BACKEND, e)
            })?;

        let records = rows
            .iter()
            .map(row_to_record)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| StorageError::fetch(BACKEND, e))?;

        info!("Fetched {} records from PostgreSQL", records.len());
        Ok(records.iter().map(SensorRecord::to_json).collect())
    }

    async fn purge(&self) -> StorageResult<()> {
        sqlx::query(&format!("TRUNCATE TABLE {}", self.table))
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!("PostgreSQL truncate failed: {}", e);
                StorageError::purge(BACKEND, e)
            })?;

        info!("PostgreSQL sensor data purged");
        Ok(())
    }

    async fn health_check(&self) -> StorageResult<bool> {
        match sqlx::query("SELECT 1").execute(&self.pool).await {
            Ok(_) => Ok(true),
            Err(e) => {
                warn!("Health check failed - PostgreSQL error: {}", e);
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

    fn config_with_password(password: &str) -> PostgresConfig {
        PostgresConfig {
            host: "db.local".to_string(),
            password: password.to_string(),
            ..PostgresConfig::default()
        }
    }

    #[test]
    fn test_server_options_use_maintenance_database() {
        let options = server_options(&config_with_password("pa#ss/w?rd@1"));
        assert_eq!(options.get_host(), "db.local");
        assert_eq!(options.get_port(), 5432);
        assert_eq!(options.get_username(), "postgres");
        assert_eq!(options.get_database(), Some("postgres"));
    }

    #[tokio::test]
    async fn test_pool_targets_configured_database() {
        let backend =
            PostgresBackend::new(config_with_password("pa#ss/w?rd@1"), Duration::from_secs(1));
        let options = backend.pool.connect_options();
        assert_eq!(options.get_host(), "db.local");
        assert_eq!(options.get_database(), Some("sensor_data_db"));
    }

    #[test]
    fn test_non_database_errors_are_not_duplicates() {
        assert!(!is_duplicate_database(&sqlx::Error::PoolTimedOut));
    }
}
