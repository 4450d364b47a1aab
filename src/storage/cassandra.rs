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

// Cassandra backend: one row per record in a wide-column table

use super::backend::{connect_within, StorageBackend};
use crate::config::CassandraConfig;
use crate::error::{StorageError, StorageResult};
use crate::record::SensorRecord;
use async_trait::async_trait;
use cdrs_tokio::cluster::session::{Session, SessionBuilder, TcpSessionBuilder};
use cdrs_tokio::cluster::{NodeTcpConfigBuilder, TcpConnectionManager};
use cdrs_tokio::load_balancing::RoundRobinLoadBalancingStrategy;
use cdrs_tokio::query::PreparedQuery;
use cdrs_tokio::query_values;
use cdrs_tokio::transport::TransportTcp;
use cdrs_tokio::types::rows::Row;
use cdrs_tokio::types::IntoRustByName;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, error, info, warn};

const BACKEND: &str = "cassandra";

type CassandraSession = Session<
    TransportTcp,
    TcpConnectionManager,
    RoundRobinLoadBalancingStrategy<TransportTcp, TcpConnectionManager>,
>;

/// Wide-column store driver.
///
/// Rows are keyed by `((location), recorded, sensor)`: storing a second
/// record with the same key overwrites the first. `fetch_all` returns rows in
/// partition order, not insertion order. `TRUNCATE` is not transactional.
pub struct CassandraBackend {
    config: CassandraConfig,
    connect_timeout: Duration,
    session: OnceCell<CassandraSession>,
    insert: OnceCell<PreparedQuery>,
}

impl CassandraBackend {
    pub fn new(config: CassandraConfig, connect_timeout: Duration) -> Self {
        Self {
            config,
            connect_timeout,
            session: OnceCell::new(),
            insert: OnceCell::new(),
        }
    }

    fn qualified_table(&self) -> String {
        format!("{}.{}", self.config.keyspace, self.config.table)
    }

    async fn session(&self) -> Result<&CassandraSession, String> {
        self.session
            .get_or_try_init(|| async {
                let contact_point = self.config.contact_point();
                // Node config and session builds fail with different error types
                let session = connect_within(self.connect_timeout, async {
                    let cluster_config = NodeTcpConfigBuilder::new()
                        .with_contact_point(contact_point.clone().into())
                        .build()
                        .await
                        .map_err(|e| e.to_string())?;
                    TcpSessionBuilder::new(RoundRobinLoadBalancingStrategy::new(), cluster_config)
                        .build()
                        .await
                        .map_err(|e| e.to_string())
                })
                .await?;
                info!("Connected to Cassandra at {}", contact_point);
                Ok::<_, String>(session)
            })
            .await
    }

    /// INSERT statement, prepared once per backend after the table exists
    async fn insert_statement(
        &self,
        session: &CassandraSession,
    ) -> Result<&PreparedQuery, String> {
        self.insert
            .get_or_try_init(|| async {
                let insert = format!(
                    "INSERT INTO {} (location, recorded, sensor, measurement, units, value) VALUES (?, ?, ?, ?, ?, ?);",
                    self.qualified_table()
                );
                session.prepare(insert).await.map_err(|e| e.to_string())
            })
            .await
    }
}

/// Map a result row back to a record
fn row_to_record(row: &Row) -> Result<SensorRecord, String> {
    Ok(SensorRecord {
        recorded: column(row, "recorded")?,
        location: column(row, "location")?,
        sensor: column(row, "sensor")?,
        measurement: column(row, "measurement")?,
        units: column(row, "units")?,
        value: column(row, "value")?,
    })
}

/// A SELECT must answer with a rows result; anything else is a failed fetch
fn expect_rows(rows: Option<Vec<Row>>) -> StorageResult<Vec<Row>> {
    rows.ok_or_else(|| {
        error!("Cassandra SELECT did not return a rows result");
        StorageError::fetch(BACKEND, "SELECT did not return rows")
    })
}

/// Decode every row, skipping rows with null or mistyped columns
fn decode_rows(rows: &[Row]) -> Vec<SensorRecord> {
    rows.iter()
        .filter_map(|row| match row_to_record(row) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Skipping undecodable Cassandra row: {}", e);
                None
            }
        })
        .collect()
}

fn column<T>(row: &Row, name: &str) -> Result<T, String>
where
    Row: IntoRustByName<T>,
{
    row.get_by_name(name)
        .map_err(|e| format!("column '{}': {}", name, e))?
        .ok_or_else(|| format!("column '{}' is null", name))
}

#[async_trait]
impl StorageBackend for CassandraBackend {
    async fn provision(&self) -> StorageResult<()> {
        let session = self
            .session()
            .await
            .map_err(|e| StorageError::provision(BACKEND, e))?;

        let create_keyspace = format!(
            "CREATE KEYSPACE IF NOT EXISTS {} WITH REPLICATION = {{ 'class' : 'SimpleStrategy', 'replication_factor' : {} }};",
            self.config.keyspace, self.config.replication_factor
        );
        session
            .query(create_keyspace)
            .await
            .map_err(|e| StorageError::provision(BACKEND, e))?;

        let create_table = format!(
            "CREATE TABLE IF NOT EXISTS {} (location TEXT, recorded BIGINT, sensor TEXT, measurement TEXT, units TEXT, value DOUBLE, PRIMARY KEY ((location), recorded, sensor));",
            self.qualified_table()
        );
        session
            .query(create_table)
            .await
            .map_err(|e| StorageError::provision(BACKEND, e))?;

        info!("Cassandra table '{}' ready", self.qualified_table());
        Ok(())
    }

    async fn store(&self, record: &SensorRecord) -> StorageResult<()> {
        let session = self
            .session()
            .await
            .map_err(|e| StorageError::store(BACKEND, e))?;

        let prepared = self
            .insert_statement(session)
            .await
            .map_err(|e| StorageError::store(BACKEND, e))?;

        let values = query_values!(
            record.location.clone(),
            record.recorded,
            record.sensor.clone(),
            record.measurement.clone(),
            record.units.clone(),
            record.value
        );
        session
            .exec_with_values(prepared, values)
            .await
            .map_err(|e| {
                error!("Cassandra insert failed: {}", e);
                StorageError::store(BACKEND, e)
            })?;

        debug!("Stored record in Cassandra: {:?}", record.key());
        Ok(())
    }

    async fn fetch_all(&self) -> StorageResult<Vec<String>> {
        let session = self
            .session()
            .await
            .map_err(|e| StorageError::fetch(BACKEND, e))?;

        let select = format!(
            "SELECT location, recorded, sensor, measurement, units, value FROM {};",
            self.qualified_table()
        );
        let envelope = session
            .query(select)
            .await
            .map_err(|e| StorageError::fetch(BACKEND, e))?;

        let rows = envelope
            .response_body()
            .map_err(|e| StorageError::fetch(BACKEND, e))?
            .into_rows();

        let records = decode_rows(&expect_rows(rows)?);
        info!("Fetched {} records from Cassandra", records.len());
        Ok(records.iter().map(SensorRecord::to_json).collect())
    }

    async fn purge(&self) -> StorageResult<()> {
        let session = self
            .session()
            .await
            .map_err(|e| StorageError::purge(BACKEND, e))?;

        session
            .query(format!("TRUNCATE {};", self.qualified_table()))
            .await
            .map_err(|e| {
                error!("Cassandra truncate failed: {}", e);
                StorageError::purge(BACKEND, e)
            })?;

        info!("Cassandra sensor data purged");
        Ok(())
    }

    async fn health_check(&self) -> StorageResult<bool> {
        let session = match self.session().await {
            Ok(session) => session,
            Err(e) => {
                warn!("Health check failed - cannot connect to Cassandra: {}", e);
                return Ok(false);
            }
        };

        match session.query("SELECT release_version FROM system.local;").await {
            Ok(_) => Ok(true),
            Err(e) => {
                warn!("Health check failed - Cassandra query error: {}", e);
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
    fn test_non_rows_result_is_fetch_error() {
        let err = expect_rows(None).unwrap_err();
        assert!(matches!(err, StorageError::Fetch { ref backend, .. } if backend == "cassandra"));
    }

    #[test]
    fn test_empty_rows_result_is_empty_fetch() {
        let rows = expect_rows(Some(Vec::new())).unwrap();
        assert!(decode_rows(&rows).is_empty());
    }

    #[test]
    fn test_qualified_table() {
        let backend = CassandraBackend::new(CassandraConfig::default(), Duration::from_secs(1));
        assert_eq!(backend.qualified_table(), "sensor_data_db.sensor_data");
        assert!(backend.insert.get().is_none());
    }
}
