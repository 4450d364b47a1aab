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

// Storage port shared by every sensor record backend

use crate::error::StorageResult;
use crate::record::SensorRecord;
use async_trait::async_trait;
use std::future::IntoFuture;
use std::time::Duration;
use tracing::warn;

/// Record access contract implemented by every backend driver.
///
/// Drivers own their connection handle. Calls may block on network I/O and
/// carry no ordering guarantee beyond what the backend itself provides.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Create the backend namespace (database/keyspace/table/collection) if
    /// it does not exist. Idempotent; intended to run once at startup.
    async fn provision(&self) -> StorageResult<()>;

    /// Persist one record so later `fetch_all` calls on this backend see it
    async fn store(&self, record: &SensorRecord) -> StorageResult<()>;

    /// Snapshot of every stored record as canonical flat JSON objects.
    ///
    /// An empty collection yields an empty vector, not an error.
    async fn fetch_all(&self) -> StorageResult<Vec<String>>;

    /// Delete every stored record. Purging an empty collection succeeds.
    async fn purge(&self) -> StorageResult<()>;

    /// Fetch and parse every record, skipping entries that do not parse
    async fn fetch_records(&self) -> StorageResult<Vec<SensorRecord>> {
        let raw = self.fetch_all().await?;
        let mut records = Vec::with_capacity(raw.len());

        for (index, json) in raw.iter().enumerate() {
            match SensorRecord::from_json(json) {
                Ok(record) => records.push(record),
                Err(e) => warn!(
                    "Skipping stored {} record {}: {}",
                    self.backend_type(),
                    index,
                    e
                ),
            }
        }

        Ok(records)
    }

    /// Health check
    async fn health_check(&self) -> StorageResult<bool>;

    /// Get backend type identifier
    fn backend_type(&self) -> &str;
}

/// Run a connection future under the configured timeout, flattening both
/// failure modes into a displayable reason
pub(crate) async fn connect_within<T, E, F>(timeout: Duration, connect: F) -> Result<T, String>
where
    E: std::fmt::Display,
    F: IntoFuture<Output = Result<T, E>>,
{
    match tokio::time::timeout(timeout, connect).await {
        Ok(Ok(connection)) => Ok(connection),
        Ok(Err(e)) => Err(e.to_string()),
        Err(_) => Err(format!("connection timed out after {:?}", timeout)),
    }
}
