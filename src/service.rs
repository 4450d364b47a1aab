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

// Caller-facing log/report/purge operations over a storage backend

use crate::error::StorageResult;
use crate::export::TabularDocument;
use crate::protocol::{CsvReport, HealthResponse, Report, ServiceResponse};
use crate::record::SensorRecord;
use crate::storage::StorageBackend;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Operations exposed to a front-end (HTTP handler, CLI) for one backend
#[derive(Clone)]
pub struct SensorService {
    backend: Arc<dyn StorageBackend>,
}

impl SensorService {
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &Arc<dyn StorageBackend> {
        &self.backend
    }

    /// Store one record
    pub async fn log(&self, record: &SensorRecord) -> StorageResult<ServiceResponse> {
        self.backend.store(record).await.inspect_err(|e| {
            error!("Failed to log sensor data: {}", e);
        })?;

        info!(
            "Logged {} reading from {}/{} to {}",
            record.measurement,
            record.location,
            record.sensor,
            self.backend.backend_type()
        );
        Ok(ServiceResponse::success(
            "Data logged successfully",
            self.backend.backend_type(),
        ))
    }

    /// Validate JSON text as a record, then store it
    pub async fn log_json(&self, json: &str) -> StorageResult<ServiceResponse> {
        let record = SensorRecord::from_json(json).inspect_err(|e| {
            warn!("Rejected sensor data: {}", e);
        })?;
        self.log(&record).await
    }

    /// Export every stored record as CSV.
    ///
    /// An empty backend, or one holding only unreadable entries, yields
    /// [`Report::NoData`].
    pub async fn report(&self) -> StorageResult<Report> {
        let raw = self.backend.fetch_all().await.inspect_err(|e| {
            error!("Failed to fetch sensor data: {}", e);
        })?;

        if raw.is_empty() {
            info!("No sensor data in {}", self.backend.backend_type());
            return Ok(Report::no_data());
        }

        let document = TabularDocument::from_json_records(&raw);
        if document.skipped() > 0 {
            warn!(
                "Report omitted {} of {} stored entries",
                document.skipped(),
                raw.len()
            );
        }
        if document.is_empty() {
            return Ok(Report::no_data());
        }

        let body = document.render()?;
        info!(
            "Built report with {} rows from {}",
            document.rows().len(),
            self.backend.backend_type()
        );
        Ok(Report::Csv(CsvReport::new(
            body,
            document.rows().len(),
            document.skipped(),
        )))
    }

    /// Remove every stored record
    pub async fn purge(&self) -> StorageResult<ServiceResponse> {
        self.backend.purge().await.inspect_err(|e| {
            error!("Failed to purge sensor data: {}", e);
        })?;

        Ok(ServiceResponse::success("purged", self.backend.backend_type()))
    }

    pub async fn health(&self) -> HealthResponse {
        let healthy = match self.backend.health_check().await {
            Ok(healthy) => healthy,
            Err(e) => {
                warn!("Health check error: {}", e);
                false
            }
        };

        HealthResponse {
            backend: self.backend.backend_type().to_string(),
            healthy,
        }
    }
}
