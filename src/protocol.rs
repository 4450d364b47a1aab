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

use crate::error::StorageError;
use serde::{Deserialize, Serialize};

/// Content type of a populated report
pub const CSV_CONTENT_TYPE: &str = "text/csv";

/// Content disposition of a populated report
pub const REPORT_DISPOSITION: &str = "attachment; filename=\"report.csv\"";

/// Message returned when the backend holds no records
pub const NO_DATA_MESSAGE: &str = "No data available";

/// Response message for log and purge operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend: Option<String>,
}

impl ServiceResponse {
    pub fn success(message: impl Into<String>, backend: &str) -> Self {
        Self {
            success: true,
            message: message.into(),
            backend: Some(backend.to_string()),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            message,
            backend: None,
        }
    }
}

impl From<&StorageError> for ServiceResponse {
    fn from(error: &StorageError) -> Self {
        Self::error(error.to_string())
    }
}

/// A populated CSV report with the headers an HTTP layer must send
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CsvReport {
    pub content_type: String,
    pub content_disposition: String,
    pub body: String,
    pub rows: usize,
    /// Stored entries left out because they were not valid records
    pub skipped: usize,
}

impl CsvReport {
    pub fn new(body: String, rows: usize, skipped: usize) -> Self {
        Self {
            content_type: CSV_CONTENT_TYPE.to_string(),
            content_disposition: REPORT_DISPOSITION.to_string(),
            body,
            rows,
            skipped,
        }
    }
}

/// Outcome of a report request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Report {
    Csv(CsvReport),
    NoData { message: String },
}

impl Report {
    pub fn no_data() -> Self {
        Report::NoData {
            message: NO_DATA_MESSAGE.to_string(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Report::NoData { .. })
    }
}

/// Response message for health queries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub backend: String,
    pub healthy: bool,
}
