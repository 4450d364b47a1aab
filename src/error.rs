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

// Error taxonomy for the storage port and the export engine

use thiserror::Error;

/// Errors surfaced by storage drivers, the backend selector and record parsing.
///
/// Every driver failure is returned to the caller. Logging happens alongside,
/// never instead of, the returned error.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Unknown backend token or unusable connection settings
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Namespace/schema could not be created or verified
    #[error("{backend} provisioning failed: {reason}")]
    Provision { backend: String, reason: String },

    #[error("{backend} store failed: {reason}")]
    Store { backend: String, reason: String },

    #[error("{backend} fetch failed: {reason}")]
    Fetch { backend: String, reason: String },

    #[error("{backend} purge failed: {reason}")]
    Purge { backend: String, reason: String },

    /// A value could not be read as a sensor record
    #[error("malformed record: {0}")]
    MalformedRecord(String),

    #[error("CSV export failed: {0}")]
    Export(#[from] csv::Error),
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;

impl StorageError {
    pub fn provision(backend: &str, reason: impl std::fmt::Display) -> Self {
        StorageError::Provision {
            backend: backend.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn store(backend: &str, reason: impl std::fmt::Display) -> Self {
        StorageError::Store {
            backend: backend.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn fetch(backend: &str, reason: impl std::fmt::Display) -> Self {
        StorageError::Fetch {
            backend: backend.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn purge(backend: &str, reason: impl std::fmt::Display) -> Self {
        StorageError::Purge {
            backend: backend.to_string(),
            reason: reason.to_string(),
        }
    }

    /// True for errors caused by backend connectivity or rejection, which a
    /// caller may choose to retry.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            StorageError::Store { .. } | StorageError::Fetch { .. } | StorageError::Purge { .. }
        )
    }
}
