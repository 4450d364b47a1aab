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

// Sensor reading storage with interchangeable database backends
//
// This crate:
// - Persists sensor readings to Redis, MongoDB, Cassandra, MySQL or PostgreSQL
//   behind a single `StorageBackend` contract
// - Selects the backend from a configuration token
// - Provisions each backend's namespace idempotently at startup
// - Exports accumulated readings as a single CSV document

pub mod config;
pub mod error;
pub mod export;
pub mod protocol;
pub mod record;
pub mod service;
pub mod storage;

// Re-export main types
pub use config::{config_from_env, load_config, load_config_with_env, AppConfig};
pub use error::{StorageError, StorageResult};
pub use export::{records_to_csv, TabularDocument};
pub use protocol::{CsvReport, HealthResponse, Report, ServiceResponse};
pub use record::SensorRecord;
pub use service::SensorService;
pub use storage::{BackendFactory, BackendKind, StorageBackend};
