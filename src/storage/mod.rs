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

// Storage backend module
//
// Provides a trait-based abstraction over the databases sensor records can
// live in (Redis, MongoDB, Cassandra, MySQL, PostgreSQL). Application code
// talks to `StorageBackend` and picks an implementation through
// `BackendFactory`.

pub mod backend;
pub mod cassandra;
pub mod factory;
pub mod mongo;
pub mod mysql;
pub mod postgres;
pub mod redis;

pub use backend::StorageBackend;
pub use cassandra::CassandraBackend;
pub use factory::{BackendFactory, BackendKind};
pub use mongo::MongoBackend;
pub use mysql::MySqlBackend;
pub use postgres::PostgresBackend;
pub use self::redis::RedisBackend;
