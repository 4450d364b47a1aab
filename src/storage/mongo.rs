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

// MongoDB backend: one document per record in a single collection

use super::backend::StorageBackend;
use crate::config::MongoConfig;
use crate::error::{StorageError, StorageResult};
use crate::record::SensorRecord;
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{doc, Bson, Document};
use mongodb::options::{ClientOptions, Credential, ServerAddress};
use mongodb::{Client, Collection, Database};
use serde_json::Value;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, error, info, warn};

const BACKEND: &str = "mongo";

/// Document store driver.
///
/// `purge` issues `delete_many({})`, which is not atomic across documents: a
/// concurrent reader may observe a partially purged collection.
pub struct MongoBackend {
    config: MongoConfig,
    connect_timeout: Duration,
    client: OnceCell<Client>,
}

impl MongoBackend {
    pub fn new(config: MongoConfig, connect_timeout: Duration) -> Self {
        Self {
            config,
            connect_timeout,
            client: OnceCell::new(),
        }
    }

    async fn database(&self) -> Result<Database, String> {
        let client = self
            .client
            .get_or_try_init(|| async {
                let options = client_options(&self.config, self.connect_timeout);
                let client = Client::with_options(options).map_err(|e| e.to_string())?;
                info!("Created MongoDB client for {}", self.config.host);
                Ok::<_, String>(client)
            })
            .await?;

        Ok(client.database(&self.config.database))
    }

    async fn collection<T: Send + Sync>(&self) -> Result<Collection<T>, String> {
        Ok(self.database().await?.collection(&self.config.collection))
    }
}

/// Client settings with credentials carried as fields, never inside a URI
fn client_options(config: &MongoConfig, connect_timeout: Duration) -> ClientOptions {
    let mut options = ClientOptions::default();
    options.hosts = vec![ServerAddress::Tcp {
        host: config.host.clone(),
        port: Some(config.port),
    }];
    if config.username.is_some() {
        let mut credential = Credential::default();
        credential.username = config.username.clone();
        credential.password = config.password.clone();
        options.credential = Some(credential);
    }
    options.app_name = Some("sensor-datastore".to_string());
    options.connect_timeout = Some(connect_timeout);
    options.server_selection_timeout = Some(connect_timeout);
    options
}

/// Read a stored document as a record; `_id` and unknown fields are ignored
fn document_to_record(document: Document) -> StorageResult<SensorRecord> {
    match Bson::Document(document).into_relaxed_extjson() {
        Value::Object(map) => SensorRecord::from_map(&map),
        other => Err(StorageError::MalformedRecord(format!(
            "expected a document, found {}",
            other
        ))),
    }
}

#[async_trait]
impl StorageBackend for MongoBackend {
    async fn provision(&self) -> StorageResult<()> {
        let database = self
            .database()
            .await
            .map_err(|e| StorageError::provision(BACKEND, e))?;

        let existing = database
            .list_collection_names()
            .await
            .map_err(|e| StorageError::provision(BACKEND, e))?;

        if existing.iter().any(|name| name == &self.config.collection) {
            info!(
                "Collection '{}.{}' already exists",
                self.config.database, self.config.collection
            );
            return Ok(());
        }

        info!(
            "Creating collection '{}.{}'",
            self.config.database, self.config.collection
        );
        match database.create_collection(&self.config.collection).await {
            Ok(()) => Ok(()),
            // Lost a race with another provisioner
            Err(e) if e.to_string().contains("already exists") => Ok(()),
            Err(e) => Err(StorageError::provision(BACKEND, e)),
        }
    }

    async fn store(&self, record: &SensorRecord) -> StorageResult<()> {
        let collection = self
            .collection::<SensorRecord>()
            .await
            .map_err(|e| StorageError::store(BACKEND, e))?;

        collection.insert_one(record).await.map_err(|e| {
            error!("MongoDB insert failed: {}", e);
            StorageError::store(BACKEND, e)
        })?;

        debug!("Stored record in MongoDB: {:?}", record.key());
        Ok(())
    }

    async fn fetch_all(&self) -> StorageResult<Vec<String>> {
        let collection = self
            .collection::<Document>()
            .await
            .map_err(|e| StorageError::fetch(BACKEND, e))?;

        // Raw documents; entries that are not records are skipped below
        let mut cursor = collection
            .find(doc! {})
            .await
            .map_err(|e| StorageError::fetch(BACKEND, e))?;

        let mut records = Vec::new();
        while let Some(document) = cursor.try_next().await.map_err(|e| {
            error!("MongoDB cursor failed: {}", e);
            StorageError::fetch(BACKEND, e)
        })? {
            match document_to_record(document) {
                Ok(record) => records.push(record),
                Err(e) => warn!("Skipping MongoDB document: {}", e),
            }
        }

        info!("Fetched {} records from MongoDB", records.len());
        Ok(records.iter().map(SensorRecord::to_json).collect())
    }

    async fn purge(&self) -> StorageResult<()> {
        let collection = self
            .collection::<Document>()
            .await
            .map_err(|e| StorageError::purge(BACKEND, e))?;

        let result = collection.delete_many(doc! {}).await.map_err(|e| {
            error!("MongoDB delete_many failed: {}", e);
            StorageError::purge(BACKEND, e)
        })?;

        info!("MongoDB sensor data purged ({} documents)", result.deleted_count);
        Ok(())
    }

    async fn health_check(&self) -> StorageResult<bool> {
        let database = match self.database().await {
            Ok(database) => database,
            Err(e) => {
                warn!("Health check failed - cannot create MongoDB client: {}", e);
                return Ok(false);
            }
        };

        match database.run_command(doc! { "ping": 1 }).await {
            Ok(_) => Ok(true),
            Err(e) => {
                warn!("Health check failed - MongoDB ping error: {}", e);
                Ok(false)
            }
        }
    }

    fn backend_type(&self) -> &str {
        BACKEND
    }
}
