// Configuration system integration tests

use sensor_datastore::config::{load_config, load_config_with_env, AppConfig};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn write_config(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).expect("Failed to write temp config");
    path
}

#[test]
fn test_load_default_config() {
    let config_path = PathBuf::from("config/default.yaml");

    if config_path.exists() {
        let result = load_config(&config_path);
        assert!(result.is_ok(), "Failed to load default config: {:?}", result.err());

        let config = result.unwrap();

        assert_eq!(config.storage.connect_timeout_seconds, 5);
        assert_eq!(config.storage.redis.list_key, "sensor_data");
        assert_eq!(config.storage.cassandra.keyspace, "sensor_data_db");
        assert_eq!(config.storage.mysql.port, 3306);
        assert_eq!(config.storage.postgres.username, "postgres");
        assert_eq!(config.logging.level, "info");
    }
}

#[test]
fn test_config_with_env_vars() {
    let temp_config = r#"
storage:
  backend: ${SDS_IT_BACKEND:-redis}
  mongo:
    host: ${SDS_IT_MONGO_HOST}
    database: ${SDS_IT_MONGO_DB:-readings}
logging:
  level: debug
"#;

    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "env.yaml", temp_config);

    std::env::set_var("SDS_IT_BACKEND", "Mongo");
    std::env::set_var("SDS_IT_MONGO_HOST", "mongo.internal");
    std::env::remove_var("SDS_IT_MONGO_DB");

    let result = load_config(&path);
    assert!(result.is_ok(), "Failed to load config with env vars: {:?}", result.err());

    let config = result.unwrap();
    assert_eq!(config.storage.backend, "Mongo");
    assert_eq!(config.storage.mongo.host, "mongo.internal");
    assert_eq!(config.storage.mongo.database, "readings"); // Uses default
    assert_eq!(config.storage.mongo.port, 27017);
    assert_eq!(config.logging.level, "debug");

    std::env::remove_var("SDS_IT_BACKEND");
    std::env::remove_var("SDS_IT_MONGO_HOST");
}

#[test]
fn test_env_overrides_backend_and_host() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "override.yaml", "storage:\n  backend: redis\n");

    std::env::set_var("DATA_ACCESS", "postgres");
    std::env::set_var("DATA_HOSTNAME", "DB-HOST");

    let result = load_config_with_env(&path);

    std::env::remove_var("DATA_ACCESS");
    std::env::remove_var("DATA_HOSTNAME");

    let config = result.expect("Failed to load config with overrides");
    assert_eq!(config.storage.backend, "postgres");
    assert_eq!(config.storage.postgres.host, "db-host");
    assert_eq!(config.storage.redis.host, "db-host");
}

#[test]
fn test_config_validation() {
    let invalid_config = r#"
storage:
  backend: oracle
"#;

    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "invalid.yaml", invalid_config);

    let result = load_config(&path);
    assert!(result.is_err(), "Expected validation error for unknown backend");
    assert!(format!("{:#}", result.unwrap_err()).contains("Unknown storage backend"));
}

#[test]
fn test_config_rejects_unsafe_table_name() {
    let invalid_config = r#"
storage:
  backend: mysql
  mysql:
    table: "sensor data"
"#;

    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "table.yaml", invalid_config);

    let result = load_config(&path);
    assert!(result.is_err());
    assert!(format!("{:#}", result.unwrap_err()).contains("mysql.table"));
}

#[test]
fn test_missing_file() {
    let result = load_config("/nonexistent/sensor-datastore.yaml");
    assert!(result.is_err());
}

#[test]
fn test_backend_factory() {
    use sensor_datastore::config::StorageConfig;
    use sensor_datastore::storage::BackendFactory;

    let storage_config = StorageConfig {
        backend: "cassandra".to_string(),
        ..StorageConfig::default()
    };

    let result = BackendFactory::create(&storage_config);
    assert!(result.is_ok(), "Failed to create backend: {:?}", result.err());

    let backend = result.unwrap();
    assert_eq!(backend.backend_type(), "cassandra");
}

#[test]
fn test_config_defaults() {
    let config = AppConfig::default();

    assert_eq!(config.storage.backend, "redis");
    assert_eq!(config.storage.connect_timeout_seconds, 5);
    assert_eq!(config.storage.redis.port, 6379);
    assert_eq!(config.storage.mongo.collection, "sensor_data");
    assert_eq!(config.storage.cassandra.replication_factor, 1);
    assert_eq!(config.storage.mysql.username, "root");
    assert_eq!(config.storage.postgres.max_connections, 5);
    assert_eq!(config.logging.format, "text");
}
