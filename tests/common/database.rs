//! Test database setup and management
#![allow(dead_code)]

use blogsmith::app_config::AppConfig;
use blogsmith::session::Sessions;
use blogsmith::storage::local::LocalStorage;
use blogsmith::web::AppState;
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use std::path::Path;
use std::sync::Arc;

pub const TEST_JWT_SECRET: &[u8] = b"integration-test-secret";

/// Fresh in-memory SQLite database with every table created.
///
/// The pool holds exactly one connection; an in-memory database lives only
/// as long as the connection that opened it.
pub async fn setup_test_database() -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new("sqlite::memory:".to_owned());
    opt.max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);

    let db = Database::connect(opt).await?;
    blogsmith::db::create_schema(&db).await?;
    Ok(db)
}

pub fn test_sessions() -> Sessions {
    Sessions::new(TEST_JWT_SECRET, 7, 30)
}

/// Application state over `db`, storing uploads in `upload_dir`.
pub fn test_state(db: DatabaseConnection, upload_dir: &Path) -> AppState {
    let mut config = AppConfig::default();
    config.storage.local_path = upload_dir.to_string_lossy().into_owned();
    config.limits.max_upload_size_mb = 1;

    let storage = LocalStorage::new(upload_dir.to_path_buf(), &config.storage.public_url)
        .expect("Failed to create upload storage");

    AppState {
        db,
        sessions: test_sessions(),
        storage: Arc::new(storage),
        config,
    }
}
