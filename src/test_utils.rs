//! Test utilities for Song Library
//!
//! Provides helpers for creating isolated test environments with:
//! - In-memory SQLite databases (one per test)
//! - AppState factories pointed at a mock enrichment API
//! - Fixture files and test data generators

use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};

use chrono::{NaiveDate, Utc};
use migration::MigratorTrait;
use sea_orm::{ActiveModelTrait, Database, DatabaseConnection, Set};

use crate::{
    config::{Config, LogFormat, ReleaseDatePolicy},
    db::entities::{groups, songs},
    state::AppState,
};

/// Global counter for test isolation
static TEST_COUNTER: AtomicU32 = AtomicU32::new(0);

/// Get a unique test ID for this test
pub fn get_test_id() -> u32 {
    TEST_COUNTER.fetch_add(1, Ordering::SeqCst)
}

/// Setup an in-memory SQLite database with all migrations applied
///
/// Each call creates a fresh, isolated database perfect for parallel testing
pub async fn setup_test_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");

    migration::Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    db
}

/// Create a test configuration pointing the enrichment client at `enrichment_url`
///
/// The fixture path does not exist, so no fixture override applies unless a
/// test sets one up.
pub fn test_config(enrichment_url: &str) -> Config {
    Config {
        database_url: "sqlite::memory:".to_string(),
        server_host: "127.0.0.1".to_string(),
        server_port: 8080,
        enrichment_api_url: enrichment_url.to_string(),
        enrichment_info_path: "/info".to_string(),
        enrichment_timeout: None,
        fixture_path: std::env::temp_dir().join(format!(
            "song_library_missing_fixture_{}_{}.json",
            std::process::id(),
            get_test_id()
        )),
        fixture_fallback: false,
        release_date_policy: ReleaseDatePolicy::DefaultNow,
        log_format: LogFormat::Pretty,
    }
}

/// Create a complete test AppState with an isolated database
pub async fn setup_test_app_state(enrichment_url: &str) -> AppState {
    setup_test_app_state_with_config(test_config(enrichment_url)).await
}

pub async fn setup_test_app_state_with_config(config: Config) -> AppState {
    let db = setup_test_db().await;
    AppState::new(db, config).expect("Failed to build test AppState")
}

/// Write `contents` to a fresh fixture file and return its path
pub fn write_test_fixture(contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!(
        "song_library_fixture_{}_{}.json",
        std::process::id(),
        get_test_id()
    ));
    std::fs::write(&path, contents).expect("Failed to write test fixture");
    path
}

// ============================================================================
// Test Data Factories
// ============================================================================

/// Create a test group in the database
pub async fn create_test_group(db: &DatabaseConnection, name: &str) -> groups::Model {
    let group = groups::ActiveModel {
        name: Set(name.to_string()),
        ..Default::default()
    };

    group.insert(db).await.expect("Failed to insert test group")
}

/// Create a test song in the database
pub async fn create_test_song(
    db: &DatabaseConnection,
    group_id: i32,
    title: &str,
    text: &str,
) -> songs::Model {
    let song = songs::ActiveModel {
        group_id: Set(group_id),
        title: Set(title.to_string()),
        release_date: Set(NaiveDate::from_ymd_opt(2006, 7, 16).expect("valid date")),
        text: Set(text.to_string()),
        link: Set(format!("https://example.com/{}", title.replace(' ', "-"))),
        created_at: Set(Utc::now().into()),
        ..Default::default()
    };

    song.insert(db).await.expect("Failed to insert test song")
}
