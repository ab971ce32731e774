pub mod entities;
pub mod repositories;

pub use entities::*;

use anyhow::{Context, Result};
use migration::MigratorTrait;
use sea_orm::{Database, DatabaseConnection};

/// Open the connection pool and bring the schema up to date.
pub async fn connect(database_url: &str) -> Result<DatabaseConnection> {
    let db = Database::connect(database_url)
        .await
        .context("failed to connect to database")?;
    tracing::info!("Connected to database");

    migration::Migrator::up(&db, None)
        .await
        .context("failed to run database migrations")?;
    tracing::info!("Database migrations completed");

    Ok(db)
}
