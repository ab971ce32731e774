use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::config::Config;
use crate::error::Result;
use crate::services::SongService;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: Arc<Config>,
    pub songs: SongService,
}

impl AppState {
    pub fn new(db: DatabaseConnection, config: Config) -> Result<Self> {
        let songs = SongService::new(db.clone(), &config)?;

        Ok(Self {
            db,
            config: Arc::new(config),
            songs,
        })
    }
}
