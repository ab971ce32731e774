pub mod extract;
pub mod health;
pub mod songs;

use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/info", post(songs::add_song_info))
        .route("/songs", get(songs::list_songs))
        .route(
            "/songs/:id",
            get(songs::get_song)
                .patch(songs::update_song)
                .delete(songs::delete_song),
        )
        .route("/songs/:id/text", get(songs::get_song_text))
}
