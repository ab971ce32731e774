use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use super::extract::{AppJson, AppPath};
use crate::{
    db::repositories::SongFilter,
    error::Result,
    services::{songs::parse_release_date, Pagination, SongDetail, SongPatch, SongRecord, TextPage},
    state::AppState,
};

#[derive(Deserialize)]
pub struct AddSongRequest {
    pub group: String,
    pub song: String,
}

#[derive(Deserialize)]
pub struct ListSongsQuery {
    pub group: Option<String>,
    pub song: Option<String>,
    pub release_date: Option<String>,
    pub text: Option<String>,
    pub link: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

#[derive(Deserialize)]
pub struct TextQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
}

#[derive(Serialize)]
pub struct SongMessageResponse {
    pub message: String,
    pub song_id: i32,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl From<ListSongsQuery> for SongFilter {
    fn from(query: ListSongsQuery) -> Self {
        Self {
            group: non_empty(query.group),
            title: non_empty(query.song),
            text: non_empty(query.text),
            link: non_empty(query.link),
            // An unparseable date filter is ignored rather than rejected
            release_date: query.release_date.as_deref().and_then(parse_release_date),
        }
    }
}

/// Return the detail of a song, enriching and storing it on first sight
pub async fn add_song_info(
    State(state): State<AppState>,
    AppJson(payload): AppJson<AddSongRequest>,
) -> Result<Json<SongDetail>> {
    let detail = state
        .songs
        .add_or_enrich(&payload.group, &payload.song)
        .await?;

    Ok(Json(detail))
}

pub async fn list_songs(
    State(state): State<AppState>,
    Query(query): Query<ListSongsQuery>,
) -> Result<Json<Vec<SongRecord>>> {
    let pagination = Pagination::from_params(query.page.as_deref(), query.limit.as_deref());
    let filter = SongFilter::from(query);

    Ok(Json(state.songs.list_songs(&filter, pagination).await?))
}

pub async fn get_song(
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
) -> Result<Json<SongRecord>> {
    Ok(Json(state.songs.get_song(id).await?))
}

/// Lyrics of a song, paginated by stanza
pub async fn get_song_text(
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
    Query(query): Query<TextQuery>,
) -> Result<Json<TextPage>> {
    let pagination = Pagination::from_params(query.page.as_deref(), query.limit.as_deref());

    Ok(Json(state.songs.get_text(id, pagination).await?))
}

pub async fn update_song(
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
    AppJson(patch): AppJson<SongPatch>,
) -> Result<Json<SongMessageResponse>> {
    let song = state.songs.update_song(id, patch).await?;

    Ok(Json(SongMessageResponse {
        message: "song updated successfully".to_string(),
        song_id: song.id,
    }))
}

pub async fn delete_song(
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
) -> Result<Json<SongMessageResponse>> {
    state.songs.delete_song(id).await?;

    Ok(Json(SongMessageResponse {
        message: "song deleted successfully".to_string(),
        song_id: id,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_filter_from_query_skips_empty_and_bad_date() {
        let query = ListSongsQuery {
            group: Some("Muse".to_string()),
            song: Some("  ".to_string()),
            release_date: Some("2006-07-16".to_string()),
            text: None,
            link: Some(String::new()),
            page: None,
            limit: None,
        };

        assert_eq!(
            SongFilter::from(query),
            SongFilter {
                group: Some("Muse".to_string()),
                ..Default::default()
            }
        );
    }

    #[test]
    fn test_filter_from_query_parses_date() {
        let query = ListSongsQuery {
            group: None,
            song: None,
            release_date: Some("16.07.2006".to_string()),
            text: None,
            link: None,
            page: None,
            limit: None,
        };

        assert_eq!(
            SongFilter::from(query).release_date,
            NaiveDate::from_ymd_opt(2006, 7, 16)
        );
    }
}
