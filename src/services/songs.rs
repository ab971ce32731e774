use chrono::{NaiveDate, Utc};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use serde::{Deserialize, Serialize};

use super::enrichment::{EnrichmentService, SongDetail};
use super::fixture::FixtureOverride;
use crate::config::{Config, ReleaseDatePolicy};
use crate::db::entities::{groups, songs};
use crate::db::repositories::{GroupRepository, NewSong, SongFilter, SongRepository};
use crate::error::{AppError, Result};

/// Date format used on the wire for release dates, e.g. `16.07.2006`.
pub const RELEASE_DATE_FORMAT: &str = "%d.%m.%Y";

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_LIMIT: u64 = 10;

const STANZA_SEPARATOR: &str = "\n\n";
const LINK_SCHEMES: [&str; 2] = ["http://", "https://"];

pub fn parse_release_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), RELEASE_DATE_FORMAT).ok()
}

pub fn format_release_date(date: NaiveDate) -> String {
    date.format(RELEASE_DATE_FORMAT).to_string()
}

/// 1-based page number and page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u64,
    pub limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl Pagination {
    /// Missing, unparseable and zero values fall back to the defaults.
    pub fn from_params(page: Option<&str>, limit: Option<&str>) -> Self {
        fn positive(raw: Option<&str>) -> Option<u64> {
            raw.and_then(|value| value.trim().parse::<u32>().ok())
                .filter(|value| *value >= 1)
                .map(u64::from)
        }

        Self {
            page: positive(page).unwrap_or(DEFAULT_PAGE),
            limit: positive(limit).unwrap_or(DEFAULT_LIMIT),
        }
    }

    /// Rows to skip, or `None` when the page starts beyond anything the
    /// database can address (offsets are bound as `i64`).
    pub fn offset(&self) -> Option<u64> {
        self.page
            .checked_sub(1)?
            .checked_mul(self.limit)
            .filter(|offset| *offset <= i64::MAX as u64)
    }
}

/// A song joined with its group, as listed over HTTP.
#[derive(Debug, Clone, Serialize)]
pub struct SongRecord {
    pub id: i32,
    pub group_id: i32,
    pub group: groups::Model,
    pub title: String,
    pub release_date: NaiveDate,
    pub text: String,
    pub link: String,
    pub created_at: DateTimeWithTimeZone,
}

impl SongRecord {
    fn new(song: songs::Model, group: groups::Model) -> Self {
        Self {
            id: song.id,
            group_id: song.group_id,
            group,
            title: song.title,
            release_date: song.release_date,
            text: song.text,
            link: song.link,
            created_at: song.created_at,
        }
    }
}

impl From<&songs::Model> for SongDetail {
    fn from(song: &songs::Model) -> Self {
        Self {
            release_date: format_release_date(song.release_date),
            text: song.text.clone(),
            link: song.link.clone(),
        }
    }
}

/// One page of a song's stanzas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextPage {
    pub song_id: i32,
    pub page: u64,
    pub text: Vec<String>,
    pub total: u64,
    pub limit: u64,
    pub total_page: u64,
}

/// Split lyrics into stanzas on blank lines. Joining the result with a blank
/// line gives back the (newline-normalized) lyrics.
pub fn split_stanzas(text: &str) -> Vec<String> {
    text.replace("\r\n", "\n")
        .split(STANZA_SEPARATOR)
        .map(str::to_string)
        .collect()
}

pub fn paginate_stanzas(song_id: i32, stanzas: Vec<String>, pagination: Pagination) -> Result<TextPage> {
    let total = stanzas.len() as u64;
    let begin = match pagination.offset() {
        Some(begin) if begin < total => begin,
        _ => {
            return Err(AppError::NotFound(
                "no text found for requested page".to_string(),
            ))
        }
    };

    let text = stanzas
        .into_iter()
        .skip(begin as usize)
        .take(pagination.limit as usize)
        .collect();

    Ok(TextPage {
        song_id,
        page: pagination.page,
        text,
        total,
        limit: pagination.limit,
        total_page: total.div_ceil(pagination.limit),
    })
}

/// Partial update of a song. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SongPatch {
    pub group_id: Option<i32>,
    pub title: Option<String>,
    pub release_date: Option<String>,
    #[serde(alias = "lyrics")]
    pub text: Option<String>,
    pub link: Option<String>,
}

fn validate_link(link: &str) -> Result<()> {
    if LINK_SCHEMES.iter().any(|scheme| link.starts_with(scheme)) {
        Ok(())
    } else {
        Err(AppError::Validation("invalid link format".to_string()))
    }
}

#[derive(Clone)]
pub struct SongService {
    songs: SongRepository,
    groups: GroupRepository,
    enrichment: EnrichmentService,
    fixture: FixtureOverride,
    release_date_policy: ReleaseDatePolicy,
    fixture_fallback: bool,
}

impl SongService {
    pub fn new(db: DatabaseConnection, config: &Config) -> Result<Self> {
        Ok(Self {
            songs: SongRepository::new(db.clone()),
            groups: GroupRepository::new(db),
            enrichment: EnrichmentService::new(config)?,
            fixture: FixtureOverride::new(config.fixture_path.clone()),
            release_date_policy: config.release_date_policy,
            fixture_fallback: config.fixture_fallback,
        })
    }

    /// Return the detail of a known song, or enrich and store an unknown one.
    ///
    /// The fixture override is applied to the answer in both cases, so it may
    /// differ from what is stored.
    pub async fn add_or_enrich(&self, group: &str, title: &str) -> Result<SongDetail> {
        if group.trim().is_empty() || title.trim().is_empty() {
            return Err(AppError::Validation(
                "group and song must not be empty".to_string(),
            ));
        }

        let song = match self.songs.find_by_group_and_title(group, title).await? {
            Some(song) => song,
            None => {
                tracing::info!(group, title, "Song not found, requesting enrichment");

                let detail = self.enrich(group, title).await?;
                let release_date = self.resolve_release_date(&detail.release_date)?;

                let song = self
                    .songs
                    .create_with_group(
                        group,
                        NewSong {
                            title: title.to_string(),
                            release_date,
                            text: detail.text,
                            link: detail.link,
                        },
                    )
                    .await?;

                tracing::info!(song_id = song.id, group, title, "Added new song");
                song
            }
        };

        let mut detail = SongDetail::from(&song);
        self.fixture.apply(&mut detail, group, title).await;

        Ok(detail)
    }

    async fn enrich(&self, group: &str, title: &str) -> Result<SongDetail> {
        match self.enrichment.fetch(group, title).await {
            Ok(detail) => Ok(detail),
            Err(e) if self.fixture_fallback => match self.fixture.lookup(group, title).await {
                Some(detail) => {
                    tracing::warn!(group, title, "Song info lookup failed ({}), using fixture", e);
                    Ok(detail)
                }
                None => Err(e),
            },
            Err(e) => Err(e),
        }
    }

    fn resolve_release_date(&self, raw: &str) -> Result<NaiveDate> {
        if let Some(date) = parse_release_date(raw) {
            return Ok(date);
        }

        match self.release_date_policy {
            ReleaseDatePolicy::DefaultNow => {
                tracing::warn!("Unparseable release date {:?}, using today", raw);
                Ok(Utc::now().date_naive())
            }
            ReleaseDatePolicy::Reject => Err(AppError::ExternalApi(format!(
                "unparseable release date {:?}",
                raw
            ))),
        }
    }

    pub async fn list_songs(&self, filter: &SongFilter, pagination: Pagination) -> Result<Vec<SongRecord>> {
        let Some(offset) = pagination.offset() else {
            tracing::debug!(page = pagination.page, limit = pagination.limit, "Page beyond addressable range");
            return Ok(Vec::new());
        };

        let rows = self.songs.list(filter, offset, pagination.limit).await?;

        let records: Vec<SongRecord> = rows
            .into_iter()
            .filter_map(|(song, group)| group.map(|g| SongRecord::new(song, g)))
            .collect();

        tracing::debug!(count = records.len(), page = pagination.page, "Songs retrieved");
        Ok(records)
    }

    pub async fn get_song(&self, id: i32) -> Result<SongRecord> {
        match self.songs.find_with_group(id).await? {
            Some((song, Some(group))) => Ok(SongRecord::new(song, group)),
            Some((song, None)) => Err(AppError::Internal(format!(
                "song {} references missing group {}",
                song.id, song.group_id
            ))),
            None => Err(AppError::NotFound("song not found".to_string())),
        }
    }

    pub async fn get_text(&self, id: i32, pagination: Pagination) -> Result<TextPage> {
        let song = self
            .songs
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("song not found".to_string()))?;

        if song.text.trim().is_empty() {
            return Err(AppError::NotFound("text not found".to_string()));
        }

        let page = paginate_stanzas(id, split_stanzas(&song.text), pagination)?;
        tracing::debug!(song_id = id, page = pagination.page, "Retrieved song text");

        Ok(page)
    }

    /// Validate every supplied field, then write only those fields.
    pub async fn update_song(&self, id: i32, patch: SongPatch) -> Result<songs::Model> {
        let song = self
            .songs
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("song not found".to_string()))?;

        if let Some(group_id) = patch.group_id {
            if self.groups.find_by_id(group_id).await?.is_none() {
                return Err(AppError::Validation("group not found".to_string()));
            }
        }

        if let Some(title) = &patch.title {
            if title.trim().is_empty() {
                return Err(AppError::Validation("title must not be empty".to_string()));
            }
        }

        if patch.group_id.is_some() || patch.title.is_some() {
            let group_id = patch.group_id.unwrap_or(song.group_id);
            let title = patch.title.as_deref().unwrap_or(&song.title);
            if self.songs.title_taken(group_id, title, id).await? {
                return Err(AppError::Validation(
                    "song title already exists in this group".to_string(),
                ));
            }
        }

        let release_date = match &patch.release_date {
            Some(raw) => Some(parse_release_date(raw).ok_or_else(|| {
                AppError::Validation("invalid release date format".to_string())
            })?),
            None => None,
        };

        if let Some(link) = &patch.link {
            validate_link(link)?;
        }

        let mut active: songs::ActiveModel = song.into();

        if let Some(group_id) = patch.group_id {
            active.group_id = Set(group_id);
        }
        if let Some(title) = patch.title {
            active.title = Set(title);
        }
        if let Some(date) = release_date {
            active.release_date = Set(date);
        }
        if let Some(text) = patch.text {
            active.text = Set(text);
        }
        if let Some(link) = patch.link {
            active.link = Set(link);
        }

        if !active.is_changed() {
            tracing::debug!(song_id = id, "Song update carried no changes");
            return self
                .songs
                .find_by_id(id)
                .await?
                .ok_or_else(|| AppError::NotFound("song not found".to_string()));
        }

        let updated = self.songs.update(active).await?;
        tracing::info!(song_id = id, "Song updated");

        Ok(updated)
    }

    /// Delete by id. A missing id is not an error; the affected row count is returned.
    pub async fn delete_song(&self, id: i32) -> Result<u64> {
        let deleted = self.songs.delete(id).await?;

        if deleted == 0 {
            tracing::info!(song_id = id, "Delete requested for unknown song");
        } else {
            tracing::info!(song_id = id, "Song deleted");
        }

        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn stanzas(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("verse {i}")).collect()
    }

    #[test]
    fn test_pagination_defaults() {
        assert_eq!(Pagination::from_params(None, None), Pagination::default());
        assert_eq!(
            Pagination::from_params(Some("0"), Some("-3")),
            Pagination { page: 1, limit: 10 }
        );
        assert_eq!(
            Pagination::from_params(Some("abc"), Some("5")),
            Pagination { page: 1, limit: 5 }
        );
        assert_eq!(
            Pagination::from_params(Some("3"), Some("20")),
            Pagination { page: 3, limit: 20 }
        );
        assert_eq!(Pagination { page: 3, limit: 20 }.offset(), Some(40));
    }

    #[test]
    fn test_offset_beyond_i64_is_none() {
        let huge = Pagination::from_params(Some("3000000000"), Some("4000000000"));
        assert_eq!(huge, Pagination { page: 3_000_000_000, limit: 4_000_000_000 });
        assert_eq!(huge.offset(), None);

        let text = paginate_stanzas(1, stanzas(3), huge);
        assert!(matches!(text, Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_split_stanzas() {
        assert_eq!(
            split_stanzas("a\nb\n\nc\r\n\r\nd"),
            vec!["a\nb".to_string(), "c".to_string(), "d".to_string()]
        );
        assert_eq!(split_stanzas("single"), vec!["single".to_string()]);
    }

    #[test]
    fn test_paginate_second_of_two() {
        let page = paginate_stanzas(42, stanzas(2), Pagination { page: 2, limit: 1 }).unwrap();

        assert_eq!(
            page,
            TextPage {
                song_id: 42,
                page: 2,
                text: vec!["verse 2".to_string()],
                total: 2,
                limit: 1,
                total_page: 2,
            }
        );
    }

    #[test]
    fn test_pages_reconstruct_stanzas() {
        let all = stanzas(7);
        let limit = 3;
        let first = paginate_stanzas(1, all.clone(), Pagination { page: 1, limit }).unwrap();
        assert_eq!(first.total_page, 3);

        let mut collected = Vec::new();
        for page in 1..=first.total_page {
            let p = paginate_stanzas(1, all.clone(), Pagination { page, limit }).unwrap();
            assert!(p.text.len() as u64 <= limit);
            collected.extend(p.text);
        }
        assert_eq!(collected, all);

        let beyond = paginate_stanzas(1, all, Pagination { page: 4, limit });
        assert!(matches!(beyond, Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_release_date_format() {
        let date = parse_release_date("16.07.2006").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2006, 7, 16).unwrap());
        assert_eq!(format_release_date(date), "16.07.2006");
        assert!(parse_release_date("2006-07-16").is_none());
        assert!(parse_release_date("31.02.2006").is_none());
    }

    #[test]
    fn test_validate_link() {
        assert!(validate_link("https://example.com/song").is_ok());
        assert!(validate_link("http://x").is_ok());
        assert!(validate_link("not-a-url").is_err());
        assert!(validate_link("ftp://example.com").is_err());
    }

    #[test]
    fn test_patch_accepts_lyrics_alias() {
        let patch: SongPatch = serde_json::from_str(r#"{"lyrics": "new words"}"#).unwrap();
        assert_eq!(patch.text.as_deref(), Some("new words"));
        assert!(patch.title.is_none());
    }
}
