use serde::Deserialize;
use std::io::ErrorKind;
use std::path::PathBuf;

use super::enrichment::SongDetail;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FixtureRecord {
    group: String,
    song: String,
    release_date: String,
    text: String,
    link: String,
}

impl FixtureRecord {
    fn matches(&self, group: &str, title: &str) -> bool {
        self.group == group && self.song == title
    }
}

/// Local JSON document whose fields take precedence over stored or fetched
/// song details for one exact (group, title) pair.
///
/// The file is re-read on every call so it can be edited while the service
/// runs. Read or parse failures mean "no override".
#[derive(Debug, Clone)]
pub struct FixtureOverride {
    path: PathBuf,
}

impl FixtureOverride {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    async fn load(&self) -> Option<FixtureRecord> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!("No enrichment fixture at {}", self.path.display());
                return None;
            }
            Err(e) => {
                tracing::warn!("Failed to read enrichment fixture {}: {}", self.path.display(), e);
                return None;
            }
        };

        match serde_json::from_slice(&raw) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!("Failed to parse enrichment fixture {}: {}", self.path.display(), e);
                None
            }
        }
    }

    pub async fn lookup(&self, group: &str, title: &str) -> Option<SongDetail> {
        self.load()
            .await
            .filter(|record| record.matches(group, title))
            .map(|record| SongDetail {
                release_date: record.release_date,
                text: record.text,
                link: record.link,
            })
    }

    /// Overwrite `detail` with the fixture values when the fixture is for this song.
    pub async fn apply(&self, detail: &mut SongDetail, group: &str, title: &str) {
        if let Some(fixture) = self.lookup(group, title).await {
            tracing::debug!(group, title, "Applying enrichment fixture");
            *detail = fixture;
        }
    }
}
