use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{AppError, Result};

/// Release date, lyrics and link of a song, as served by the info API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SongDetail {
    #[serde(rename = "releaseDate")]
    pub release_date: String,
    pub text: String,
    pub link: String,
}

/// Client for the external song info API.
#[derive(Clone)]
pub struct EnrichmentService {
    client: Client,
    base_url: String,
    info_path: String,
}

impl EnrichmentService {
    pub fn new(config: &Config) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.enrichment_timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            base_url: config.enrichment_api_url.trim_end_matches('/').to_string(),
            info_path: config.enrichment_info_path.clone(),
        })
    }

    fn info_url(&self, group: &str, title: &str) -> String {
        format!(
            "{}{}?group={}&song={}",
            self.base_url,
            self.info_path,
            urlencoding::encode(group),
            urlencoding::encode(title)
        )
    }

    /// Look up the detail of a song. Any failure, including "not found"
    /// upstream, comes back as an error.
    pub async fn fetch(&self, group: &str, title: &str) -> Result<SongDetail> {
        let url = self.info_url(group, title);
        tracing::debug!("Song info request: {}", url);

        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::ExternalApi(format!(
                "song info API returned {} for group={:?} song={:?}",
                status, group, title
            )));
        }

        let body = response.text().await?;
        let detail: SongDetail = serde_json::from_str(&body)?;

        Ok(detail)
    }
}
