use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use media_stat_models::EpisodeRecord;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use tokio::sync::RwLock;
use tracing::{debug, info};
use crate::error::{SourceError, SourceResult};
use crate::traits::MetadataProvider;
use crate::tvdb::api::{EpisodeData, EpisodesPage, LoginRequest, LoginResponse, UpdatedPage};

/// The update feed only answers windows of at most one week
const MAX_UPDATE_WINDOW_DAYS: i64 = 7;

/// Client for TheTVDB v2 JSON API
pub struct TvdbClient {
    client: Client,
    base_url: String,
    token: RwLock<Option<String>>,
}

impl TvdbClient {
    pub fn new(base_url: &str) -> SourceResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .map_err(|e| SourceError::InvalidConfig(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: RwLock::new(None),
        })
    }

    async fn bearer(&self) -> SourceResult<String> {
        self.token
            .read()
            .await
            .clone()
            .ok_or_else(|| SourceError::Unauthorized("not logged in to metadata provider".to_string()))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> SourceResult<T> {
        let url = format!("{}{}", self.base_url, path);
        let token = self.bearer().await?;
        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .header(reqwest::header::ACCEPT, "application/json")
            .query(query)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::from_status(status, &url));
        }
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| SourceError::Decode {
            url,
            message: e.to_string(),
        })
    }
}

/// Split `[since, until)` into consecutive windows the update feed accepts
pub(crate) fn update_windows(since: DateTime<Utc>, until: DateTime<Utc>) -> Vec<(i64, i64)> {
    let mut windows = Vec::new();
    let mut from = since;
    while from < until {
        let to = std::cmp::min(from + Duration::days(MAX_UPDATE_WINDOW_DAYS), until);
        windows.push((from.timestamp(), to.timestamp()));
        from = to;
    }
    windows
}

#[async_trait]
impl MetadataProvider for TvdbClient {
    async fn login(&self, api_key: &str) -> SourceResult<String> {
        let url = format!("{}/login", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&LoginRequest { apikey: api_key })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::from_status(status, &url));
        }
        let login: LoginResponse = response.json().await.map_err(|e| SourceError::Decode {
            url: url.clone(),
            message: e.to_string(),
        })?;

        *self.token.write().await = Some(login.token.clone());
        info!("Logged in to metadata provider");
        Ok(login.token)
    }

    async fn get_episodes(&self, external_show_id: &str) -> SourceResult<Vec<EpisodeRecord>> {
        let path = format!("/series/{}/episodes", urlencoding::encode(external_show_id));
        let mut records = Vec::new();
        let mut page = Some(1u32);

        while let Some(current) = page {
            let result: EpisodesPage = self.get_json(&path, &[("page", current.to_string())]).await?;
            records.extend(result.data.into_iter().filter_map(EpisodeData::into_record));
            page = result.links.next.filter(|next| *next > current);
        }

        debug!(show = external_show_id, episodes = records.len(), "Fetched provider episodes");
        Ok(records)
    }

    async fn get_changed_shows(
        &self,
        external_ids: &[String],
        since: DateTime<Utc>,
    ) -> SourceResult<Vec<String>> {
        let wanted: HashSet<&str> = external_ids.iter().map(String::as_str).collect();
        let mut changed: Vec<String> = Vec::new();
        let mut seen = HashSet::new();

        for (from, to) in update_windows(since, Utc::now()) {
            let page: UpdatedPage = self
                .get_json(
                    "/updated/query",
                    &[("fromTime", from.to_string()), ("toTime", to.to_string())],
                )
                .await?;

            for series in page.data.unwrap_or_default() {
                let id = series.id.to_string();
                if wanted.contains(id.as_str()) && seen.insert(id.clone()) {
                    changed.push(id);
                }
            }
        }

        debug!(requested = external_ids.len(), changed = changed.len(), "Fetched changed shows");
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_windows_split_by_week() {
        let until = Utc::now();
        let since = until - Duration::days(17);
        let windows = update_windows(since, until);
        assert_eq!(windows.len(), 3);
        assert_eq!(windows[0].0, since.timestamp());
        assert_eq!(windows[2].1, until.timestamp());
        for pair in windows.windows(2) {
            assert_eq!(pair[0].1, pair[1].0);
        }
    }

    #[test]
    fn test_update_windows_empty_when_since_in_future() {
        let now = Utc::now();
        assert!(update_windows(now + Duration::hours(1), now).is_empty());
    }

    #[tokio::test]
    async fn test_calls_require_login() {
        let client = TvdbClient::new("http://127.0.0.1:9").unwrap();
        let err = client.get_episodes("123").await.unwrap_err();
        assert!(matches!(err, SourceError::Unauthorized(_)));
    }
}
