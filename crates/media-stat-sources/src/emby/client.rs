use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, trace};
use crate::emby::api::{BaseItem, ItemQuery, QueryResult};
use crate::error::{SourceError, SourceResult};
use crate::traits::MediaServerClient;

const CLIENT_NAME: &str = "mediastat";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// HTTP client for the Emby/Jellyfin REST API
pub struct EmbyClient {
    client: Client,
    server_url: String,
    user_id: String,
}

impl EmbyClient {
    pub fn new(server_url: &str, user_id: &str, api_key: &str) -> SourceResult<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/json"),
        );
        headers.insert(
            reqwest::header::HeaderName::from_static("x-emby-token"),
            reqwest::header::HeaderValue::from_str(api_key)
                .map_err(|_| SourceError::InvalidConfig("API key contains invalid characters".to_string()))?,
        );
        headers.insert(
            reqwest::header::HeaderName::from_static("x-emby-client"),
            reqwest::header::HeaderValue::from_static(CLIENT_NAME),
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| SourceError::InvalidConfig(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            server_url: server_url.trim_end_matches('/').to_string(),
            user_id: user_id.to_string(),
        })
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/emby{}", self.server_url, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, query: &[(&str, String)]) -> SourceResult<T> {
        trace!(url = %url, params = ?query, "GET");
        let response = self.client.get(url).query(query).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::from_status(status, url));
        }
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| SourceError::Decode {
            url: url.to_string(),
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl MediaServerClient for EmbyClient {
    async fn get_items(&self, query: &ItemQuery) -> SourceResult<QueryResult> {
        let url = self.url(&format!("/Users/{}/Items", urlencoding::encode(&self.user_id)));
        let result: QueryResult = self.get_json(&url, &query.to_query_pairs()).await?;
        debug!(
            parent_id = ?query.parent_id,
            returned = result.items.len(),
            total = result.total_record_count,
            "Fetched items"
        );
        Ok(result)
    }

    async fn get_root_folders(&self) -> SourceResult<Vec<BaseItem>> {
        let url = self.url("/Library/MediaFolders");
        let result: QueryResult = self.get_json(&url, &[]).await?;
        debug!(count = result.items.len(), "Fetched root folders");
        Ok(result.items)
    }

    async fn ping(&self) -> SourceResult<String> {
        let url = self.url("/System/Ping");
        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::from_status(status, &url));
        }
        let body = response.text().await?;
        // Some server versions answer with a JSON string literal
        Ok(body.trim().trim_matches('"').to_string())
    }
}
