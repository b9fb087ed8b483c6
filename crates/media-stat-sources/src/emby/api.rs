use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashMap;

/// Item type names as used by the server in `Type` and `IncludeItemTypes`
pub mod item_types {
    pub const MOVIE: &str = "Movie";
    pub const BOX_SET: &str = "BoxSet";
    pub const SERIES: &str = "Series";
    pub const SEASON: &str = "Season";
    pub const EPISODE: &str = "Episode";
}

/// Extra fields requested for movies
pub const MOVIE_FIELDS: &[&str] = &[
    "Genres", "DateCreated", "MediaSources", "OriginalTitle", "MediaStreams", "Path",
    "ProviderIds", "SortName", "ParentId", "PremiereDate", "CommunityRating",
    "OfficialRating", "ProductionYear", "RunTimeTicks",
];

/// Extra fields requested for series, seasons and episodes
pub const SHOW_FIELDS: &[&str] = &[
    "OriginalTitle", "Genres", "DateCreated", "Path", "ProviderIds", "SortName", "ParentId",
    "PremiereDate", "CommunityRating", "OfficialRating", "ProductionYear", "Status",
    "RunTimeTicks",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// Parameters of an `/Users/{id}/Items` request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemQuery {
    pub parent_id: Option<String>,
    pub recursive: bool,
    pub include_item_types: Vec<String>,
    pub fields: Vec<String>,
    pub start_index: Option<u32>,
    pub limit: Option<u32>,
    pub sort_by: Vec<String>,
    pub sort_order: Option<SortOrder>,
    pub enable_total_record_count: bool,
}

impl ItemQuery {
    pub fn under(parent_id: impl Into<String>) -> Self {
        Self {
            parent_id: Some(parent_id.into()),
            recursive: true,
            enable_total_record_count: true,
            ..Self::default()
        }
    }

    pub fn with_types(mut self, types: &[&str]) -> Self {
        self.include_item_types = types.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn with_fields(mut self, fields: &[&str]) -> Self {
        self.fields = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn with_page(mut self, start_index: u32, limit: u32) -> Self {
        self.start_index = Some(start_index);
        self.limit = Some(limit);
        self
    }

    pub fn sorted_by(mut self, field: &str, order: SortOrder) -> Self {
        self.sort_by = vec![field.to_string()];
        self.sort_order = Some(order);
        self
    }

    /// Render as query-string pairs in the server's parameter names
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(ref parent_id) = self.parent_id {
            pairs.push(("ParentId", parent_id.clone()));
        }
        pairs.push(("Recursive", self.recursive.to_string()));
        if !self.include_item_types.is_empty() {
            pairs.push(("IncludeItemTypes", self.include_item_types.join(",")));
        }
        if !self.fields.is_empty() {
            pairs.push(("Fields", self.fields.join(",")));
        }
        if let Some(start) = self.start_index {
            pairs.push(("StartIndex", start.to_string()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("Limit", limit.to_string()));
        }
        if !self.sort_by.is_empty() {
            pairs.push(("SortBy", self.sort_by.join(",")));
        }
        if let Some(order) = self.sort_order {
            let order = match order {
                SortOrder::Ascending => "Ascending",
                SortOrder::Descending => "Descending",
            };
            pairs.push(("SortOrder", order.to_string()));
        }
        pairs.push(("LocationTypes", "FileSystem".to_string()));
        pairs.push(("EnableTotalRecordCount", self.enable_total_record_count.to_string()));
        pairs
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct QueryResult {
    #[serde(default)]
    pub items: Vec<BaseItem>,
    #[serde(default)]
    pub total_record_count: u32,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct ItemStream {
    #[serde(rename = "Type")]
    pub stream_type: Option<String>,
    pub codec: Option<String>,
    pub language: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub channels: Option<u32>,
}

/// Subset of the server's `BaseItemDto` the pipeline reads
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct BaseItem {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "Type")]
    pub item_type: Option<String>,
    pub collection_type: Option<String>,
    pub parent_id: Option<String>,
    pub series_id: Option<String>,
    pub season_id: Option<String>,
    pub original_title: Option<String>,
    pub sort_name: Option<String>,
    pub index_number: Option<i32>,
    pub index_number_end: Option<i32>,
    pub run_time_ticks: Option<i64>,
    pub production_year: Option<i32>,
    pub premiere_date: Option<DateTime<Utc>>,
    pub date_created: Option<DateTime<Utc>>,
    pub community_rating: Option<f32>,
    pub official_rating: Option<String>,
    pub status: Option<String>,
    pub path: Option<String>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub provider_ids: HashMap<String, String>,
    #[serde(default)]
    pub image_tags: HashMap<String, String>,
    #[serde(default)]
    pub media_streams: Vec<ItemStream>,
}

impl BaseItem {
    pub fn is_type(&self, item_type: &str) -> bool {
        self.item_type.as_deref() == Some(item_type)
    }

    /// Provider id lookup, case-insensitive on the provider name
    pub fn provider_id(&self, provider: &str) -> Option<String> {
        self.provider_ids
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(provider))
            .map(|(_, v)| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    pub fn primary_image_tag(&self) -> Option<String> {
        self.image_tags.get("Primary").cloned()
    }
}
