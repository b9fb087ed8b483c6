//! Mapping of media server items and provider records onto catalog types.

use media_stat_models::{
    Episode, EpisodeRecord, Library, LibraryType, LocationType, MediaStream, Movie, ProviderIds,
    Season, Show, StreamType,
};
use media_stat_sources::emby::{BaseItem, ItemStream};

pub fn provider_ids(item: &BaseItem) -> ProviderIds {
    ProviderIds {
        imdb: item.provider_id("Imdb"),
        tmdb: item.provider_id("Tmdb"),
        tvdb: item.provider_id("Tvdb"),
    }
}

fn stream_type(stream: &ItemStream) -> StreamType {
    match stream.stream_type.as_deref() {
        Some(t) if t.eq_ignore_ascii_case("video") => StreamType::Video,
        Some(t) if t.eq_ignore_ascii_case("audio") => StreamType::Audio,
        Some(t) if t.eq_ignore_ascii_case("subtitle") => StreamType::Subtitle,
        _ => StreamType::Other,
    }
}

fn media_stream(stream: &ItemStream) -> MediaStream {
    MediaStream {
        stream_type: stream_type(stream),
        codec: stream.codec.clone(),
        language: stream.language.clone(),
        width: stream.width,
        height: stream.height,
        channels: stream.channels,
    }
}

pub fn library(item: &BaseItem) -> Library {
    Library {
        id: item.id.clone(),
        name: item.name.clone(),
        library_type: LibraryType::from_collection_type(item.collection_type.as_deref()),
        primary_image: item.primary_image_tag(),
    }
}

pub fn movie(item: &BaseItem, library_id: &str) -> Movie {
    Movie {
        id: item.id.clone(),
        library_id: library_id.to_string(),
        name: item.name.clone(),
        original_title: item.original_title.clone(),
        sort_name: item.sort_name.clone(),
        production_year: item.production_year,
        premiere_date: item.premiere_date,
        date_created: item.date_created,
        community_rating: item.community_rating,
        official_rating: item.official_rating.clone(),
        genres: item.genres.clone(),
        provider_ids: provider_ids(item),
        run_time_ticks: item.run_time_ticks,
        path: item.path.clone(),
        media_streams: item.media_streams.iter().map(media_stream).collect(),
    }
}

/// Show row without children; the caller attaches seasons, episodes and runtime
pub fn show(item: &BaseItem, library_id: &str) -> Show {
    Show {
        id: item.id.clone(),
        library_id: library_id.to_string(),
        name: item.name.clone(),
        sort_name: item.sort_name.clone(),
        production_year: item.production_year,
        premiere_date: item.premiere_date,
        community_rating: item.community_rating,
        official_rating: item.official_rating.clone(),
        status: item.status.clone(),
        genres: item.genres.clone(),
        provider_ids: provider_ids(item),
        path: item.path.clone(),
        cumulative_run_time_ticks: 0,
        metadata_synced: false,
        metadata_failed: false,
        seasons: Vec::new(),
        episodes: Vec::new(),
    }
}

pub fn season(item: &BaseItem, show_id: &str) -> Season {
    Season {
        id: item.id.clone(),
        show_id: show_id.to_string(),
        name: item.name.clone(),
        index_number: item.index_number,
        location_type: LocationType::Disk,
    }
}

pub fn episode(item: &BaseItem, show_id: &str, season_id: &str) -> Episode {
    Episode {
        id: item.id.clone(),
        show_id: show_id.to_string(),
        season_id: season_id.to_string(),
        name: item.name.clone(),
        index_number: item.index_number,
        index_number_end: item.index_number_end,
        run_time_ticks: item.run_time_ticks,
        premiere_date: item.premiere_date,
        provider_ids: provider_ids(item),
        location_type: LocationType::Disk,
    }
}

/// Season created for a provider season number the server does not have
pub fn synthesized_season(show_id: &str, season_number: i32) -> Season {
    let name = if season_number == 0 {
        "Specials".to_string()
    } else {
        format!("Season {}", season_number)
    };
    Season {
        id: format!("{}-season-{}", show_id, season_number),
        show_id: show_id.to_string(),
        name,
        index_number: Some(season_number),
        location_type: LocationType::Virtual,
    }
}

/// Missing episode built from a provider record
pub fn missing_episode(record: &EpisodeRecord, show_id: &str, season_id: &str) -> Episode {
    Episode {
        id: format!("{}-tvdb-{}", show_id, record.id),
        show_id: show_id.to_string(),
        season_id: season_id.to_string(),
        name: record
            .name
            .clone()
            .unwrap_or_else(|| format!("Episode {}", record.episode_number)),
        index_number: Some(record.episode_number),
        index_number_end: None,
        run_time_ticks: None,
        premiere_date: record.aired_at(),
        provider_ids: ProviderIds {
            tvdb: Some(record.id.clone()),
            ..ProviderIds::default()
        },
        location_type: LocationType::Virtual,
    }
}
