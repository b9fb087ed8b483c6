use serde::{Deserialize, Serialize};

/// Top-level collection on the media server (a movies folder, a shows folder, ...)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Library {
    pub id: String,
    pub name: String,
    pub library_type: LibraryType,
    pub primary_image: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum LibraryType {
    Movies,
    TvShows,
    Music,
    MusicVideos,
    HomeVideos,
    BoxSets,
    Books,
    Photos,
    Playlists,
    LiveTv,
    Games,
    Other,
}

impl LibraryType {
    /// Classify a library from the server's `CollectionType` string.
    ///
    /// Folders without a collection type are mixed content and map to `Other`.
    pub fn from_collection_type(collection_type: Option<&str>) -> Self {
        match collection_type.map(|s| s.trim().to_lowercase()).as_deref() {
            Some("movies") => LibraryType::Movies,
            Some("tvshows") => LibraryType::TvShows,
            Some("music") => LibraryType::Music,
            Some("musicvideos") => LibraryType::MusicVideos,
            Some("homevideos") => LibraryType::HomeVideos,
            Some("boxsets") => LibraryType::BoxSets,
            Some("books") => LibraryType::Books,
            Some("photos") => LibraryType::Photos,
            Some("playlists") => LibraryType::Playlists,
            Some("livetv") => LibraryType::LiveTv,
            Some("games") => LibraryType::Games,
            _ => LibraryType::Other,
        }
    }

    /// Inverse of [`LibraryType::from_collection_type`], used by config files.
    pub fn as_collection_type(&self) -> &'static str {
        match self {
            LibraryType::Movies => "movies",
            LibraryType::TvShows => "tvshows",
            LibraryType::Music => "music",
            LibraryType::MusicVideos => "musicvideos",
            LibraryType::HomeVideos => "homevideos",
            LibraryType::BoxSets => "boxsets",
            LibraryType::Books => "books",
            LibraryType::Photos => "photos",
            LibraryType::Playlists => "playlists",
            LibraryType::LiveTv => "livetv",
            LibraryType::Games => "games",
            LibraryType::Other => "other",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_collection_type() {
        assert_eq!(LibraryType::from_collection_type(Some("movies")), LibraryType::Movies);
        assert_eq!(LibraryType::from_collection_type(Some("TvShows")), LibraryType::TvShows);
        assert_eq!(LibraryType::from_collection_type(Some("boxsets")), LibraryType::BoxSets);
        assert_eq!(LibraryType::from_collection_type(None), LibraryType::Other);
        assert_eq!(LibraryType::from_collection_type(Some("unknown")), LibraryType::Other);
    }

    #[test]
    fn test_collection_type_round_trip() {
        for t in [LibraryType::Movies, LibraryType::TvShows, LibraryType::HomeVideos, LibraryType::Other] {
            assert_eq!(LibraryType::from_collection_type(Some(t.as_collection_type())), t);
        }
    }
}
