use thiserror::Error;

pub type SourceResult<T> = std::result::Result<T, SourceError>;

#[derive(Debug, Error)]
pub enum SourceError {
    /// The requested resource does not exist on the remote side (HTTP 404)
    #[error("not found: {0}")]
    NotFound(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("HTTP {status} from {url}")]
    Http { status: u16, url: String },

    #[error("request failed: {0}")]
    Transport(String),

    #[error("failed to decode response from {url}: {message}")]
    Decode { url: String, message: String },

    #[error("invalid client configuration: {0}")]
    InvalidConfig(String),
}

impl SourceError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, SourceError::NotFound(_))
    }

    /// Map a non-success status to the matching variant
    pub fn from_status(status: reqwest::StatusCode, url: &str) -> Self {
        match status {
            reqwest::StatusCode::NOT_FOUND => SourceError::NotFound(url.to_string()),
            reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => {
                SourceError::Unauthorized(url.to_string())
            }
            other => SourceError::Http { status: other.as_u16(), url: url.to_string() },
        }
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(e: reqwest::Error) -> Self {
        if let Some(status) = e.status() {
            let url = e.url().map(|u| u.to_string()).unwrap_or_default();
            return SourceError::from_status(status, &url);
        }
        SourceError::Transport(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_status_maps_to_not_found() {
        let err = SourceError::from_status(reqwest::StatusCode::NOT_FOUND, "http://x/series/1");
        assert!(err.is_not_found());
    }

    #[test]
    fn test_other_status_is_http() {
        let err = SourceError::from_status(reqwest::StatusCode::BAD_GATEWAY, "http://x");
        assert!(!err.is_not_found());
        assert_eq!(err.to_string(), "HTTP 502 from http://x");
    }
}
