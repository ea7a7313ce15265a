//! Error types, one enum per failure class.
//!
//! Only [`ConfigError`] is fatal: it is raised before the poll loop starts.
//! Everything else is caught at the iteration boundary in [`crate::poll`],
//! logged, and followed by the next scheduled poll.

use std::path::PathBuf;

use thiserror::Error;

/// Invalid startup configuration. Halts the process.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("channel name must not be empty")]
    EmptyChannel,

    #[error("client ID must not be empty")]
    EmptyClientId,

    #[error("interval of {secs}s is too short (minimum {min}s)")]
    IntervalTooShort { secs: u64, min: u64 },

    #[error("error interval must be at least 1 second")]
    ZeroErrorInterval,

    #[error("request timeout must be at least 1 second")]
    ZeroTimeout,

    #[error("output directory {} does not exist or is not a directory", path.display())]
    NotADirectory { path: PathBuf },

    #[error("output directory {} is not writable: {source}", path.display())]
    NotWritable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("thumbnails need `{program}` on PATH: {reason}")]
    ConvertUnavailable { program: String, reason: String },

    #[error("could not build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
}

/// A preview fetch that neither produced an image nor a "not modified".
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("provider rejected client ID (HTTP {status})")]
    Unauthorized { status: u16 },

    #[error("preview not found: {url}")]
    NotFound { url: String },

    #[error("rate limited{}", retry_after_secs.as_ref().map(|s| format!(" (retry after {s}s)")).unwrap_or_default())]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("channel appears to be offline (redirected to {location})")]
    ChannelOffline { location: String },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("empty response body from {url}")]
    EmptyBody { url: String },
}

impl FetchError {
    /// Errors an operator has to fix; retrying will not help.
    pub fn needs_operator(&self) -> bool {
        matches!(self, FetchError::Unauthorized { .. })
    }
}

/// Failure to place a fetched image on disk.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("could not create directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no free file name for {} after {attempts} attempts", stem.display())]
    NameExhausted { stem: PathBuf, attempts: u32 },
}

/// Failure of the external thumbnail tool. Never affects the saved image.
#[derive(Debug, Error)]
pub enum ThumbnailError {
    #[error("`{program}` not found")]
    NotFound { program: String },

    #[error("`{program}` exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: std::process::ExitStatus,
        stderr: String,
    },

    #[error("could not run `{program}`: {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Why a poll cycle ended without a saved image.
#[derive(Debug, Error)]
pub enum IterationError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("save failed: {0}")]
    Storage(#[from] StorageError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_message_includes_retry_after_when_known() {
        let e = FetchError::RateLimited {
            retry_after_secs: Some(30),
        };
        assert_eq!(e.to_string(), "rate limited (retry after 30s)");

        let e = FetchError::RateLimited {
            retry_after_secs: None,
        };
        assert_eq!(e.to_string(), "rate limited");
    }

    #[test]
    fn only_unauthorized_needs_operator() {
        assert!(FetchError::Unauthorized { status: 401 }.needs_operator());
        assert!(!FetchError::NotFound { url: "x".into() }.needs_operator());
        assert!(!FetchError::ChannelOffline {
            location: "x".into()
        }
        .needs_operator());
    }
}
