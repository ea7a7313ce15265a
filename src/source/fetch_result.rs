//! The value a [`PreviewSource`](super::PreviewSource) hands back to the
//! poll loop.
//!
//! A fetch either finds the image unchanged or downloads a new one; failure
//! travels separately as [`FetchError`](crate::error::FetchError) in the
//! `Err` arm.  Keeping "unchanged" as its own variant means callers cannot
//! mistake an empty download for a skip.

/// Successful outcome of one conditional fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchResult {
    /// The provider answered "304 Not Modified"; nothing to save.
    NotModified,
    /// A new image was downloaded.
    Fetched(Fetched),
}

/// A downloaded preview image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fetched {
    /// Raw image bytes exactly as served.
    pub bytes: Vec<u8>,

    /// The response's `Last-Modified` value, kept verbatim.
    ///
    /// `None` when the provider omitted the header; the next request is
    /// then sent without a condition.
    pub last_modified: Option<String>,

    /// File extension (without the dot) to save the image under.
    pub extension: String,
}
