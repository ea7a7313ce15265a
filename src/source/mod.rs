//! Preview source abstraction layer.
//!
//! This module defines the [`PreviewSource`] trait and the [`FetchResult`]
//! type it produces.  The concrete HTTP implementation lives in [`twitch`].
//!
//! ## For contributors — adding a new provider
//!
//! 1. Create a new file in this directory (e.g. `youtube.rs`).
//! 2. Define a struct holding the provider's URL and credentials and
//!    implement [`PreviewSource`] for it.
//! 3. Add `mod youtube;` below and re-export your struct.
//! 4. Construct it in `main.rs` instead of [`TwitchPreview`].
//!
//! The poll loop, storage, and thumbnailing are all provider-agnostic.

mod fetch_result;
mod twitch;

pub use fetch_result::{Fetched, FetchResult};
pub use twitch::TwitchPreview;

use crate::error::FetchError;

/// Capability to fetch the current preview image of one channel.
///
/// The poll loop calls [`fetch()`](PreviewSource::fetch) once per cycle,
/// passing the marker returned by the last successful download.
///
/// ## Implementing a new source
///
/// ```ignore
/// pub struct MySource { /* url, credentials */ }
///
/// impl PreviewSource for MySource {
///     fn name(&self) -> &str { "my-channel" }
///
///     fn fetch(&self, last_modified: Option<&str>) -> Result<FetchResult, FetchError> {
///         // Conditional GET, then map the response onto FetchResult.
///         todo!()
///     }
/// }
/// ```
pub trait PreviewSource {
    /// Channel name, used in log lines.
    fn name(&self) -> &str;

    /// Fetch the preview, or learn that it has not changed since
    /// `last_modified`.
    ///
    /// `None` means no image has been downloaded yet in this run, so the
    /// request must be unconditional.  Every error is transient from the
    /// caller's point of view; the loop skips the iteration and carries on.
    fn fetch(&self, last_modified: Option<&str>) -> Result<FetchResult, FetchError>;
}
