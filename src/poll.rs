//! The poll loop.
//!
//! One [`PollSession`] per process, one channel per session.  Each cycle:
//!
//! ```text
//! fetch ──► NotModified ─────────────────────────────┐
//!   │                                                ▼
//!   ├──► Fetched ──► save ──► thumbnail (optional) ──► sleep ──► fetch …
//!   │                 │                              ▲
//!   └──► error ───────┴──────────────────────────────┘
//! ```
//!
//! ## For contributors
//!
//! The loop is intentionally simple: it never exits on its own, never
//! retries within a cycle, and keeps no state except the last
//! `Last-Modified` marker.  An offline channel is an ordinary cycle, not a
//! failure.  Restarting after a crash is the service
//! manager's job.  All collaborators are injected so [`PollSession::step`]
//! can be driven in tests with fakes and an explicit clock.

use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Local};
use tracing::{debug, error, info, warn};

use crate::config::Settings;
use crate::error::{FetchError, IterationError, ThumbnailError};
use crate::source::{FetchResult, PreviewSource};
use crate::storage::Storage;
use crate::thumbnail::{self, ThumbnailOutcome, Thumbnailer};

/// Waits between cycles.
pub trait Sleeper {
    fn sleep(&mut self, duration: Duration);
}

/// Blocks the current thread.
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&mut self, duration: Duration) {
        thread::sleep(duration);
    }
}

/// What one cycle did.
#[derive(Debug)]
pub enum IterationReport {
    /// The provider reported the preview unchanged.
    Unchanged,
    /// The channel is not live; there is no preview to save.
    Offline,
    /// A new image was written.  The thumbnail result never affects it.
    Saved {
        path: PathBuf,
        thumbnail: Result<ThumbnailOutcome, ThumbnailError>,
    },
    /// Nothing was written this cycle.
    Failed(IterationError),
}

/// State of one running instance.
pub struct PollSession {
    source: Box<dyn PreviewSource>,
    storage: Storage,
    thumbnailer: Box<dyn Thumbnailer>,
    thumbnails: bool,
    interval: Duration,
    error_interval: Duration,
    /// Marker of the most recent download; `None` until the first one.
    last_modified: Option<String>,
}

impl PollSession {
    pub fn new(
        settings: &Settings,
        source: Box<dyn PreviewSource>,
        thumbnailer: Box<dyn Thumbnailer>,
    ) -> Self {
        Self {
            source,
            storage: Storage::new(&settings.output_dir, settings.subdir),
            thumbnailer,
            thumbnails: settings.thumbnail,
            interval: settings.interval,
            error_interval: settings.error_interval,
            last_modified: None,
        }
    }

    pub fn last_modified(&self) -> Option<&str> {
        self.last_modified.as_deref()
    }

    /// Run one fetch → save → thumbnail cycle as of `now`.
    pub fn step(&mut self, now: DateTime<Local>) -> IterationReport {
        let channel = self.source.name();

        let fetched = match self.source.fetch(self.last_modified.as_deref()) {
            Ok(FetchResult::NotModified) => {
                debug!(channel, "preview not modified");
                return IterationReport::Unchanged;
            }
            Ok(FetchResult::Fetched(fetched))
                if fetched.last_modified.is_some() && fetched.last_modified == self.last_modified =>
            {
                debug!(channel, "preview carries the known marker, skipping");
                return IterationReport::Unchanged;
            }
            Ok(FetchResult::Fetched(fetched)) => fetched,
            Err(FetchError::ChannelOffline { location }) => {
                info!(channel, %location, "channel offline");
                return IterationReport::Offline;
            }
            Err(e) => {
                if e.needs_operator() {
                    error!(channel, error = %e, "fetch rejected, check the client ID");
                } else {
                    warn!(channel, error = %e, "fetch failed");
                }
                return IterationReport::Failed(e.into());
            }
        };

        self.last_modified = fetched.last_modified;

        let path = match self.storage.save(&fetched.bytes, &fetched.extension, now) {
            Ok(path) => path,
            Err(e) => {
                warn!(channel, error = %e, "could not save preview");
                return IterationReport::Failed(e.into());
            }
        };
        info!(channel, path = %path.display(), bytes = fetched.bytes.len(), "saved preview");

        let thumbnail = thumbnail::generate(self.thumbnailer.as_ref(), &path, self.thumbnails);
        match &thumbnail {
            Ok(ThumbnailOutcome::Created(thumb)) => {
                debug!(path = %thumb.display(), "created thumbnail");
            }
            Ok(ThumbnailOutcome::Skipped) => {}
            Err(e) => warn!(path = %path.display(), error = %e, "thumbnail failed"),
        }

        IterationReport::Saved { path, thumbnail }
    }

    /// How long to sleep after a cycle that produced `report`.
    pub fn delay_after(&self, report: &IterationReport) -> Duration {
        match report {
            IterationReport::Failed(_) => self.error_interval,
            IterationReport::Unchanged
            | IterationReport::Offline
            | IterationReport::Saved { .. } => self.interval,
        }
    }

    /// Poll until the process is killed.
    pub fn run(&mut self, sleeper: &mut dyn Sleeper) -> ! {
        loop {
            let report = self.step(Local::now());
            let delay = self.delay_after(&report);
            debug!(secs = delay.as_secs(), last_modified = self.last_modified(), "sleeping");
            sleeper.sleep(delay);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
