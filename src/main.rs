//! ttv-snap — save Twitch screenshots from stream preview images.
//!
//! ## Architecture overview
//!
//! ```text
//! ┌───────────┐ Settings ┌──────────┐  fetch()  ┌──────────────┐
//! │ config.rs │ ───────► │ poll.rs  │ ────────► │ source/      │
//! └───────────┘          │ (loop)   │           │ (HTTP, 304)  │
//!                        └──────────┘           └──────────────┘
//!                          │      │
//!                   save() │      │ generate()
//!                          ▼      ▼
//!                ┌────────────┐ ┌──────────────┐
//!                │ storage.rs │ │ thumbnail.rs │
//!                └────────────┘ └──────────────┘
//! ```
//!
//! * **`config`** — command-line options and startup validation.
//! * **`source/`** — the `PreviewSource` trait and the Twitch CDN fetcher.
//! * **`storage`** — file naming, per-day directories, atomic writes.
//! * **`thumbnail`** — optional thumbnails through ImageMagick.
//! * **`poll`** — the fetch → save → thumbnail → sleep cycle.
//! * **`main`** — wires everything together: parse args, set up logging,
//!   and run the loop until the process is killed.

mod config;
mod error;
mod poll;
mod source;
mod storage;
mod thumbnail;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use config::Cli;
use error::ConfigError;
use poll::{PollSession, ThreadSleeper};
use source::TwitchPreview;
use thumbnail::ConvertThumbnailer;

/// Log to stderr.  `RUST_LOG` takes precedence over `--log-level`.
fn init_tracing(level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .with_context(|| format!("invalid log level {level:?}"))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level)?;

    let settings = cli.into_settings().context("invalid configuration")?;

    let thumbnailer = ConvertThumbnailer::new(&settings.convert_program);
    if settings.thumbnail {
        thumbnailer
            .check_available()
            .context("thumbnails requested")?;
    }

    let source = TwitchPreview::new(
        &settings.channel,
        &settings.client_id,
        settings.width,
        settings.height,
        settings.timeout,
    )
    .map_err(ConfigError::HttpClient)?;

    match source.check_client_id() {
        Ok(true) => debug!("client ID accepted"),
        Ok(false) => warn!("client ID was rejected; every fetch will fail until it is fixed"),
        Err(e) => warn!(error = %e, "could not check client ID"),
    }

    info!(
        channel = %settings.channel,
        url = source.url(),
        output = %settings.output_dir.display(),
        interval_secs = settings.interval.as_secs(),
        subdir = settings.subdir,
        thumbnail = settings.thumbnail,
        "starting"
    );

    let mut session = PollSession::new(&settings, Box::new(source), Box::new(thumbnailer));
    session.run(&mut ThreadSleeper)
}
