//! Command-line configuration.
//!
//! [`Cli`] is what the user typed; [`Settings`] is the checked, immutable
//! result the rest of the program runs on.  Every check here is fatal: a
//! bad value stops the process before the first poll.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::error::ConfigError;

/// Polling faster than this only burns rate limit; previews change every
/// few minutes at best.
pub const MIN_INTERVAL_SECS: u64 = 60;

#[derive(Debug, Parser)]
#[command(name = "ttv-snap", version)]
#[command(about = "Save Twitch screenshots from stream preview images")]
pub struct Cli {
    /// Login name of the Twitch channel
    pub channel: String,

    /// Directory screenshots are written to (must exist)
    pub output_dir: PathBuf,

    /// Twitch client ID sent with every request
    #[arg(long, env = "TWITCH_CLIENT_ID", hide_env_values = true)]
    pub client_id: String,

    /// Seconds between polls
    #[arg(long, default_value_t = 301)]
    pub interval: u64,

    /// Seconds to wait after a failed poll
    #[arg(long, default_value_t = 90)]
    pub error_interval: u64,

    /// Create a subdirectory for each day
    #[arg(long)]
    pub subdir: bool,

    /// Create thumbnails with ImageMagick's `convert`
    #[arg(long)]
    pub thumbnail: bool,

    /// Program used to create thumbnails
    #[arg(long, default_value = "convert")]
    pub convert_program: String,

    /// Requested preview width (0 = source size)
    #[arg(long, default_value_t = 0)]
    pub width: u32,

    /// Requested preview height (0 = source size)
    #[arg(long, default_value_t = 0)]
    pub height: u32,

    /// HTTP request timeout in seconds
    #[arg(long, default_value_t = 60)]
    pub timeout: u64,

    /// Log filter directive, overridden by RUST_LOG
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

/// Validated configuration for one run.
#[derive(Debug, Clone)]
pub struct Settings {
    pub channel: String,
    pub output_dir: PathBuf,
    pub client_id: String,
    pub interval: Duration,
    pub error_interval: Duration,
    pub subdir: bool,
    pub thumbnail: bool,
    pub convert_program: String,
    pub width: u32,
    pub height: u32,
    pub timeout: Duration,
}

impl Cli {
    /// Check every value and produce [`Settings`].
    ///
    /// The output directory must already exist and accept new files; it is
    /// probed by creating (and immediately dropping) a temporary file.
    pub fn into_settings(self) -> Result<Settings, ConfigError> {
        let channel = self.channel.trim().to_string();
        if channel.is_empty() {
            return Err(ConfigError::EmptyChannel);
        }

        let client_id = self.client_id.trim().to_string();
        if client_id.is_empty() {
            return Err(ConfigError::EmptyClientId);
        }

        if self.interval < MIN_INTERVAL_SECS {
            return Err(ConfigError::IntervalTooShort {
                secs: self.interval,
                min: MIN_INTERVAL_SECS,
            });
        }
        if self.error_interval == 0 {
            return Err(ConfigError::ZeroErrorInterval);
        }
        if self.timeout == 0 {
            return Err(ConfigError::ZeroTimeout);
        }

        if !self.output_dir.is_dir() {
            return Err(ConfigError::NotADirectory {
                path: self.output_dir,
            });
        }
        if let Err(source) = tempfile::tempfile_in(&self.output_dir) {
            return Err(ConfigError::NotWritable {
                path: self.output_dir,
                source,
            });
        }

        Ok(Settings {
            channel,
            output_dir: self.output_dir,
            client_id,
            interval: Duration::from_secs(self.interval),
            error_interval: Duration::from_secs(self.error_interval),
            subdir: self.subdir,
            thumbnail: self.thumbnail,
            convert_program: self.convert_program,
            width: self.width,
            height: self.height,
            timeout: Duration::from_secs(self.timeout),
        })
    }
}
