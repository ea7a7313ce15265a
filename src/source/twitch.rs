//! Twitch preview source.
//!
//! Twitch serves a periodically refreshed JPEG of every live channel from its
//! static CDN.  The CDN honours `If-Modified-Since`, so most polls end in a
//! cheap `304 Not Modified`.  Offline channels are redirected to a placeholder
//! image; redirects are therefore not followed but reported as
//! [`FetchError::ChannelOffline`].

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, IF_MODIFIED_SINCE, LAST_MODIFIED, LOCATION, RETRY_AFTER};
use reqwest::redirect::Policy;
use reqwest::StatusCode;

use super::{FetchResult, Fetched, PreviewSource};
use crate::error::FetchError;

/// Where Twitch publishes stream previews.
pub const DEFAULT_PREVIEW_BASE: &str = "https://static-cdn.jtvnw.net/previews-ttv";

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// A single channel's preview on the Twitch CDN.
pub struct TwitchPreview {
    client: Client,
    /// Fully expanded preview URL.
    url: String,
    /// Sent as the `Client-ID` header on every request.
    client_id: String,
    channel: String,
}

impl TwitchPreview {
    /// Create a source for `channel` on the public CDN.
    ///
    /// `width` and `height` are substituted into the preview template; `0`
    /// for both asks for the source resolution.
    pub fn new(
        channel: &str,
        client_id: &str,
        width: u32,
        height: u32,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        Self::with_base(DEFAULT_PREVIEW_BASE, channel, client_id, width, height, timeout)
    }

    /// Like [`new`](Self::new) but against an arbitrary base URL.
    pub fn with_base(
        base: &str,
        channel: &str,
        client_id: &str,
        width: u32,
        height: u32,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .redirect(Policy::none())
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            url: preview_url(base, channel, width, height),
            client_id: client_id.to_string(),
            channel: channel.to_string(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Ask the CDN whether it accepts our client ID, with a `HEAD` request.
    ///
    /// Only `401`/`403` count as a rejection.  An offline channel's redirect
    /// or a missing preview says nothing about the ID.
    pub fn check_client_id(&self) -> Result<bool, reqwest::Error> {
        let response = self
            .client
            .head(&self.url)
            .header("Client-ID", &self.client_id)
            .send()?;
        Ok(!matches!(
            response.status(),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
        ))
    }
}

/// Expand the preview template for `channel`.
///
/// The CDN only knows lower-case login names.
pub fn preview_url(base: &str, channel: &str, width: u32, height: u32) -> String {
    format!(
        "{}/live_user_{}-{width}x{height}.jpg",
        base.trim_end_matches('/'),
        channel.to_lowercase()
    )
}

/// File extension of the resource at `url`, `bin` when there is none.
pub fn extension_from_url(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    let last_segment = path.rsplit('/').next().unwrap_or_default();

    match last_segment.rsplit_once('.') {
        Some((stem, ext))
            if !stem.is_empty() && !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            ext.to_ascii_lowercase()
        }
        _ => "bin".to_string(),
    }
}

/// `Retry-After` in whole seconds, when given in that form.
fn retry_after_secs(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

impl PreviewSource for TwitchPreview {
    fn name(&self) -> &str {
        &self.channel
    }

    fn fetch(&self, prior: Option<&str>) -> Result<FetchResult, FetchError> {
        let mut request = self
            .client
            .get(&self.url)
            .header("Client-ID", &self.client_id);
        if let Some(marker) = prior {
            request = request.header(IF_MODIFIED_SINCE, marker);
        }

        let response = request.send()?;
        let status = response.status();

        match status {
            StatusCode::OK => {}
            StatusCode::NOT_MODIFIED => return Ok(FetchResult::NotModified),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(FetchError::Unauthorized {
                    status: status.as_u16(),
                })
            }
            StatusCode::NOT_FOUND => {
                return Err(FetchError::NotFound {
                    url: self.url.clone(),
                })
            }
            StatusCode::TOO_MANY_REQUESTS => {
                return Err(FetchError::RateLimited {
                    retry_after_secs: retry_after_secs(response.headers()),
                })
            }
            s if s.is_redirection() => {
                let location = response
                    .headers()
                    .get(LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("<no location>")
                    .to_string();
                return Err(FetchError::ChannelOffline { location });
            }
            s => {
                return Err(FetchError::UnexpectedStatus {
                    status: s.as_u16(),
                    url: self.url.clone(),
                })
            }
        }

        let last_modified = response
            .headers()
            .get(LAST_MODIFIED)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);

        // Some caches ignore `If-Modified-Since` and answer 200 anyway.
        if last_modified.is_some() && last_modified.as_deref() == prior {
            return Ok(FetchResult::NotModified);
        }

        let bytes = response.bytes()?;
        if bytes.is_empty() {
            return Err(FetchError::EmptyBody {
                url: self.url.clone(),
            });
        }

        Ok(FetchResult::Fetched(Fetched {
            bytes: bytes.to_vec(),
            last_modified,
            extension: extension_from_url(&self.url),
        }))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
