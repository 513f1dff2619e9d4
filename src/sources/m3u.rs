//! M3U playlist source
//!
//! Fetches the provider playlist and pulls channel identities out of its
//! `#EXTINF` lines. The format is not strict enough for a real parser, so
//! attribute extraction is regex based and confined to this module.
//!
//! A typical line looks like:
//!
//! ```text
//! #EXTINF:-1 tvg-id="CNN.us" tvg-name="CNN HD" group-title="News, US",CNN HD
//! ```

use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::{Credentials, PlaylistConfig, PlaylistEndpoint};
use crate::errors::{AppError, AppResult};
use crate::models::{AliasMap, PlaylistEntry};
use crate::utils::url::UrlUtils;
use crate::utils::{FetchClient, FetchRequest};

pub const EXTINF_PREFIX: &str = "#EXTINF";

fn tvg_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r#"tvg-id="([^"]*)""#).expect("static tvg-id pattern is valid"))
}

fn tvg_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r#"tvg-name="([^"]*)""#).expect("static tvg-name pattern is valid"))
}

/// Parse a single `#EXTINF` line
///
/// Returns `None` for non-EXTINF lines and for entries whose `tvg-id` is
/// missing or blank. The name is the trimmed `tvg-name`, falling back to the
/// free text after the first comma outside the quoted attribute values.
/// Unlike a plain split on the first comma, a comma inside an attribute value
/// such as `group-title="News, Sports"` does not start the title.
pub fn parse_extinf_line(line: &str) -> Option<PlaylistEntry> {
    let line = line.trim_start();
    if !line.starts_with(EXTINF_PREFIX) {
        return None;
    }

    let tvg_id = tvg_id_pattern().captures(line)?.get(1)?.as_str().trim();
    if tvg_id.is_empty() {
        return None;
    }

    let name = tvg_name_pattern()
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .filter(|name| !name.is_empty())
        .or_else(|| trailing_title(line))
        .map(str::to_string);

    Some(PlaylistEntry {
        tvg_id: tvg_id.to_string(),
        name,
    })
}

/// Text after the first comma that is not inside a quoted attribute value
fn trailing_title(line: &str) -> Option<&str> {
    let mut in_quotes = false;
    for (idx, ch) in line.char_indices() {
        match ch {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                let title = line[idx + 1..].trim();
                return (!title.is_empty()).then_some(title);
            }
            _ => {}
        }
    }
    None
}

/// All usable entries, in playlist order
pub fn parse_playlist_entries(playlist: &str) -> Vec<PlaylistEntry> {
    playlist.lines().filter_map(parse_extinf_line).collect()
}

/// Build the channel id → display name map used for channel injection
///
/// Later lines overwrite earlier ones for the same id.
pub fn extract_aliases(playlist: &str) -> AliasMap {
    let mut aliases = AliasMap::new();
    for entry in parse_playlist_entries(playlist) {
        let name = entry.display_name().to_string();
        if let Some(previous) = aliases.insert(entry.tvg_id.clone(), name) {
            debug!("Playlist id {} seen again (was '{}')", entry.tvg_id, previous);
        }
    }
    aliases
}

/// Every distinct, non-blank `tvg-id` anywhere in the text
pub fn extract_playlist_ids(playlist: &str) -> BTreeSet<String> {
    tvg_id_pattern()
        .captures_iter(playlist)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}

/// Credentialed playlist download
#[derive(Debug, Clone)]
pub struct PlaylistSource {
    config: PlaylistConfig,
    endpoint: PlaylistEndpoint,
    timeout: Duration,
}

impl PlaylistSource {
    pub fn new(config: PlaylistConfig, endpoint: PlaylistEndpoint, timeout: Duration) -> Self {
        Self {
            config,
            endpoint,
            timeout,
        }
    }

    /// The request that [`PlaylistSource::fetch`] sends
    pub fn request(&self, credentials: &Credentials) -> AppResult<FetchRequest> {
        let url = UrlUtils::build_playlist_url(&self.config.base_url, credentials, self.endpoint)
            .map_err(|e| {
                AppError::configuration(format!(
                    "Invalid playlist base URL '{}': {e}",
                    self.config.base_url
                ))
            })?;
        Ok(FetchRequest::new(url, self.timeout).with_header("User-Agent", &self.config.user_agent))
    }

    /// Download the playlist body as text
    pub async fn fetch<C>(&self, client: &C, credentials: &Credentials) -> AppResult<String>
    where
        C: FetchClient + ?Sized,
    {
        let request = self.request(credentials)?;
        info!("Fetching playlist from {}", request.display_url());
        let playlist = client.fetch_text(&request).await?;
        debug!("Playlist is {} bytes", playlist.len());
        Ok(playlist)
    }
}
