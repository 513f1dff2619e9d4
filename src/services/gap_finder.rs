//! Gap finder
//!
//! Cross-checks the playlist against the unified guide and lists every
//! playlist channel that has no programme starting inside the forward window.
//! A channel declared in the guide without programmes counts as missing, the
//! same as one the guide never mentions.

use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::path::Path;
use tracing::{debug, info};

use crate::config::Config;
use crate::errors::{AppError, AppResult};
use crate::models::GuideDocument;
use crate::sources::{PlaylistSource, extract_playlist_ids};
use crate::utils::FetchClient;
use crate::utils::time::{TimeWindow, parse_xmltv_timestamp, truncate_xmltv_timestamp};
use crate::utils::xmltv_parser::parse_guide_bytes;

/// Read and parse the unified guide
///
/// A missing file is reported as [`AppError::GuideNotFound`].
pub async fn load_guide(path: &Path) -> AppResult<GuideDocument> {
    let content = match tokio::fs::read(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(AppError::GuideNotFound {
                path: path.to_path_buf(),
            });
        }
        Err(e) => return Err(AppError::io(path, e)),
    };
    parse_guide_bytes(&content, &path.display().to_string())
}

/// Truncated programme start strings grouped by channel id
#[derive(Debug, Clone, Default)]
pub struct ProgrammeIndex {
    starts: HashMap<String, Vec<String>>,
}

impl ProgrammeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one programme start; the value is cut to `yyyymmddHHMMSS`
    pub fn insert(&mut self, channel: &str, start: &str) {
        self.starts
            .entry(channel.to_string())
            .or_default()
            .push(truncate_xmltv_timestamp(start));
    }

    pub fn starts(&self, channel: &str) -> Option<&[String]> {
        self.starts.get(channel).map(Vec::as_slice)
    }

    /// Number of channels with at least one programme
    pub fn len(&self) -> usize {
        self.starts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.starts.is_empty()
    }

    pub fn programme_count(&self) -> usize {
        self.starts.values().map(Vec::len).sum()
    }

    /// Programmes for `channel` whose start parses and falls inside `window`
    pub fn future_show_count(&self, channel: &str, window: &TimeWindow) -> usize {
        self.starts(channel)
            .unwrap_or_default()
            .iter()
            .filter_map(|start| parse_xmltv_timestamp(start))
            .filter(|start| window.contains(*start))
            .count()
    }

    /// Whether `channel` has any programme starting in `[now, now + horizon_days]`
    pub fn has_future_show(&self, channel: &str, now: DateTime<Utc>, horizon_days: u32) -> bool {
        let window = TimeWindow::days_ahead(now, horizon_days);
        self.starts(channel)
            .unwrap_or_default()
            .iter()
            .filter_map(|start| parse_xmltv_timestamp(start))
            .any(|start| window.contains(start))
    }
}

/// Index every programme that names a channel
pub fn index_programmes(document: &GuideDocument) -> ProgrammeIndex {
    let mut index = ProgrammeIndex::new();
    for programme in document.programmes() {
        let Some(channel) = programme.attribute("channel").filter(|c| !c.is_empty()) else {
            continue;
        };
        index.insert(channel, programme.attribute("start").unwrap_or_default());
    }
    index
}

/// Playlist ids with no usable schedule data, sorted
pub fn compute_missing(
    playlist_ids: &BTreeSet<String>,
    index: &ProgrammeIndex,
    now: DateTime<Utc>,
    horizon_days: u32,
) -> Vec<String> {
    // BTreeSet iteration is already lexicographic
    playlist_ids
        .iter()
        .filter(|id| index.starts(id).is_none() || !index.has_future_show(id, now, horizon_days))
        .cloned()
        .collect()
}

/// Playlist ids ranked by programmes inside the window, highest first
///
/// Ties are broken by id. Channels with no programmes in the window are left
/// out.
pub fn busiest_channels(
    playlist_ids: &BTreeSet<String>,
    index: &ProgrammeIndex,
    now: DateTime<Utc>,
    horizon_days: u32,
    limit: usize,
) -> Vec<(String, usize)> {
    let window = TimeWindow::days_ahead(now, horizon_days);
    let mut ranked: Vec<(String, usize)> = playlist_ids
        .iter()
        .map(|id| (id.clone(), index.future_show_count(id, &window)))
        .filter(|(_, count)| *count > 0)
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(limit);
    ranked
}

/// Outcome of one gap finder run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GapReport {
    /// Distinct `tvg-id`s in the playlist
    pub playlist_channels: usize,
    /// Guide channels with at least one programme, in or out of the window
    pub channels_with_programmes: usize,
    pub horizon_days: u32,
    pub missing: Vec<String>,
    /// Only filled when nothing is missing
    pub busiest: Vec<(String, usize)>,
}

impl GapReport {
    pub fn has_missing(&self) -> bool {
        !self.missing.is_empty()
    }

    fn fmt_findings(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.missing.is_empty() {
            writeln!(f, "✅ All playlist channels have EPG data.")?;
            if !self.busiest.is_empty() {
                writeln!(
                    f,
                    "Top {} channels by programmes in the next {} days:",
                    self.busiest.len(),
                    self.horizon_days
                )?;
                for (id, count) in &self.busiest {
                    writeln!(f, "  {id:<40} {count:>6}")?;
                }
            }
            return Ok(());
        }

        writeln!(f, "⚠️ {} channel(s) missing EPG:", self.missing.len())?;
        for id in &self.missing {
            writeln!(f, "  • {id}")?;
        }
        Ok(())
    }
}

impl fmt::Display for GapReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_findings(f)?;
        writeln!(
            f,
            "Checked {} playlist channels against {} guide channels with programmes.",
            self.playlist_channels, self.channels_with_programmes
        )
    }
}

pub struct GapFinder<'a, C: FetchClient + ?Sized> {
    client: &'a C,
    config: &'a Config,
}

impl<'a, C: FetchClient + ?Sized> GapFinder<'a, C> {
    pub fn new(client: &'a C, config: &'a Config) -> Self {
        Self { client, config }
    }

    /// Load the guide at `guide_path`, fetch the playlist and compare them at `now`
    ///
    /// Credentials are checked before any network access.
    pub async fn run(&self, guide_path: &Path, now: DateTime<Utc>) -> AppResult<GapReport> {
        let gaps = &self.config.gaps;

        let document = load_guide(guide_path).await?;
        let index = index_programmes(&document);
        info!(
            "Loaded {}: {} channels with {} programmes",
            guide_path.display(),
            index.len(),
            index.programme_count()
        );

        let credentials = self.config.require_credentials()?;
        let source = PlaylistSource::new(
            self.config.playlist.clone(),
            gaps.playlist_endpoint,
            gaps.playlist_timeout,
        );
        let playlist = source.fetch(self.client, credentials).await?;
        let playlist_ids = extract_playlist_ids(&playlist);
        info!("Playlist references {} channel ids", playlist_ids.len());

        let missing = compute_missing(&playlist_ids, &index, now, gaps.horizon_days);
        let busiest = if missing.is_empty() {
            busiest_channels(&playlist_ids, &index, now, gaps.horizon_days, gaps.top_channels)
        } else {
            Vec::new()
        };
        debug!("{} playlist channels lack guide data", missing.len());

        Ok(GapReport {
            playlist_channels: playlist_ids.len(),
            channels_with_programmes: index.len(),
            horizon_days: gaps.horizon_days,
            missing,
            busiest,
        })
    }
}
