//! Guide merger
//!
//! Combines the configured XMLTV fragments into one `<tv>` document, tops it
//! up with channel records for playlist ids the fragments never declare, and
//! writes the result as the unified guide.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::errors::{AppError, AppResult};
use crate::models::guide::TV_ELEMENT;
use crate::models::{AliasMap, GuideDocument, XmlNode};
use crate::sources::{GuideFragmentSource, PlaylistSource, extract_aliases};
use crate::utils::xmltv_writer::render_guide;
use crate::utils::{FetchClient, TempFileSet};

/// Counts reported at the end of a merge run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeSummary {
    pub fragments: usize,
    pub channels: usize,
    pub programmes: usize,
    pub aliases_found: usize,
    pub channels_injected: usize,
    pub duplicate_channel_ids: usize,
    pub output_path: PathBuf,
}

/// Concatenate the top-level elements of every document under one new root
///
/// Source order is preserved and nothing is deduplicated.
pub fn merge_documents(documents: Vec<GuideDocument>, generator_name: &str) -> GuideDocument {
    let mut unified = GuideDocument::new(generator_name);
    for document in documents {
        if document.root.name != TV_ELEMENT {
            debug!("Merging fragment with unexpected root <{}>", document.root.name);
        }
        for node in document.root.children {
            if let XmlNode::Element(element) = node {
                unified.append(element);
            }
        }
    }
    unified
}

/// Append a minimal channel record for every alias id the document lacks
///
/// Existing records are never touched. Returns the number added.
pub fn inject_missing_channels(document: &mut GuideDocument, aliases: &AliasMap) -> usize {
    let existing: HashSet<String> = document
        .channel_ids()
        .into_iter()
        .map(str::to_string)
        .collect();

    let mut added = 0;
    for (id, name) in aliases {
        if existing.contains(id) {
            continue;
        }
        document.append(GuideDocument::channel_record(id, name));
        added += 1;
    }
    added
}

/// Write the preamble and document to `path`, replacing any existing file
pub async fn serialize(document: &GuideDocument, path: &Path) -> AppResult<()> {
    let xmltv = render_guide(document)?;
    tokio::fs::write(path, xmltv)
        .await
        .map_err(|e| AppError::io(path, e))
}

pub struct GuideMerger<'a, C: FetchClient + ?Sized> {
    client: &'a C,
    config: &'a Config,
}

impl<'a, C: FetchClient + ?Sized> GuideMerger<'a, C> {
    pub fn new(client: &'a C, config: &'a Config) -> Self {
        Self { client, config }
    }

    /// Run the whole merge
    ///
    /// Any fragment failure aborts before the output file is touched.
    /// Temporary chunk files are removed whether or not the run succeeds.
    pub async fn run(&self) -> AppResult<MergeSummary> {
        let merge = &self.config.merge;
        let mut temp_files = TempFileSet::new();

        let fragments = GuideFragmentSource::new(&merge.work_dir, merge.fragment_timeout);
        let documents = fragments
            .fetch_and_decompress(self.client, &merge.sources, &mut temp_files)
            .await?;
        let fragment_count = documents.len();

        let aliases = self.load_aliases().await;

        let mut unified = merge_documents(documents, &merge.generator_name);
        let injected = inject_missing_channels(&mut unified, &aliases);
        info!("Added {} missing channel aliases", injected);

        let duplicates = unified.duplicate_channel_ids();
        if !duplicates.is_empty() {
            warn!(
                "{} channel ids are declared by more than one fragment; all copies are kept",
                duplicates.len()
            );
            for (id, count) in &duplicates {
                debug!("Channel {} declared {} times", id, count);
            }
        }

        serialize(&unified, &self.config.output_path).await?;
        info!("Unified EPG created: {}", self.config.output_path.display());

        let summary = MergeSummary {
            fragments: fragment_count,
            channels: unified.channels().count(),
            programmes: unified.programmes().count(),
            aliases_found: aliases.len(),
            channels_injected: injected,
            duplicate_channel_ids: duplicates.len(),
            output_path: self.config.output_path.clone(),
        };
        info!(
            "Merged {} fragments: {} channels, {} programmes",
            summary.fragments, summary.channels, summary.programmes
        );

        temp_files.cleanup();
        Ok(summary)
    }

    /// Playlist aliases, or an empty map when the playlist is unavailable
    async fn load_aliases(&self) -> AliasMap {
        let Some(credentials) = self.config.credentials.as_ref() else {
            warn!("USERNAME/PASSWORD not set, skipping alias injection");
            return AliasMap::new();
        };

        let source = PlaylistSource::new(
            self.config.playlist.clone(),
            self.config.merge.playlist_endpoint,
            self.config.merge.playlist_timeout,
        );
        match source.fetch(self.client, credentials).await {
            Ok(playlist) => {
                let aliases = extract_aliases(&playlist);
                info!("Found {} playlist entries", aliases.len());
                aliases
            }
            Err(e) => {
                warn!("Failed to fetch playlist ({}), skipping alias injection", e);
                AliasMap::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Credentials, PlaylistConfig};
    use crate::models::XmlElement;
    use crate::utils::testing::{StaticFetchClient, gzip};
    use crate::utils::xmltv_parser::parse_guide;
    use tracing_test::traced_test;

    const FRAGMENT_A: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<tv generator-info-name="a">
  <channel id="ABC.us"><display-name>ABC</display-name></channel>
  <programme start="20240101120000 +0000" channel="ABC.us"><title>News</title></programme>
</tv>"#;

    const FRAGMENT_B: &str = r#"<tv generator-info-name="b">
  <channel id="NBC.us"><display-name>NBC</display-name></channel>
  <channel id="ABC.us"><display-name>ABC West</display-name></channel>
  <programme start="20240101130000 +0000" channel="NBC.us"><title>Show</title></programme>
</tv>"#;

    const PLAYLIST_URL: &str =
        "http://provider.test/get.php?username=u&password=p&type=m3u_plus";

    fn test_config(dir: &Path, credentials: Option<Credentials>) -> Config {
        let mut config = Config::default();
        config.output_path = dir.join("unified_epg.xml");
        config.merge.work_dir = dir.join("work");
        config.merge.sources = vec![
            "http://guides.test/a.xml.gz".to_string(),
            "http://guides.test/b.xml.gz".to_string(),
        ];
        config.playlist = PlaylistConfig {
            base_url: "http://provider.test".to_string(),
            user_agent: "VLC/3.0".to_string(),
        };
        config.with_credentials(credentials)
    }

    fn credentials() -> Option<Credentials> {
        Some(Credentials {
            username: "u".to_string(),
            password: "p".to_string(),
        })
    }

    fn guide_client() -> StaticFetchClient {
        StaticFetchClient::new()
            .with_response("http://guides.test/a.xml.gz", gzip(FRAGMENT_A.as_bytes()))
            .with_response("http://guides.test/b.xml.gz", gzip(FRAGMENT_B.as_bytes()))
    }

    fn doc_with_channels(ids: &[&str]) -> GuideDocument {
        let mut doc = GuideDocument::new("Unified EPG");
        for id in ids {
            doc.append(GuideDocument::channel_record(id, id));
        }
        doc
    }

    #[test]
    fn test_merge_preserves_order_and_duplicates() {
        let a = parse_guide(FRAGMENT_A, "a").unwrap();
        let b = parse_guide(FRAGMENT_B, "b").unwrap();
        let merged = merge_documents(vec![a, b], "Unified EPG");

        assert_eq!(merged.root.attribute("generator-info-name"), Some("Unified EPG"));
        let order: Vec<(&str, Option<&str>)> = merged
            .top_level_elements()
            .map(|e| {
                (
                    e.name.as_str(),
                    e.attribute("id").or_else(|| e.attribute("channel")),
                )
            })
            .collect();
        assert_eq!(
            order,
            vec![
                ("channel", Some("ABC.us")),
                ("programme", Some("ABC.us")),
                ("channel", Some("NBC.us")),
                ("channel", Some("ABC.us")),
                ("programme", Some("NBC.us")),
            ]
        );
    }

    #[test]
    fn test_inject_adds_only_missing_ids() {
        let mut doc = doc_with_channels(&["ABC.us"]);
        let before = doc.channels().next().cloned().unwrap();

        let mut aliases = AliasMap::new();
        aliases.insert("XYZ.us".to_string(), "My Channel".to_string());
        aliases.insert("ABC.us".to_string(), "Renamed".to_string());

        let added = inject_missing_channels(&mut doc, &aliases);
        assert_eq!(added, 1);

        let channels: Vec<&XmlElement> = doc.channels().collect();
        assert_eq!(channels.len(), 2);
        assert_eq!(channels[0], &before);
        assert_eq!(channels[1], &GuideDocument::channel_record("XYZ.us", "My Channel"));
    }

    #[test]
    fn test_inject_with_empty_aliases_is_noop() {
        let mut doc = doc_with_channels(&["ABC.us"]);
        let snapshot = doc.clone();
        assert_eq!(inject_missing_channels(&mut doc, &AliasMap::new()), 0);
        assert_eq!(doc, snapshot);
    }

    #[tokio::test]
    async fn test_run_merges_injects_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path(), credentials());
        let playlist = "#EXTM3U\n\
#EXTINF:-1 tvg-id=\"XYZ.us\" tvg-name=\"My Channel\",My Channel\nhttp://s/1\n\
#EXTINF:-1 tvg-id=\"ABC.us\",ABC\nhttp://s/2\n";
        let client = guide_client().with_response(PLAYLIST_URL, playlist);

        let summary = GuideMerger::new(&client, &config).run().await.unwrap();

        assert_eq!(summary.fragments, 2);
        assert_eq!(summary.aliases_found, 2);
        assert_eq!(summary.channels_injected, 1);
        assert_eq!(summary.channels, 4);
        assert_eq!(summary.programmes, 2);
        assert_eq!(summary.duplicate_channel_ids, 1);

        let written = std::fs::read_to_string(&config.output_path).unwrap();
        assert!(written.starts_with(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<!DOCTYPE tv SYSTEM \"xmltv.dtd\">\n"
        ));
        let reloaded = parse_guide(&written, "output").unwrap();
        assert!(reloaded.channel_ids().contains("XYZ.us"));

        let leftovers: Vec<_> = std::fs::read_dir(&config.merge.work_dir)
            .unwrap()
            .collect();
        assert!(leftovers.is_empty());

        let playlist_request = client
            .requests()
            .into_iter()
            .find(|r| r.url == PLAYLIST_URL)
            .unwrap();
        assert_eq!(playlist_request.timeout, config.merge.playlist_timeout);
    }

    #[tokio::test]
    #[traced_test]
    async fn test_run_without_credentials_skips_aliases() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path(), None);
        let client = guide_client();

        let summary = GuideMerger::new(&client, &config).run().await.unwrap();

        assert_eq!(summary.aliases_found, 0);
        assert_eq!(summary.channels_injected, 0);
        assert!(config.output_path.exists());
        assert!(client.requests().iter().all(|r| r.url != PLAYLIST_URL));
        assert!(logs_contain("skipping alias injection"));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_playlist_failure_degrades_to_no_aliases() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path(), credentials());
        let client = guide_client();

        let summary = GuideMerger::new(&client, &config).run().await.unwrap();

        assert_eq!(summary.channels_injected, 0);
        assert!(logs_contain("Failed to fetch playlist"));
        assert!(!logs_contain("password=p"));
    }

    #[tokio::test]
    async fn test_fragment_failure_writes_nothing_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path(), None);
        let client = StaticFetchClient::new()
            .with_response("http://guides.test/a.xml.gz", gzip(FRAGMENT_A.as_bytes()));

        let err = GuideMerger::new(&client, &config).run().await.unwrap_err();

        assert!(matches!(err, AppError::Fetch(_)));
        assert!(!config.output_path.exists());
        let leftovers: Vec<_> = std::fs::read_dir(&config.merge.work_dir)
            .unwrap()
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_fragment_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path(), None);
        let client = StaticFetchClient::new()
            .with_response("http://guides.test/a.xml.gz", gzip(FRAGMENT_A.as_bytes()))
            .with_response("http://guides.test/b.xml.gz", gzip(b"<tv><channel></tv>"));

        let err = GuideMerger::new(&client, &config).run().await.unwrap_err();
        assert!(matches!(err, AppError::Parse { .. }));
        assert!(!config.output_path.exists());
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_injection_adds_exactly_the_set_difference(
                existing in proptest::collection::btree_set("[A-F]{1,2}", 0..8),
                alias_ids in proptest::collection::btree_set("[A-F]{1,2}", 0..8)
            ) {
                let existing_refs: Vec<&str> = existing.iter().map(String::as_str).collect();
                let mut doc = doc_with_channels(&existing_refs);
                let original: Vec<XmlElement> = doc.channels().cloned().collect();

                let aliases: AliasMap = alias_ids
                    .iter()
                    .map(|id| (id.clone(), format!("{id} name")))
                    .collect();

                let added = inject_missing_channels(&mut doc, &aliases);
                prop_assert_eq!(added, alias_ids.difference(&existing).count());

                let after: Vec<XmlElement> = doc.channels().cloned().collect();
                prop_assert_eq!(&after[..original.len()], &original[..]);
                prop_assert_eq!(after.len(), original.len() + added);
            }
        }
    }
}
