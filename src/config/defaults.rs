/// Configuration default values
///
/// This module contains all the default values for configuration options,
/// making them easily changeable in one central location.
// Output defaults
pub const DEFAULT_CONFIG_FILE: &str = "epg-unifier.toml";
pub const DEFAULT_OUTPUT_PATH: &str = "unified_epg.xml";
pub const DEFAULT_GENERATOR_NAME: &str = "Unified EPG";
pub const DEFAULT_WORK_DIR: &str = ".";

// Guide fragment defaults
pub const DEFAULT_GUIDE_SOURCES: &[&str] = &[
    "https://www.open-epg.com/files/unitedstates1.xml.gz",
    "https://www.open-epg.com/files/unitedstates2.xml.gz",
    "https://www.open-epg.com/files/unitedstates3.xml.gz",
    "https://www.open-epg.com/files/unitedstates4.xml.gz",
    "https://www.open-epg.com/files/unitedstates5.xml.gz",
    "https://www.open-epg.com/files/unitedstates6.xml.gz",
    "https://www.open-epg.com/files/unitedstates7.xml.gz",
    "https://www.open-epg.com/files/unitedstates8.xml.gz",
];
pub const DEFAULT_FRAGMENT_TIMEOUT: &str = "30s";

// Playlist defaults
pub const DEFAULT_PLAYLIST_BASE_URL: &str = "http://boom38586.cdngold.me";
pub const DEFAULT_PLAYLIST_USER_AGENT: &str = "VLC/3.0";
pub const DEFAULT_MERGE_PLAYLIST_TIMEOUT: &str = "90s";
pub const DEFAULT_GAPS_PLAYLIST_TIMEOUT: &str = "60s";

// Gap finder defaults
pub const DEFAULT_DAYS_AHEAD: u32 = 7;
pub const DEFAULT_TOP_CHANNELS: usize = 10;

// Environment
pub const ENV_PREFIX: &str = "EPG_UNIFIER_";
pub const USERNAME_ENV: &str = "USERNAME";
pub const PASSWORD_ENV: &str = "PASSWORD";
