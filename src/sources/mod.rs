//! Remote inputs: XMLTV guide fragments and the provider playlist

pub mod m3u;
pub mod xmltv_epg;

pub use m3u::{PlaylistSource, extract_aliases, extract_playlist_ids, parse_extinf_line};
pub use xmltv_epg::GuideFragmentSource;
