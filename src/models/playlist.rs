use std::collections::BTreeMap;

/// One `#EXTINF` line reduced to the fields the guide cares about
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistEntry {
    /// Trimmed, non-empty `tvg-id`
    pub tvg_id: String,
    /// `tvg-name`, or the free text after the attribute list
    pub name: Option<String>,
}

impl PlaylistEntry {
    /// Name to use for a synthesized `<display-name>`; falls back to the id
    pub fn display_name(&self) -> &str {
        match self.name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => &self.tvg_id,
        }
    }
}

/// Channel id to display name, ordered by id for deterministic injection
pub type AliasMap = BTreeMap<String, String>;
