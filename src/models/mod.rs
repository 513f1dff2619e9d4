pub mod guide;
pub mod playlist;

pub use guide::{GuideDocument, XmlElement, XmlNode};
pub use playlist::{AliasMap, PlaylistEntry};
