//! Utility modules shared by the merger and the gap finder

pub mod decompression;
pub mod http_client;
pub mod temp_files;
#[cfg(test)]
pub mod testing;
pub mod time;
pub mod url;
pub mod xmltv_parser;
pub mod xmltv_writer;

// Re-export commonly used types for convenience
pub use decompression::{CompressionFormat, DecompressionService};
pub use http_client::{FetchClient, FetchRequest, StandardHttpClient};
pub use temp_files::TempFileSet;
