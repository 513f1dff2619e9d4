//! XMLTV guide fragment source
//!
//! Downloads gzip-compressed XMLTV fragments, keeps both the compressed and the
//! decompressed copy as `chunk{N}.xml.gz` / `chunk{N}.xml` in the work
//! directory, and parses each into a [`GuideDocument`]. The first failure
//! aborts the whole batch.

use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::errors::{AppError, AppResult};
use crate::models::GuideDocument;
use crate::utils::xmltv_parser::parse_guide_bytes;
use crate::utils::{DecompressionService, FetchClient, FetchRequest, TempFileSet};

pub struct GuideFragmentSource {
    work_dir: PathBuf,
    timeout: Duration,
}

impl GuideFragmentSource {
    pub fn new<P: Into<PathBuf>>(work_dir: P, timeout: Duration) -> Self {
        Self {
            work_dir: work_dir.into(),
            timeout,
        }
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Fetch, decompress and parse every fragment, in order
    ///
    /// Every file written is registered in `temp_files` before it is written.
    pub async fn fetch_and_decompress<C>(
        &self,
        client: &C,
        urls: &[String],
        temp_files: &mut TempFileSet,
    ) -> AppResult<Vec<GuideDocument>>
    where
        C: FetchClient + ?Sized,
    {
        tokio::fs::create_dir_all(&self.work_dir)
            .await
            .map_err(|e| AppError::io(&self.work_dir, e))?;

        let mut documents = Vec::with_capacity(urls.len());
        for (idx, url) in urls.iter().enumerate() {
            documents.push(self.fetch_fragment(client, idx, url, temp_files).await?);
        }
        Ok(documents)
    }

    async fn fetch_fragment<C>(
        &self,
        client: &C,
        idx: usize,
        url: &str,
        temp_files: &mut TempFileSet,
    ) -> AppResult<GuideDocument>
    where
        C: FetchClient + ?Sized,
    {
        let request = FetchRequest::new(url, self.timeout);
        info!("Downloading {}", request.display_url());
        let compressed = client.fetch_bytes(&request).await?;

        let gz_path = self.work_dir.join(format!("chunk{idx}.xml.gz"));
        temp_files.track(&gz_path);
        tokio::fs::write(&gz_path, &compressed)
            .await
            .map_err(|e| AppError::io(&gz_path, e))?;

        let xml = DecompressionService::decompress(&compressed)
            .map_err(|e| AppError::parse(request.display_url(), format!("{e:#}")))?;

        let xml_path = self.work_dir.join(format!("chunk{idx}.xml"));
        temp_files.track(&xml_path);
        tokio::fs::write(&xml_path, &xml)
            .await
            .map_err(|e| AppError::io(&xml_path, e))?;

        let document = parse_guide_bytes(&xml, &request.display_url())?;
        debug!(
            "Fragment {} ({} compressed bytes, {} decompressed) has {} top-level elements",
            idx,
            compressed.len(),
            xml.len(),
            document.top_level_elements().count()
        );
        Ok(document)
    }
}
