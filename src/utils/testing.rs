//! In-memory fetch client and fixtures for unit tests

use async_trait::async_trait;
use bytes::Bytes;
use flate2::Compression;
use flate2::write::GzEncoder;
use std::collections::HashMap;
use std::io::Write;
use std::sync::Mutex;

use crate::errors::{AppResult, FetchError};
use crate::utils::{FetchClient, FetchRequest};

/// Serves canned bodies keyed by exact URL; anything else is a 404
#[derive(Default)]
pub struct StaticFetchClient {
    responses: HashMap<String, Bytes>,
    requests: Mutex<Vec<FetchRequest>>,
}

impl StaticFetchClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response<U: Into<String>, B: Into<Bytes>>(mut self, url: U, body: B) -> Self {
        self.responses.insert(url.into(), body.into());
        self
    }

    /// Every request seen so far, in order
    pub fn requests(&self) -> Vec<FetchRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl FetchClient for StaticFetchClient {
    async fn fetch_bytes(&self, request: &FetchRequest) -> AppResult<Bytes> {
        if let Ok(mut seen) = self.requests.lock() {
            seen.push(request.clone());
        }
        match self.responses.get(&request.url) {
            Some(body) => Ok(body.clone()),
            None => Err(FetchError::Status {
                url: request.display_url(),
                status: 404,
                reason: "Not Found".to_string(),
            }
            .into()),
        }
    }
}

pub fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).expect("in-memory gzip write");
    encoder.finish().expect("in-memory gzip finish")
}
