//! Static directory source for running without API access.
//!
//! Serves a fixed POI list (optionally loaded from a JSON file in the
//! directory's own response format) regardless of the query, or a canned
//! failure.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures::future::BoxFuture;
use tokio::sync::RwLock;

use super::client::{DirectoryQuery, DirectorySource};
use super::error::DirectoryError;
use super::types::{Poi, parse_poi_array};

/// What the static directory answers with.
#[derive(Debug, Clone)]
pub enum StaticResponse {
    /// A successful response with these records.
    Pois(Vec<Poi>),
    /// The upstream is down (answers like a 503).
    Unavailable,
    /// The upstream answers with something other than an array.
    Malformed,
}

/// Directory source that serves canned responses.
#[derive(Clone)]
pub struct StaticDirectory {
    response: Arc<RwLock<StaticResponse>>,
    calls: Arc<AtomicUsize>,
}

impl StaticDirectory {
    /// Serve the given POIs.
    pub fn new(pois: Vec<Poi>) -> Self {
        Self::with_response(StaticResponse::Pois(pois))
    }

    pub fn with_response(response: StaticResponse) -> Self {
        Self {
            response: Arc::new(RwLock::new(response)),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Load POIs from a JSON file holding a directory response body.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, DirectoryError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| DirectoryError::Api {
            status: 0,
            message: format!("Failed to read {}: {}", path.display(), e),
        })?;
        Ok(Self::new(parse_poi_array(&json)?))
    }

    /// Replace the canned response.
    pub async fn set_response(&self, response: StaticResponse) {
        *self.response.write().await = response;
    }

    /// Number of fetches served so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl DirectorySource for StaticDirectory {
    fn fetch_pois<'a>(
        &'a self,
        _query: &'a DirectoryQuery,
    ) -> BoxFuture<'a, Result<Vec<Poi>, DirectoryError>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &*self.response.read().await {
                StaticResponse::Pois(pois) => Ok(pois.clone()),
                StaticResponse::Unavailable => Err(DirectoryError::Api {
                    status: 503,
                    message: "Service Unavailable".to_string(),
                }),
                StaticResponse::Malformed => Err(DirectoryError::Format {
                    message: "expected a JSON array of POIs".to_string(),
                }),
            }
        })
    }
}
