// Collector module.
// Defines the page-fetching seam and the engine that drives it.

pub mod jsearch;
pub mod runner;

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::FetchError;

/// Parameters for a single page request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageQuery {
    pub role: String,
    pub location: String,
    pub country_code: String,
    /// 1-based page number.
    pub page: u32,
}

impl PageQuery {
    /// Free-text search query sent upstream.
    pub fn search_text(&self) -> String {
        format!("{} in {}", self.role, self.location)
    }
}

/// Trait that all upstream search sources implement.
/// Returns the raw listing items of one page, untouched.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Human-readable name used in logs.
    fn name(&self) -> &str;

    async fn fetch(&self, query: &PageQuery) -> Result<Vec<Value>, FetchError>;
}

/// Waiting capability, injected so tests run without real delays.
#[async_trait]
pub trait Pacer: Send + Sync {
    async fn pause(&self, duration: Duration);
}

/// Sleeps on the tokio timer.
pub struct TokioPacer;

#[async_trait]
impl Pacer for TokioPacer {
    async fn pause(&self, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}
