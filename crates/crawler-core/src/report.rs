//! Warning report accumulated over one crawl

use serde::{Deserialize, Serialize};
use tracing::warn;

/// One warning about an endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlWarning {
    /// Endpoint path template
    pub key: String,
    pub reason: String,
}

/// Append-only list of warnings, in the order they were raised
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrawlReport {
    warnings: Vec<CrawlWarning>,
}

impl CrawlReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a warning for an endpoint
    pub fn report_warning(&mut self, key: &str, reason: &str) {
        warn!("{}: {}", key, reason);
        self.warnings.push(CrawlWarning {
            key: key.to_string(),
            reason: reason.to_string(),
        });
    }

    pub fn warnings(&self) -> &[CrawlWarning] {
        &self.warnings
    }

    /// Warnings raised for one endpoint
    pub fn warnings_for<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a CrawlWarning> + 'a {
        self.warnings.iter().filter(move |w| w.key == key)
    }

    pub fn len(&self) -> usize {
        self.warnings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }
}
