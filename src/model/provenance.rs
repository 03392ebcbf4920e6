use crate::config::ProvenanceConfig;
use chrono::{DateTime, FixedOffset, Local};
use serde::{Deserialize, Serialize};

/// Per-run bookkeeping flattened into every emitted record
///
/// Computed once when a crawl starts and shared read-only (behind an `Arc`)
/// by every artist, album and track of that run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    /// When the run started, ISO-8601 with offset
    pub extraction_datetime: String,
    pub source: String,
    pub extractor: String,
    pub data_version: String,
    pub timezone: String,
}

impl Provenance {
    /// Stamps the current local time with the configured labels
    pub fn now(config: &ProvenanceConfig) -> Self {
        Self::at(Local::now().fixed_offset(), config)
    }

    pub fn at(when: DateTime<FixedOffset>, config: &ProvenanceConfig) -> Self {
        Self {
            extraction_datetime: when.to_rfc3339(),
            source: config.source.clone(),
            extractor: config.extractor.clone(),
            data_version: config.data_version.clone(),
            timezone: timezone_label(when.offset()),
        }
    }
}

fn timezone_label(offset: &FixedOffset) -> String {
    if offset.local_minus_utc() == 0 {
        "UTC".to_string()
    } else {
        offset.to_string()
    }
}
