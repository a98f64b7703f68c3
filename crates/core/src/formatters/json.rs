//! JSON rendering of hits and records for scripting front ends.

use serde::Serialize;

use crate::model::{IssueRecord, SearchHit};
use crate::{Result, TebeoError};

/// Configuration for JSON output
#[derive(Debug, Clone, Default)]
pub struct JsonConfig {
    /// Pretty print JSON output
    pub pretty: bool,
}

fn to_json<T: Serialize + ?Sized>(value: &T, pretty: bool) -> Result<String> {
    let json = if pretty { serde_json::to_string_pretty(value) } else { serde_json::to_string(value) };
    json.map_err(|e| TebeoError::Io(e.into()))
}

/// Renders a list of hits as a JSON array.
pub fn hits_to_json(hits: &[SearchHit], config: &JsonConfig) -> Result<String> {
    to_json(hits, config.pretty)
}

/// Renders one issue record as a JSON object.
///
/// Unknown values are written as `null` and empty lists as `[]`, so every
/// record has the same keys.
pub fn record_to_json(record: &IssueRecord, config: &JsonConfig) -> Result<String> {
    to_json(record, config.pretty)
}

/// JSON formatter with configurable options
pub struct JsonFormatter {
    config: JsonConfig,
}

impl JsonFormatter {
    pub fn new(config: JsonConfig) -> Self {
        Self { config }
    }

    pub fn hits(&self, hits: &[SearchHit]) -> Result<String> {
        hits_to_json(hits, &self.config)
    }

    pub fn record(&self, record: &IssueRecord) -> Result<String> {
        record_to_json(record, &self.config)
    }
}
