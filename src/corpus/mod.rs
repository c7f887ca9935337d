// Corpus loading
// Reads transcript rows from a headered CSV into documents


use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::CorpusConfig;
use crate::{Result, SearchError};

/// One transcript and the metadata shown alongside it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub title: String,
    pub channel: String,
    /// The text that gets embedded
    pub body: String,
}

impl Document {
    #[inline]
    pub fn new(
        title: impl Into<String>,
        channel: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            channel: channel.into(),
            body: body.into(),
        }
    }
}

/// Load documents from a CSV file, in file order
#[inline]
pub fn load_csv(path: &Path, columns: &CorpusConfig) -> Result<Vec<Document>> {
    info!("Loading corpus from {}", path.display());
    let file = File::open(path)?;
    let documents = from_reader(file, columns)?;
    info!("Loaded {} documents", documents.len());
    Ok(documents)
}

/// Read documents from any CSV source. The header row must name every
/// configured column; other columns are ignored.
#[inline]
pub fn from_reader<R: Read>(reader: R, columns: &CorpusConfig) -> Result<Vec<Document>> {
    let mut csv_reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);

    let headers = csv_reader
        .headers()
        .map_err(|e| SearchError::Validation(format!("unreadable CSV header: {}", e)))?
        .clone();

    let position = |name: &str| -> Result<usize> {
        headers
            .iter()
            .position(|h| h.trim() == name)
            .ok_or_else(|| SearchError::Validation(format!("missing required column: {}", name)))
    };

    let title_idx = position(&columns.title_column)?;
    let channel_idx = position(&columns.channel_column)?;
    let body_idx = position(&columns.body_column)?;
    debug!(
        "Corpus columns: title={}, channel={}, body={}",
        title_idx, channel_idx, body_idx
    );

    let mut documents = Vec::new();
    for (row, result) in csv_reader.records().enumerate() {
        let record = result
            .map_err(|e| SearchError::Validation(format!("malformed CSV row {}: {}", row, e)))?;
        let field = |idx: usize| record.get(idx).unwrap_or_default().to_string();

        documents.push(Document {
            title: field(title_idx),
            channel: field(channel_idx),
            body: field(body_idx),
        });
    }

    Ok(documents)
}
