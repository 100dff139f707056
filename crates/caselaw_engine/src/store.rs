use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use caselaw_logging::{harvest_debug, harvest_warn};
use serde::{Deserialize, Serialize};

use crate::persist::{AtomicFileWriter, PersistError};

pub const RECORD_EXTENSION: &str = "json";

/// One downloaded judgment as stored on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseRecord {
    pub title: String,
    pub url: String,
    pub fetched_utc: String,
    pub status: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    /// Decoded page as received, so later passes can re-extract without refetching.
    pub raw_response: String,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("io error reading {path}")]
    Read { path: PathBuf, source: io::Error },
    #[error("malformed record {path}")]
    Malformed {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to encode record: {0}")]
    Encode(#[from] serde_json::Error),
    #[error(transparent)]
    Persist(#[from] PersistError),
}

/// Atomically write `record` as `{dir}/{name}.json`.
pub fn save_record(dir: &Path, name: &str, record: &CaseRecord) -> Result<PathBuf, StoreError> {
    let content = serde_json::to_vec_pretty(record)?;
    let writer = AtomicFileWriter::new(dir);
    let path = writer.write(&format!("{name}.{RECORD_EXTENSION}"), &content)?;
    Ok(path)
}

pub fn load_record(path: &Path) -> Result<CaseRecord, StoreError> {
    let content = fs::read(path).map_err(|source| StoreError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&content).map_err(|source| StoreError::Malformed {
        path: path.to_path_buf(),
        source,
    })
}

/// URLs of every record already saved in `dir`.
///
/// A missing directory is an empty store. Files that are not records, or
/// that fail to parse, are logged and skipped: their URLs will be fetched again.
pub fn saved_urls(dir: &Path) -> Result<HashSet<String>, StoreError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(HashSet::new()),
        Err(source) => {
            return Err(StoreError::Read {
                path: dir.to_path_buf(),
                source,
            })
        }
    };

    let mut urls = HashSet::new();
    for entry in entries.filter_map(Result::ok) {
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some(RECORD_EXTENSION) {
            harvest_debug!("Skipping non-record file {:?}", path);
            continue;
        }
        match load_record(&path) {
            Ok(record) => {
                urls.insert(record.url);
            }
            Err(err) => match std::error::Error::source(&err) {
                Some(cause) => harvest_warn!("Ignoring unreadable record: {}: {}", err, cause),
                None => harvest_warn!("Ignoring unreadable record: {}", err),
            },
        }
    }
    Ok(urls)
}
