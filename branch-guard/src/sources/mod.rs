//! Metadata and record feeds.
//!
//! A run needs two feeds: the field metadata (field names and their branching
//! logic) and the exported records. Both are fetched once per run through the
//! async traits below, so file exports, DataFusion tables and the REDCap API
//! are interchangeable.

use crate::prelude::*;
use async_trait::async_trait;
use std::fmt::Debug;
use std::path::Path;
use std::sync::Arc;

mod csv;
mod json;
mod memory;
#[cfg(feature = "redcap")]
mod redcap;
mod table;

pub use csv::{CsvOptions, CsvSource};
pub use json::JsonSource;
pub use memory::MemorySource;
#[cfg(feature = "redcap")]
pub use redcap::{ApiToken, RedcapConfig, RedcapSource};
pub use table::TableSource;

/// Common behavior of every feed.
pub trait Source: Debug + Send + Sync {
    /// Returns a human-readable description of this source.
    fn description(&self) -> String;
}

/// A feed of field metadata.
#[async_trait]
pub trait MetadataSource: Source {
    /// Fetches the metadata of every field, in instrument order.
    async fn load_metadata(&self) -> Result<Vec<FieldMetadata>>;
}

/// A feed of exported records.
#[async_trait]
pub trait RecordSource: Source {
    /// Fetches every record, in export order.
    async fn load_records(&self) -> Result<RecordSet>;
}

/// Export file formats understood by [`metadata_from_path`] and
/// [`records_from_path`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    /// REDCap JSON export (array of objects)
    Json,
    /// CSV export or data dictionary
    Csv,
}

impl FileFormat {
    /// Detects the format from the file extension.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("json") => Ok(Self::Json),
            Some("csv") => Ok(Self::Csv),
            _ => Err(GuardError::Configuration(format!(
                "cannot tell the format of '{}', expected a .json or .csv file",
                path.display()
            ))),
        }
    }
}

/// Opens a metadata export file, picking the source from its extension.
pub fn metadata_from_path(path: impl AsRef<Path>) -> Result<Arc<dyn MetadataSource>> {
    let path = path.as_ref();
    Ok(match FileFormat::from_path(path)? {
        FileFormat::Json => Arc::new(JsonSource::new(path)),
        FileFormat::Csv => Arc::new(CsvSource::new(path)),
    })
}

/// Opens a record export file, picking the source from its extension.
pub fn records_from_path(path: impl AsRef<Path>) -> Result<Arc<dyn RecordSource>> {
    let path = path.as_ref();
    Ok(match FileFormat::from_path(path)? {
        FileFormat::Json => Arc::new(JsonSource::new(path)),
        FileFormat::Csv => Arc::new(CsvSource::new(path)),
    })
}
