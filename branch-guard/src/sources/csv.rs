//! CSV exports and data dictionaries, read through DataFusion.

use super::{MetadataSource, RecordSource, Source};
use crate::log_data_op;
use crate::prelude::*;
use arrow::csv::reader::Format;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use datafusion::prelude::{CsvReadOptions, SessionContext};
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::instrument;

/// Options for reading CSV exports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsvOptions {
    /// Field delimiter
    pub delimiter: u8,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self { delimiter: b',' }
    }
}

impl CsvOptions {
    /// Sets the field delimiter.
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }
}

/// Reads a CSV export with a header row.
///
/// Every column is read as text, so codes such as `01` keep their leading
/// zeros and are compared exactly as exported. Empty cells become empty
/// values. As a metadata feed the file may be a REDCap data dictionary.
#[derive(Debug, Clone)]
pub struct CsvSource {
    path: PathBuf,
    options: CsvOptions,
    log_config: LogConfig,
}

impl CsvSource {
    /// Creates a source for the file at `path`.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            options: CsvOptions::default(),
            log_config: LogConfig::default(),
        }
    }

    /// Sets the reading options.
    pub fn with_options(mut self, options: CsvOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the logging configuration.
    pub fn with_log_config(mut self, log_config: LogConfig) -> Self {
        self.log_config = log_config;
        self
    }

    /// Returns the file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Builds an all-text schema from the header row.
    fn text_schema(&self) -> Result<Schema> {
        let file = File::open(&self.path).map_err(|e| {
            GuardError::data_source_with_source(
                "CSV",
                format!("cannot open '{}'", self.path.display()),
                Box::new(e),
            )
        })?;
        let (inferred, _) = Format::default()
            .with_header(true)
            .with_delimiter(self.options.delimiter)
            .infer_schema(file, Some(1))?;

        Ok(Schema::new(
            inferred
                .fields()
                .iter()
                .map(|f| Field::new(f.name(), DataType::Utf8, true))
                .collect::<Vec<_>>(),
        ))
    }

    #[instrument(skip(self), fields(path = %self.path.display()))]
    async fn read_batches(&self) -> Result<Vec<RecordBatch>> {
        let schema = self.text_schema()?;
        let path = self.path.to_str().ok_or_else(|| {
            GuardError::data_source("CSV", format!("path '{}' is not UTF-8", self.path.display()))
        })?;
        // DataFusion filters listed files by extension, so pass the real one
        let extension = self
            .path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{e}"))
            .unwrap_or_default();

        let options = CsvReadOptions::new()
            .has_header(true)
            .delimiter(self.options.delimiter)
            .schema(&schema)
            .file_extension(&extension);

        let ctx = SessionContext::new();
        let batches = ctx.read_csv(path, options).await?.collect().await?;
        log_data_op!(
            self.log_config,
            path = %self.path.display(),
            columns = schema.fields().len(),
            batches = batches.len(),
            "Read CSV export"
        );
        Ok(batches)
    }
}

impl Source for CsvSource {
    fn description(&self) -> String {
        format!("CSV file: {}", self.path.display())
    }
}

#[async_trait]
impl MetadataSource for CsvSource {
    async fn load_metadata(&self) -> Result<Vec<FieldMetadata>> {
        let rows = RecordSet::from_batches(&self.read_batches().await?)?;
        FieldMetadata::from_records(&rows)
    }
}

#[async_trait]
impl RecordSource for CsvSource {
    async fn load_records(&self) -> Result<RecordSet> {
        RecordSet::from_batches(&self.read_batches().await?)
    }
}
