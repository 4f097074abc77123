//! REDCap JSON export files.

use super::{MetadataSource, RecordSource, Source};
use crate::log_data_op;
use crate::prelude::*;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// Reads a JSON export file (an array of flat objects).
///
/// The same file shape is produced by the API for `content=metadata` and
/// `content=record`, so one source serves both feeds.
#[derive(Debug, Clone)]
pub struct JsonSource {
    path: PathBuf,
    log_config: LogConfig,
}

impl JsonSource {
    /// Creates a source for the file at `path`.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            log_config: LogConfig::default(),
        }
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

    async fn read_rows(&self) -> Result<Vec<Map<String, Value>>> {
        let text = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            GuardError::data_source_with_source(
                "JSON",
                format!("cannot read '{}'", self.path.display()),
                Box::new(e),
            )
        })?;
        let rows = rows_from_json(&text, "JSON")?;
        log_data_op!(
            self.log_config,
            path = %self.path.display(),
            rows = rows.len(),
            "Read JSON export"
        );
        Ok(rows)
    }
}

impl Source for JsonSource {
    fn description(&self) -> String {
        format!("JSON file: {}", self.path.display())
    }
}

#[async_trait]
impl MetadataSource for JsonSource {
    async fn load_metadata(&self) -> Result<Vec<FieldMetadata>> {
        let rows = self.read_rows().await?;
        FieldMetadata::from_records(&RecordSet::from_json_rows(rows))
    }
}

#[async_trait]
impl RecordSource for JsonSource {
    async fn load_records(&self) -> Result<RecordSet> {
        Ok(RecordSet::from_json_rows(self.read_rows().await?))
    }
}

/// Parses a JSON export body into rows.
///
/// REDCap reports API failures as a JSON object with an `error` key; it is
/// turned into a data source error.
pub(crate) fn rows_from_json(text: &str, source_type: &str) -> Result<Vec<Map<String, Value>>> {
    let value: Value = serde_json::from_str(text).map_err(|e| {
        GuardError::data_source_with_source(source_type, "export is not valid JSON", Box::new(e))
    })?;

    match value {
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(i, item)| match item {
                Value::Object(row) => Ok(row),
                other => Err(GuardError::data_source(
                    source_type,
                    format!("row {i} is not an object: {other}"),
                )),
            })
            .collect(),
        Value::Object(mut object) => match object.remove("error") {
            Some(Value::String(message)) => Err(GuardError::data_source(source_type, message)),
            Some(other) => Err(GuardError::data_source(source_type, other.to_string())),
            None => Err(GuardError::data_source(
                source_type,
                "expected an array of rows, found an object",
            )),
        },
        other => Err(GuardError::data_source(
            source_type,
            format!("expected an array of rows, found {other}"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn export(body: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        file.write_all(body.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn test_load_records() {
        let file = export(
            r#"[{"record_id": "1", "has_symptom": "1", "symptom_detail": ""},
                {"record_id": 2, "has_symptom": null, "symptom_detail": "fever"}]"#,
        );
        let records = JsonSource::new(file.path()).load_records().await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records.records()[1].get("record_id"), Some("2"));
        assert_eq!(records.records()[1].get("has_symptom"), Some(""));
    }

    #[tokio::test]
    async fn test_load_metadata_ignores_extra_columns() {
        let file = export(
            r#"[{"field_name": "record_id", "form_name": "intake", "branching_logic": ""},
                {"field_name": "symptom_detail", "branching_logic": "[has_symptom] = '1'"},
                {"field_name": "notes"}]"#,
        );
        let metadata = JsonSource::new(file.path()).load_metadata().await.unwrap();
        assert_eq!(metadata.len(), 3);
        assert_eq!(metadata[1].branching_logic, "[has_symptom] = '1'");
        assert!(!metadata[2].has_logic());
    }

    #[test]
    fn test_api_error_body() {
        let err = rows_from_json(r#"{"error": "You do not have permissions"}"#, "REDCap")
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Data source error (REDCap): You do not have permissions"
        );
    }

    #[test]
    fn test_rejects_non_object_rows() {
        assert!(rows_from_json("[1, 2]", "JSON").is_err());
        assert!(rows_from_json("\"text\"", "JSON").is_err());
        assert!(rows_from_json("not json", "JSON").is_err());
    }

    #[tokio::test]
    async fn test_missing_file() {
        let err = JsonSource::new("/nonexistent/records.json")
            .load_records()
            .await
            .unwrap_err();
        assert!(matches!(err, GuardError::DataSource { .. }));
    }
}
