//! Field metadata as exported by REDCap.

use super::RecordSet;
use crate::prelude::*;
use serde::{Deserialize, Deserializer, Serialize};

/// Column names accepted for the field name, API export first.
const FIELD_NAME_COLUMNS: &[&str] = &["field_name", "Variable / Field Name"];

/// Column names accepted for the branching logic, API export first.
const BRANCHING_LOGIC_COLUMNS: &[&str] = &[
    "branching_logic",
    "Branching Logic (Show field only if...)",
];

/// One instrumented field and its branching logic.
///
/// Deserializes from the REDCap metadata export (`content=metadata`), where
/// every other column is ignored and a missing or null `branching_logic`
/// means the field is always shown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMetadata {
    /// The REDCap variable name
    pub field_name: String,
    /// The raw branching-logic expression, empty when the field has none
    #[serde(default, deserialize_with = "null_as_empty")]
    pub branching_logic: String,
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl FieldMetadata {
    /// Creates a metadata entry.
    pub fn new(field_name: impl Into<String>, branching_logic: impl Into<String>) -> Self {
        Self {
            field_name: field_name.into(),
            branching_logic: branching_logic.into(),
        }
    }

    /// Returns true if the field has branching logic.
    pub fn has_logic(&self) -> bool {
        !self.branching_logic.trim().is_empty()
    }

    /// Reads metadata out of a tabular export.
    ///
    /// Accepts both the API column names (`field_name`, `branching_logic`) and
    /// the data-dictionary CSV headers. Rows without a field name are skipped.
    pub fn from_records(rows: &RecordSet) -> Result<Vec<FieldMetadata>> {
        let name_column = find_column(rows, FIELD_NAME_COLUMNS).ok_or_else(|| {
            GuardError::Configuration(format!(
                "metadata has no field name column (expected one of {FIELD_NAME_COLUMNS:?})"
            ))
        })?;
        let logic_column = find_column(rows, BRANCHING_LOGIC_COLUMNS);

        Ok(rows
            .iter()
            .filter_map(|row| {
                let name = row.get(name_column)?.trim();
                if name.is_empty() {
                    return None;
                }
                let logic = logic_column.and_then(|c| row.get(c)).unwrap_or_default();
                Some(FieldMetadata::new(name, logic))
            })
            .collect())
    }
}

fn find_column<'a>(rows: &RecordSet, candidates: &[&'a str]) -> Option<&'a str> {
    candidates
        .iter()
        .copied()
        .find(|candidate| rows.columns().iter().any(|c| c == candidate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Record;

    #[test]
    fn test_deserialize_api_export() {
        let json = r#"[
            {"field_name": "record_id", "form_name": "intake", "branching_logic": ""},
            {"field_name": "symptom_detail", "branching_logic": "[has_symptom] = '1'"},
            {"field_name": "notes", "branching_logic": null},
            {"field_name": "age"}
        ]"#;
        let metadata: Vec<FieldMetadata> = serde_json::from_str(json).unwrap();
        assert_eq!(metadata.len(), 4);
        assert!(metadata[1].has_logic());
        assert_eq!(metadata[2].branching_logic, "");
        assert_eq!(metadata[3].branching_logic, "");
    }

    #[test]
    fn test_from_records_with_dictionary_headers() {
        let rows = RecordSet::from_records(vec![
            Record::from([
                ("Variable / Field Name", "has_symptom"),
                ("Branching Logic (Show field only if...)", ""),
            ]),
            Record::from([
                ("Variable / Field Name", "symptom_detail"),
                ("Branching Logic (Show field only if...)", "[has_symptom] = '1'"),
            ]),
            Record::from([
                ("Variable / Field Name", ""),
                ("Branching Logic (Show field only if...)", "[x] = '1'"),
            ]),
        ]);

        let metadata = FieldMetadata::from_records(&rows).unwrap();
        assert_eq!(
            metadata,
            vec![
                FieldMetadata::new("has_symptom", ""),
                FieldMetadata::new("symptom_detail", "[has_symptom] = '1'"),
            ]
        );
    }

    #[test]
    fn test_from_records_requires_field_name_column() {
        let rows = RecordSet::from_records(vec![Record::from([("label", "Age")])]);
        assert!(matches!(
            FieldMetadata::from_records(&rows),
            Err(GuardError::Configuration(_))
        ));
    }
}
