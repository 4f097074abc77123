//! Records and record sets.

use crate::prelude::*;
use arrow::array::{Array, AsArray, StringArray};
use arrow::compute::cast;
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeSet, HashMap};

/// One exported record: field name to raw string value.
///
/// Blank and null values are stored as the empty string. A field that is not a
/// key of the record is absent from its schema, which is different from being
/// blank.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    values: HashMap<String, String>,
}

impl Record {
    /// Creates an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a field value.
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.values.insert(field.into(), value.into());
    }

    /// Returns the value of `field`, or `None` if the field is absent.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.values.get(field).map(String::as_str)
    }

    /// Returns the value of `field`, failing with `MissingField` if absent.
    pub fn value(&self, field: &str) -> Result<&str> {
        self.get(field).ok_or_else(|| GuardError::missing_field(field))
    }

    /// Returns true if `field` holds a non-empty value.
    pub fn is_populated(&self, field: &str) -> Result<bool> {
        self.value(field).map(|v| !v.is_empty())
    }

    /// Returns true if `field` is part of this record's schema.
    pub fn contains(&self, field: &str) -> bool {
        self.values.contains_key(field)
    }

    /// Iterates the field names of this record.
    pub fn fields(&self) -> impl Iterator<Item = &str> + '_ {
        self.values.keys().map(String::as_str)
    }

    /// Number of fields in this record.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if the record has no fields.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Builds a record from one JSON export row.
    ///
    /// Strings are kept verbatim, null becomes the empty string and any other
    /// value is rendered as JSON text.
    pub fn from_json_row(row: Map<String, Value>) -> Self {
        row.into_iter()
            .map(|(field, value)| {
                let text = match value {
                    Value::String(s) => s,
                    Value::Null => String::new(),
                    other => other.to_string(),
                };
                (field, text)
            })
            .collect()
    }
}

impl<K, V> FromIterator<(K, V)> for Record
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for Record
where
    K: Into<String>,
    V: Into<String>,
{
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

/// The records of one run, in export order.
///
/// A record's index in the set is the row index reported with violations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSet {
    columns: Vec<String>,
    records: Vec<Record>,
}

impl RecordSet {
    /// Creates an empty record set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a record set from records.
    ///
    /// The column list is the sorted union of the records' fields.
    pub fn from_records(records: Vec<Record>) -> Self {
        let columns: BTreeSet<&str> = records.iter().flat_map(Record::fields).collect();
        Self {
            columns: columns.into_iter().map(str::to_string).collect(),
            records,
        }
    }

    /// Creates a record set from JSON export rows.
    pub fn from_json_rows(rows: Vec<Map<String, Value>>) -> Self {
        Self::from_records(rows.into_iter().map(Record::from_json_row).collect())
    }

    /// Creates a record set from Arrow batches.
    ///
    /// Every column is cast to UTF-8 and nulls become empty strings. The
    /// column list is taken from the first batch's schema.
    pub fn from_batches(batches: &[RecordBatch]) -> Result<Self> {
        let mut set = RecordSet::new();
        if let Some(first) = batches.first() {
            set.columns = first
                .schema()
                .fields()
                .iter()
                .map(|f| f.name().clone())
                .collect();
        }

        for batch in batches {
            let schema = batch.schema();
            let text_columns = batch
                .columns()
                .iter()
                .map(|column| cast(column, &DataType::Utf8))
                .collect::<std::result::Result<Vec<_>, _>>()?;
            let strings: Vec<&StringArray> =
                text_columns.iter().map(|c| c.as_string::<i32>()).collect();

            for row in 0..batch.num_rows() {
                let record: Record = schema
                    .fields()
                    .iter()
                    .zip(&strings)
                    .map(|(field, values)| {
                        let value = if values.is_null(row) {
                            ""
                        } else {
                            values.value(row)
                        };
                        (field.name().as_str(), value)
                    })
                    .collect();
                set.records.push(record);
            }
        }

        Ok(set)
    }

    /// Appends a record.
    pub fn push(&mut self, record: Record) {
        for field in record.fields() {
            if !self.columns.iter().any(|c| c == field) {
                self.columns.push(field.to_string());
            }
        }
        self.records.push(record);
    }

    /// The known column names.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// The records.
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Returns the record at `index`.
    pub fn get(&self, index: usize) -> Option<&Record> {
        self.records.get(index)
    }

    /// Iterates the records.
    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if there are no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl<'a> IntoIterator for &'a RecordSet {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

impl FromIterator<Record> for RecordSet {
    fn from_iter<T: IntoIterator<Item = Record>>(iter: T) -> Self {
        Self::from_records(iter.into_iter().collect())
    }
}
