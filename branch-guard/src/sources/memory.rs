//! In-memory feeds.

use super::{MetadataSource, RecordSource, Source};
use crate::prelude::*;
use async_trait::async_trait;

/// Serves metadata and records held in memory.
///
/// Useful for tests and for callers that already fetched both feeds.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    metadata: Vec<FieldMetadata>,
    records: RecordSet,
}

impl MemorySource {
    /// Creates a source serving the given feeds.
    pub fn new(metadata: Vec<FieldMetadata>, records: RecordSet) -> Self {
        Self { metadata, records }
    }
}

impl Source for MemorySource {
    fn description(&self) -> String {
        format!(
            "Memory ({} fields, {} records)",
            self.metadata.len(),
            self.records.len()
        )
    }
}

#[async_trait]
impl MetadataSource for MemorySource {
    async fn load_metadata(&self) -> Result<Vec<FieldMetadata>> {
        Ok(self.metadata.clone())
    }
}

#[async_trait]
impl RecordSource for MemorySource {
    async fn load_records(&self) -> Result<RecordSet> {
        Ok(self.records.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_serves_feeds() {
        let source = MemorySource::new(
            vec![FieldMetadata::new("a", "")],
            RecordSet::from_records(vec![Record::from([("a", "1")])]),
        );
        assert_eq!(source.load_metadata().await.unwrap().len(), 1);
        assert_eq!(source.load_records().await.unwrap().len(), 1);
        assert_eq!(source.description(), "Memory (1 fields, 1 records)");
    }
}
