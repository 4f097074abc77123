//! Records from DataFusion tables.

use super::{RecordSource, Source};
use crate::log_data_op;
use crate::prelude::*;
use async_trait::async_trait;
use datafusion::prelude::SessionContext;
use std::fmt;

/// Reads records by running a SQL query against a session context.
///
/// The caller registers the table (a relational extract, a Parquet file, an
/// in-memory batch) on the context; every selected column is converted to text.
///
/// # Examples
///
/// ```rust,no_run
/// use branch_guard::sources::{RecordSource, TableSource};
/// use datafusion::prelude::*;
///
/// # async fn example() -> branch_guard::error::Result<()> {
/// let ctx = SessionContext::new();
/// ctx.register_csv("survey", "survey.csv", CsvReadOptions::new()).await?;
///
/// let records = TableSource::table(ctx, "survey").load_records().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct TableSource {
    ctx: SessionContext,
    query: String,
    log_config: LogConfig,
}

impl TableSource {
    /// Creates a source running `query`.
    pub fn new(ctx: SessionContext, query: impl Into<String>) -> Self {
        Self {
            ctx,
            query: query.into(),
            log_config: LogConfig::default(),
        }
    }

    /// Creates a source selecting every row of `table_name`.
    pub fn table(ctx: SessionContext, table_name: &str) -> Self {
        Self::new(
            ctx,
            format!("SELECT * FROM \"{}\"", table_name.replace('"', "\"\"")),
        )
    }

    /// Sets the logging configuration.
    pub fn with_log_config(mut self, log_config: LogConfig) -> Self {
        self.log_config = log_config;
        self
    }

    /// Returns the query this source runs.
    pub fn query(&self) -> &str {
        &self.query
    }
}

impl fmt::Debug for TableSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableSource")
            .field("session_id", &self.ctx.session_id())
            .field("query", &self.query)
            .finish()
    }
}

impl Source for TableSource {
    fn description(&self) -> String {
        format!("DataFusion query: {}", self.query)
    }
}

#[async_trait]
impl RecordSource for TableSource {
    async fn load_records(&self) -> Result<RecordSet> {
        let batches = self.ctx.sql(&self.query).await?.collect().await?;
        let records = RecordSet::from_batches(&batches)?;
        log_data_op!(
            self.log_config,
            query = %self.query,
            records = records.len(),
            "Read records from DataFusion"
        );
        Ok(records)
    }
}
