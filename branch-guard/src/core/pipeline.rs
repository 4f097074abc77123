//! End-to-end quality runs: sources, compiler, checker and threshold.

use super::{
    CheckerConfig, ConsistencyChecker, FieldMetadata, PolicyKind, QualityScore, RecordSet,
    ViolationReport,
};
use crate::log_data_op;
use crate::logging::LogConfig;
use crate::logic::{CompilerOptions, LogicCompiler, RejectedLogic};
use crate::prelude::*;
use crate::sources::{MetadataSource, RecordSource};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument, warn};

/// Configuration of a quality run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Compiler options
    pub compiler: CompilerOptions,
    /// Checker configuration
    pub checker: CheckerConfig,
    /// Minimum quality score in percent; `None` disables the threshold
    pub min_quality: Option<f64>,
}

impl PipelineConfig {
    /// Settings that reproduce legacy audit scores.
    pub fn legacy() -> Self {
        Self::default()
    }

    /// Settings with full-width literals and strict grammar checking.
    pub fn corrected() -> Self {
        Self {
            compiler: CompilerOptions::corrected(),
            ..Self::default()
        }
    }

    /// Loads a configuration from a JSON file.
    ///
    /// Missing keys take their default value.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config: PipelineConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Sets the minimum quality score.
    pub fn with_min_quality(mut self, min_quality: f64) -> Self {
        self.min_quality = Some(min_quality);
        self
    }

    /// Checks that the configuration is usable.
    pub fn validate(&self) -> Result<()> {
        if let Some(min) = self.min_quality {
            if !(0.0..=100.0).contains(&min) {
                return Err(GuardError::Configuration(format!(
                    "min_quality must be between 0 and 100, got {min}"
                )));
            }
        }
        Ok(())
    }
}

/// Everything a run produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    /// Name of the run
    pub name: String,
    /// When the run finished (RFC 3339)
    pub timestamp: String,
    /// Policy used to assess pairs
    pub policy: PolicyKind,
    /// Number of compiled rules
    pub rules: usize,
    /// Fields whose logic was rejected
    pub rejected_rules: Vec<RejectedLogic>,
    /// Number of records checked
    pub records: usize,
    /// Violations and counters
    pub report: ViolationReport,
    /// Quality score of the run
    pub score: QualityScore,
    /// Threshold the score was compared with
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_quality: Option<f64>,
    /// Wall time of the run in milliseconds
    pub execution_time_ms: u64,
}

/// Outcome of a quality run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum QualityResult {
    /// The score met the threshold, or no threshold was set
    Passed {
        /// The run's report
        report: QualityReport,
    },
    /// The score is below the threshold, or undefined while one is set
    Failed {
        /// The run's report
        report: QualityReport,
    },
}

impl QualityResult {
    /// Returns true if the run passed.
    pub fn is_passed(&self) -> bool {
        matches!(self, QualityResult::Passed { .. })
    }

    /// Returns the report.
    pub fn report(&self) -> &QualityReport {
        match self {
            QualityResult::Passed { report } | QualityResult::Failed { report } => report,
        }
    }

    fn judge(report: QualityReport) -> Self {
        match report.min_quality {
            Some(min) if !report.score.meets(min) => QualityResult::Failed { report },
            _ => QualityResult::Passed { report },
        }
    }
}

/// A configured quality run over injected sources.
///
/// # Examples
///
/// ```rust
/// use branch_guard::core::{FieldMetadata, QualityPipeline, Record, RecordSet};
/// use branch_guard::sources::MemorySource;
/// use std::sync::Arc;
///
/// # #[tokio::main]
/// # async fn main() {
/// let source = Arc::new(MemorySource::new(
///     vec![FieldMetadata::new("symptom_detail", "[has_symptom] = '1'")],
///     RecordSet::from_records(vec![
///         Record::from([("has_symptom", "1"), ("symptom_detail", "fever")]),
///     ]),
/// ));
///
/// let pipeline = QualityPipeline::builder("survey")
///     .metadata(source.clone())
///     .records(source)
///     .min_quality(90.0)
///     .build()
///     .unwrap();
///
/// let result = pipeline.run().await.unwrap();
/// assert!(result.is_passed());
/// # }
/// ```
#[derive(Debug)]
pub struct QualityPipeline {
    name: String,
    metadata: Arc<dyn MetadataSource>,
    records: Arc<dyn RecordSource>,
    config: PipelineConfig,
    log_config: LogConfig,
}

impl QualityPipeline {
    /// Creates a new builder.
    pub fn builder(name: impl Into<String>) -> QualityPipelineBuilder {
        QualityPipelineBuilder::new(name)
    }

    /// Returns the name of the run.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Loads both feeds and runs the check.
    #[instrument(skip(self), fields(
        pipeline.name = %self.name,
        metadata.source = %self.metadata.description(),
        records.source = %self.records.description()
    ))]
    pub async fn run(&self) -> Result<QualityResult> {
        let start = Instant::now();
        let (metadata, records) =
            tokio::try_join!(self.metadata.load_metadata(), self.records.load_records())?;
        log_data_op!(
            self.log_config,
            fields = metadata.len(),
            records = records.len(),
            "Loaded metadata and records"
        );
        self.evaluate_since(metadata, records, start).await
    }

    /// Runs the check over already loaded feeds.
    pub async fn evaluate(
        &self,
        metadata: Vec<FieldMetadata>,
        records: RecordSet,
    ) -> Result<QualityResult> {
        self.evaluate_since(metadata, records, Instant::now()).await
    }

    async fn evaluate_since(
        &self,
        metadata: Vec<FieldMetadata>,
        records: RecordSet,
        start: Instant,
    ) -> Result<QualityResult> {
        let compiler = LogicCompiler::new(self.config.compiler);
        let rules = compiler.compile_rules(&metadata);
        let rejected_rules = rules.rejected().to_vec();
        let rule_count = rules.len();

        let checker = ConsistencyChecker::new(self.config.checker.clone())
            .with_log_config(self.log_config.clone());
        let record_count = records.len();
        let report = checker
            .check_all_partitioned(Arc::new(rules), Arc::new(records))
            .await?;
        let score = report.quality_score();

        if !score.is_defined() {
            warn!(pipeline.name = %self.name, "No (record, rule) pair could be scored");
        }

        let report = QualityReport {
            name: self.name.clone(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            policy: self.config.checker.policy,
            rules: rule_count,
            rejected_rules,
            records: record_count,
            report,
            score,
            min_quality: self.config.min_quality,
            execution_time_ms: start.elapsed().as_millis() as u64,
        };

        let result = QualityResult::judge(report);
        info!(
            pipeline.name = %self.name,
            passed = result.is_passed(),
            score = %result.report().score,
            violations = result.report().report.violation_count(),
            "Quality run completed"
        );
        Ok(result)
    }
}

/// Builder for [`QualityPipeline`].
#[derive(Debug)]
pub struct QualityPipelineBuilder {
    name: String,
    metadata: Option<Arc<dyn MetadataSource>>,
    records: Option<Arc<dyn RecordSource>>,
    config: PipelineConfig,
    log_config: LogConfig,
}

impl QualityPipelineBuilder {
    /// Creates a builder for a run called `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            metadata: None,
            records: None,
            config: PipelineConfig::default(),
            log_config: LogConfig::default(),
        }
    }

    /// Sets the metadata source.
    pub fn metadata(mut self, source: Arc<dyn MetadataSource>) -> Self {
        self.metadata = Some(source);
        self
    }

    /// Sets the record source.
    pub fn records(mut self, source: Arc<dyn RecordSource>) -> Self {
        self.records = Some(source);
        self
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the minimum quality score.
    pub fn min_quality(mut self, min_quality: f64) -> Self {
        self.config.min_quality = Some(min_quality);
        self
    }

    /// Sets the consistency policy.
    pub fn policy(mut self, policy: PolicyKind) -> Self {
        self.config.checker.policy = policy;
        self
    }

    /// Sets the logging configuration.
    pub fn log_config(mut self, log_config: LogConfig) -> Self {
        self.log_config = log_config;
        self
    }

    /// Builds the pipeline.
    ///
    /// Fails if a source is missing or the configuration is invalid.
    pub fn build(self) -> Result<QualityPipeline> {
        self.config.validate()?;
        let metadata = self
            .metadata
            .ok_or_else(|| GuardError::Configuration("no metadata source configured".to_string()))?;
        let records = self
            .records
            .ok_or_else(|| GuardError::Configuration("no record source configured".to_string()))?;

        Ok(QualityPipeline {
            name: self.name,
            metadata,
            records,
            config: self.config,
            log_config: self.log_config,
        })
    }
}
