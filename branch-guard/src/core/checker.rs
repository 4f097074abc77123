//! The consistency checker.

use super::{
    Assessment, ConsistencyPolicy, PolicyKind, QualityScore, Record, RecordSet, Violation,
    ViolationReport,
};
use crate::logging::LogConfig;
use crate::logic::RuleSet;
use crate::prelude::*;
use crate::{log_violation, perf_debug};
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument, warn};

/// Configuration for a [`ConsistencyChecker`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckerConfig {
    /// The consistency policy
    pub policy: PolicyKind,
    /// Number of contiguous chunks checked concurrently; 0 and 1 mean a
    /// single sequential pass
    pub partitions: usize,
    /// Field whose value identifies a record in violations
    pub record_id_field: Option<String>,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            policy: PolicyKind::Enhanced,
            partitions: 1,
            record_id_field: Some("record_id".to_string()),
        }
    }
}

impl CheckerConfig {
    /// Sets the policy.
    pub fn with_policy(mut self, policy: PolicyKind) -> Self {
        self.policy = policy;
        self
    }

    /// Sets the number of partitions.
    pub fn with_partitions(mut self, partitions: usize) -> Self {
        self.partitions = partitions;
        self
    }

    /// Sets one partition per available CPU.
    pub fn with_cpu_partitions(self) -> Self {
        self.with_partitions(num_cpus::get())
    }

    /// Sets the record id field, or disables record ids with `None`.
    pub fn with_record_id_field(mut self, field: Option<String>) -> Self {
        self.record_id_field = field;
        self
    }
}

/// Checks records against compiled rules and scores the result.
///
/// # Examples
///
/// ```rust
/// use branch_guard::core::{CheckerConfig, ConsistencyChecker, Record, RecordSet};
/// use branch_guard::logic::{CompilerOptions, LogicCompiler};
/// use branch_guard::core::FieldMetadata;
///
/// let metadata = vec![FieldMetadata::new("symptom_detail", "[has_symptom] = '1'")];
/// let rules = LogicCompiler::new(CompilerOptions::legacy()).compile_rules(&metadata);
/// let records = RecordSet::from_records(vec![
///     Record::from([("has_symptom", "1"), ("symptom_detail", "")]),
///     Record::from([("has_symptom", "1"), ("symptom_detail", "fever")]),
/// ]);
///
/// let checker = ConsistencyChecker::new(CheckerConfig::default());
/// let (report, score) = checker.run_quality_check(&rules, &records);
/// assert_eq!(report.violation_count(), 1);
/// assert_eq!(score.value(), Some(50.0));
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConsistencyChecker {
    config: CheckerConfig,
    log_config: LogConfig,
}

impl ConsistencyChecker {
    /// Creates a checker.
    pub fn new(config: CheckerConfig) -> Self {
        Self {
            config,
            log_config: LogConfig::default(),
        }
    }

    /// Sets the logging configuration.
    pub fn with_log_config(mut self, log_config: LogConfig) -> Self {
        self.log_config = log_config;
        self
    }

    /// Returns the configuration of this checker.
    pub fn config(&self) -> &CheckerConfig {
        &self.config
    }

    /// Checks every record against every rule in a single pass.
    #[instrument(skip_all, fields(policy = %self.config.policy, rules = rules.len(), records = records.len()))]
    pub fn check_all(&self, rules: &RuleSet, records: &RecordSet) -> ViolationReport {
        let start = Instant::now();
        let report = self.check_slice(rules, records.records(), 0, true);
        self.log_summary(&report, start);
        report
    }

    /// Checks records on blocking tasks, one contiguous chunk per partition.
    ///
    /// Partial reports are merged in chunk order, so the result equals the one
    /// of [`check_all`](Self::check_all). Must be called within a Tokio
    /// runtime.
    #[instrument(skip_all, fields(policy = %self.config.policy, partitions = self.config.partitions))]
    pub async fn check_all_partitioned(
        &self,
        rules: Arc<RuleSet>,
        records: Arc<RecordSet>,
    ) -> Result<ViolationReport> {
        let partitions = self.config.partitions.max(1);
        if partitions == 1 || records.len() < 2 {
            return Ok(self.check_all(&rules, &records));
        }

        let start = Instant::now();
        let chunk_size = records.len().div_ceil(partitions);
        let tasks = (0..records.len()).step_by(chunk_size).map(|offset| {
            let checker = self.clone();
            let rules = Arc::clone(&rules);
            let records = Arc::clone(&records);
            tokio::task::spawn_blocking(move || {
                let end = (offset + chunk_size).min(records.len());
                checker.check_slice(&rules, &records.records()[offset..end], offset, false)
            })
        });

        let partials = try_join_all(tasks).await?;
        perf_debug!(self.log_config, partials = partials.len(), "Merging partial reports");

        let mut report = ViolationReport::new();
        for partial in partials {
            report.merge(partial);
        }
        for field in &report.missing_fields {
            warn!(
                field = %field,
                "Field referenced by branching logic is missing from records, skipping"
            );
        }
        self.log_summary(&report, start);
        Ok(report)
    }

    /// Checks all records and computes the quality score.
    pub fn run_quality_check(
        &self,
        rules: &RuleSet,
        records: &RecordSet,
    ) -> (ViolationReport, QualityScore) {
        let report = self.check_all(rules, records);
        let score = report.quality_score();
        (report, score)
    }

    /// Checks `records`, whose first element sits at row `offset`.
    ///
    /// Partitions pass `warn_missing = false`; their caller warns once per
    /// field after merging.
    fn check_slice(
        &self,
        rules: &RuleSet,
        records: &[Record],
        offset: usize,
        warn_missing: bool,
    ) -> ViolationReport {
        let policy = self.config.policy.policy();
        let mut report = ViolationReport::new();

        for (i, record) in records.iter().enumerate() {
            let record_index = offset + i;
            for rule in rules {
                match policy.assess(rule, record) {
                    Ok(Assessment::Consistent) => report.record_consistent(),
                    Ok(Assessment::Inconsistent(kind)) => {
                        let violation = Violation {
                            record_index,
                            record_id: self.record_id(record),
                            governed_field: rule.governed_field().to_string(),
                            trigger_field: rule.trigger_field().to_string(),
                            kind,
                            rule: rule.to_string(),
                        };
                        log_violation!(
                            self.log_config,
                            record_index,
                            governed_field = %violation.governed_field,
                            kind = ?kind,
                            "Inconsistent field"
                        );
                        report.record_violation(violation);
                    }
                    Err(GuardError::MissingField { field }) => {
                        if report.record_skipped(&field) && warn_missing {
                            warn!(
                                field = %field,
                                governed_field = %rule.governed_field(),
                                record_index,
                                "Field referenced by branching logic is missing from records, skipping"
                            );
                        }
                    }
                    Err(e) => {
                        warn!(
                            governed_field = %rule.governed_field(),
                            record_index,
                            error = %e,
                            "Cannot assess rule, skipping"
                        );
                        report.record_skipped(rule.governed_field());
                    }
                }
            }
        }

        report
    }

    fn record_id(&self, record: &Record) -> Option<String> {
        let field = self.config.record_id_field.as_deref()?;
        record
            .get(field)
            .filter(|id| !id.is_empty())
            .map(|id| crate::logging::truncate_field(id, self.log_config.max_field_length))
    }

    fn log_summary(&self, report: &ViolationReport, start: Instant) {
        if self.log_config.log_metrics {
            info!(
                policy = %self.config.policy,
                total_pairs = report.total_pairs,
                checked = report.checked,
                consistent = report.consistent,
                skipped = report.skipped,
                violations = report.violation_count(),
                quality_score = %report.quality_score(),
                duration_ms = start.elapsed().as_millis() as u64,
                "Consistency check completed"
            );
        }
    }
}

/// Checks every record against every rule with the given policy.
pub fn check_all(rules: &RuleSet, records: &RecordSet, policy: PolicyKind) -> ViolationReport {
    ConsistencyChecker::new(CheckerConfig::default().with_policy(policy)).check_all(rules, records)
}

/// Checks every record and computes the quality score.
///
/// ```rust
/// use branch_guard::core::{run_quality_check, PolicyKind, RecordSet};
/// use branch_guard::logic::RuleSet;
///
/// let (report, score) = run_quality_check(&RuleSet::default(), &RecordSet::new(), PolicyKind::Enhanced);
/// assert!(report.is_clean());
/// assert_eq!(score.to_string(), "n/a");
/// ```
pub fn run_quality_check(
    rules: &RuleSet,
    records: &RecordSet,
    policy: PolicyKind,
) -> (ViolationReport, QualityScore) {
    let report = check_all(rules, records, policy);
    let score = report.quality_score();
    (report, score)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ViolationKind;
    use crate::logic::{CompiledRule, Condition};

    fn symptom_rules() -> RuleSet {
        RuleSet::from_rules(vec![CompiledRule::new(
            "symptom_detail",
            Condition::new("has_symptom", "1"),
        )])
    }

    fn symptom_records() -> RecordSet {
        RecordSet::from_records(vec![
            Record::from([("record_id", "1"), ("has_symptom", "1"), ("symptom_detail", "")]),
            Record::from([("record_id", "2"), ("has_symptom", "0"), ("symptom_detail", "")]),
            Record::from([
                ("record_id", "3"),
                ("has_symptom", "1"),
                ("symptom_detail", "fever"),
            ]),
        ])
    }

    #[test]
    fn test_scenario_one_missing_value() {
        let (report, score) =
            run_quality_check(&symptom_rules(), &symptom_records(), PolicyKind::Enhanced);

        assert_eq!(report.violation_count(), 1);
        let violation = &report.violations[0];
        assert_eq!(violation.record_index, 0);
        assert_eq!(violation.record_id.as_deref(), Some("1"));
        assert_eq!(violation.governed_field, "symptom_detail");
        assert_eq!(violation.trigger_field, "has_symptom");
        assert_eq!(violation.kind, ViolationKind::MissingValue);
        assert_eq!(violation.rule, "[has_symptom] = '1'");
        assert_eq!(score.to_string(), "66.67%");
    }

    #[test]
    fn test_zero_records_gives_sentinel() {
        let (report, score) =
            run_quality_check(&symptom_rules(), &RecordSet::new(), PolicyKind::Simple);
        assert_eq!(report.checked, 0);
        assert!(!score.is_defined());
    }

    #[test]
    fn test_missing_reference_is_skipped() {
        let records = RecordSet::from_records(vec![
            Record::from([("symptom_detail", "")]),
            Record::from([("has_symptom", "0"), ("symptom_detail", "")]),
        ]);
        let report = check_all(&symptom_rules(), &records, PolicyKind::Enhanced);
        assert_eq!(report.total_pairs, 2);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.checked, 1);
        assert!(report.missing_fields.contains("has_symptom"));
        assert_eq!(report.quality_score().value(), Some(100.0));
    }

    #[test]
    fn test_record_id_can_be_disabled() {
        let checker =
            ConsistencyChecker::new(CheckerConfig::default().with_record_id_field(None));
        let report = checker.check_all(&symptom_rules(), &symptom_records());
        assert_eq!(report.violations[0].record_id, None);
    }

    #[tokio::test]
    async fn test_partitioned_matches_sequential() {
        let records: RecordSet = (0..23)
            .map(|i| {
                Record::from([
                    ("record_id", i.to_string()),
                    ("has_symptom", (i % 3).to_string()),
                    (
                        "symptom_detail",
                        if i % 2 == 0 { "x".to_string() } else { String::new() },
                    ),
                ])
            })
            .collect();
        let rules = Arc::new(symptom_rules());
        let records = Arc::new(records);

        let sequential = ConsistencyChecker::default().check_all(&rules, &records);
        for partitions in [2, 4, 7, 50] {
            let checker =
                ConsistencyChecker::new(CheckerConfig::default().with_partitions(partitions));
            let partitioned = checker
                .check_all_partitioned(Arc::clone(&rules), Arc::clone(&records))
                .await
                .unwrap();
            assert_eq!(partitioned, sequential, "partitions = {partitions}");
        }
    }
}
