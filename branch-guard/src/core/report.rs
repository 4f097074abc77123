//! Violation reports and quality scores.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// How a governed field disagrees with its rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// The rule holds but the governed field is empty
    MissingValue,
    /// The rule does not hold but the governed field is populated
    UnexpectedValue,
}

impl ViolationKind {
    /// Returns a short human-readable description.
    pub fn description(&self) -> &'static str {
        match self {
            ViolationKind::MissingValue => "branching logic holds but field is empty",
            ViolationKind::UnexpectedValue => "branching logic does not hold but field is filled",
        }
    }
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// One inconsistent (record, rule) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// Row index of the record in the record feed
    pub record_index: usize,
    /// Value of the configured record id field, if present
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_id: Option<String>,
    /// The field gated by the rule
    pub governed_field: String,
    /// The first field referenced by the rule
    pub trigger_field: String,
    /// Direction of the inconsistency
    pub kind: ViolationKind,
    /// The rule, rendered back to branching-logic text
    pub rule: String,
}

/// Percentage of checked pairs found consistent.
///
/// `None` means nothing was checked. It is kept apart from `Some(100.0)` so a
/// run without data is never reported as a perfect run.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QualityScore(Option<f64>);

impl QualityScore {
    /// Computes the score from pair counts.
    pub fn from_counts(consistent: usize, checked: usize) -> Self {
        if checked == 0 {
            Self(None)
        } else {
            Self(Some(consistent as f64 / checked as f64 * 100.0))
        }
    }

    /// The sentinel for "no pair scored".
    pub fn undefined() -> Self {
        Self(None)
    }

    /// Returns the percentage, if defined.
    pub fn value(&self) -> Option<f64> {
        self.0
    }

    /// Returns true if at least one pair was scored.
    pub fn is_defined(&self) -> bool {
        self.0.is_some()
    }

    /// Returns true if the score is defined and at least `threshold`.
    pub fn meets(&self, threshold: f64) -> bool {
        self.0.is_some_and(|score| score >= threshold)
    }
}

impl fmt::Display for QualityScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(score) => write!(f, "{score:.2}%"),
            None => f.write_str("n/a"),
        }
    }
}

/// Accumulated outcome of a consistency pass.
///
/// Counters:
/// - `total_pairs`: record x rule pairs visited
/// - `checked`: pairs that could be scored
/// - `consistent`: scored pairs found consistent
/// - `skipped`: pairs skipped because a field was absent from the record
///
/// `checked == consistent + violations.len()` and
/// `total_pairs == checked + skipped` always hold.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViolationReport {
    /// Inconsistent pairs in record order
    pub violations: Vec<Violation>,
    /// Pairs visited
    pub total_pairs: usize,
    /// Pairs scored
    pub checked: usize,
    /// Pairs found consistent
    pub consistent: usize,
    /// Pairs skipped on a missing field
    pub skipped: usize,
    /// Fields found absent from at least one record
    #[serde(skip_serializing_if = "BTreeSet::is_empty", default)]
    pub missing_fields: BTreeSet<String>,
}

impl ViolationReport {
    /// Creates an empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a consistent pair.
    pub fn record_consistent(&mut self) {
        self.total_pairs += 1;
        self.checked += 1;
        self.consistent += 1;
    }

    /// Records an inconsistent pair.
    pub fn record_violation(&mut self, violation: Violation) {
        self.total_pairs += 1;
        self.checked += 1;
        self.violations.push(violation);
    }

    /// Records a skipped pair.
    ///
    /// Returns true the first time `field` is reported missing in this report.
    pub fn record_skipped(&mut self, field: &str) -> bool {
        self.total_pairs += 1;
        self.skipped += 1;
        self.missing_fields.insert(field.to_string())
    }

    /// Appends a partial report produced for later records.
    pub fn merge(&mut self, other: ViolationReport) {
        self.violations.extend(other.violations);
        self.total_pairs += other.total_pairs;
        self.checked += other.checked;
        self.consistent += other.consistent;
        self.skipped += other.skipped;
        self.missing_fields.extend(other.missing_fields);
    }

    /// Number of inconsistent pairs.
    pub fn violation_count(&self) -> usize {
        self.violations.len()
    }

    /// Returns true if no inconsistency was found.
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }

    /// The quality score of this report.
    pub fn quality_score(&self) -> QualityScore {
        QualityScore::from_counts(self.consistent, self.checked)
    }

    /// Violations of one governed field.
    pub fn violations_for_field<'a>(
        &'a self,
        governed_field: &'a str,
    ) -> impl Iterator<Item = &'a Violation> + 'a {
        self.violations
            .iter()
            .filter(move |v| v.governed_field == governed_field)
    }
}
