//! Consistency policies.
//!
//! A policy decides, for one record and one rule, whether the governed field's
//! population agrees with the rule. Two policies exist, matching the two
//! audit modes REDCap projects have been scored with.

use super::{evaluate, Record, ViolationKind};
use crate::logic::CompiledRule;
use crate::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Outcome of assessing one (record, rule) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assessment {
    /// The governed field agrees with the rule
    Consistent,
    /// The governed field disagrees with the rule
    Inconsistent(ViolationKind),
}

impl Assessment {
    /// Returns true for [`Assessment::Consistent`].
    pub fn is_consistent(&self) -> bool {
        matches!(self, Assessment::Consistent)
    }
}

/// Decides whether a governed field is consistent with its rule.
///
/// Implementations must be pure: the same pair always yields the same
/// assessment. A field absent from the record is reported as
/// [`GuardError::MissingField`] so the checker can skip the pair.
pub trait ConsistencyPolicy: fmt::Debug + Send + Sync {
    /// Short name of the policy.
    fn name(&self) -> &'static str;

    /// Assesses one (record, rule) pair.
    fn assess(&self, rule: &CompiledRule, record: &Record) -> Result<Assessment>;
}

/// Single-condition, one-directional policy.
///
/// Only the rule's first condition is read. The pair is inconsistent when that
/// condition holds and the governed field is empty. A populated field whose
/// condition does not hold is accepted.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimplePolicy;

impl ConsistencyPolicy for SimplePolicy {
    fn name(&self) -> &'static str {
        "simple"
    }

    fn assess(&self, rule: &CompiledRule, record: &Record) -> Result<Assessment> {
        let populated = record.is_populated(rule.governed_field())?;
        let condition = rule.first_condition();
        let holds = condition.holds(record.value(&condition.referenced_field)?);

        if holds && !populated {
            Ok(Assessment::Inconsistent(ViolationKind::MissingValue))
        } else {
            Ok(Assessment::Consistent)
        }
    }
}

/// Full-chain, bidirectional policy.
///
/// The governed field must be populated exactly when the whole rule holds.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnhancedPolicy;

impl ConsistencyPolicy for EnhancedPolicy {
    fn name(&self) -> &'static str {
        "enhanced"
    }

    fn assess(&self, rule: &CompiledRule, record: &Record) -> Result<Assessment> {
        let populated = record.is_populated(rule.governed_field())?;
        let shown = evaluate(rule, record)?;

        Ok(match (shown, populated) {
            (true, false) => Assessment::Inconsistent(ViolationKind::MissingValue),
            (false, true) => Assessment::Inconsistent(ViolationKind::UnexpectedValue),
            _ => Assessment::Consistent,
        })
    }
}

/// Selects a [`ConsistencyPolicy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyKind {
    /// See [`SimplePolicy`]
    Simple,
    /// See [`EnhancedPolicy`]
    #[default]
    Enhanced,
}

impl PolicyKind {
    /// Returns the policy implementation.
    pub fn policy(&self) -> &'static dyn ConsistencyPolicy {
        match self {
            PolicyKind::Simple => &SimplePolicy,
            PolicyKind::Enhanced => &EnhancedPolicy,
        }
    }

    /// Returns the policy name.
    pub fn as_str(&self) -> &'static str {
        self.policy().name()
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PolicyKind {
    type Err = GuardError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "simple" => Ok(PolicyKind::Simple),
            "enhanced" => Ok(PolicyKind::Enhanced),
            other => Err(GuardError::Configuration(format!(
                "unknown policy '{other}', expected 'simple' or 'enhanced'"
            ))),
        }
    }
}
