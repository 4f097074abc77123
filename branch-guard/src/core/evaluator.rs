//! Flat boolean-chain evaluation of compiled rules.

use super::Record;
use crate::logic::CompiledRule;
use crate::prelude::*;

/// Evaluates `rule` against `record`.
///
/// Every referenced field is looked up before anything is combined, so a rule
/// that references an absent field always fails with `MissingField`, whatever
/// the values of the other conditions. The condition results are then folded
/// strictly left to right: `a or b and c` means `(a or b) and c`.
///
/// ```rust
/// use branch_guard::core::{evaluate, Record};
/// use branch_guard::logic::{CompiledRule, Condition, Connector};
///
/// let rule = CompiledRule::new("detail", Condition::new("a", "1"))
///     .with(Connector::Or, Condition::new("b", "1"))
///     .with(Connector::And, Condition::new("c", "1"));
///
/// let record = Record::from([("a", "1"), ("b", "0"), ("c", "0")]);
/// assert!(!evaluate(&rule, &record).unwrap());
/// ```
pub fn evaluate(rule: &CompiledRule, record: &Record) -> Result<bool> {
    let truths = rule
        .conditions()
        .map(|condition| {
            record
                .value(&condition.referenced_field)
                .map(|value| condition.holds(value))
        })
        .collect::<Result<Vec<bool>>>()?;

    Ok(truths[1..]
        .iter()
        .zip(rule.connectors())
        .fold(truths[0], |acc, (&truth, connector)| {
            connector.apply(acc, truth)
        }))
}

impl CompiledRule {
    /// Evaluates this rule against a record. See [`evaluate`].
    pub fn evaluate(&self, record: &Record) -> Result<bool> {
        evaluate(self, record)
    }
}
