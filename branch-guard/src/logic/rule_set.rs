//! The compiled rules of one run.

use super::CompiledRule;
use serde::{Deserialize, Serialize};

/// A field whose branching logic could not be compiled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedLogic {
    /// The governed field
    pub field_name: String,
    /// The raw logic string as found in the metadata
    pub branching_logic: String,
    /// The compiler error
    pub reason: String,
}

/// The rules compiled from a metadata feed, in metadata order.
///
/// A rule set is built once per run by
/// [`LogicCompiler::compile_rules`](super::LogicCompiler::compile_rules) and
/// then shared read-only by the checker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSet {
    rules: Vec<CompiledRule>,
    rejected: Vec<RejectedLogic>,
}

impl RuleSet {
    /// Creates a rule set from already compiled rules.
    pub fn from_rules(rules: Vec<CompiledRule>) -> Self {
        Self {
            rules,
            rejected: Vec::new(),
        }
    }

    pub(crate) fn push_rule(&mut self, rule: CompiledRule) {
        self.rules.push(rule);
    }

    pub(crate) fn push_rejected(&mut self, rejected: RejectedLogic) {
        self.rejected.push(rejected);
    }

    /// The compiled rules.
    pub fn rules(&self) -> &[CompiledRule] {
        &self.rules
    }

    /// Fields whose logic was rejected by the compiler.
    pub fn rejected(&self) -> &[RejectedLogic] {
        &self.rejected
    }

    /// Number of compiled rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns true if no rule was compiled.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Iterates the compiled rules.
    pub fn iter(&self) -> std::slice::Iter<'_, CompiledRule> {
        self.rules.iter()
    }
}

impl<'a> IntoIterator for &'a RuleSet {
    type Item = &'a CompiledRule;
    type IntoIter = std::slice::Iter<'a, CompiledRule>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.iter()
    }
}

impl FromIterator<CompiledRule> for RuleSet {
    fn from_iter<T: IntoIterator<Item = CompiledRule>>(iter: T) -> Self {
        Self::from_rules(iter.into_iter().collect())
    }
}
