//! Typed clauses of a compiled branching-logic rule.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Boolean connector between two conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Connector {
    /// Both sides must hold
    And,
    /// Either side must hold
    Or,
}

impl Connector {
    /// Derives the connector from the text separating two conditions.
    ///
    /// REDCap exports write `and`/`or` between conditions, but the audit tool
    /// this crate replaces never tokenized them. It dropped a single leading
    /// space and looked at the next character: `o` meant OR and anything else
    /// meant AND. Quality scores computed over years depend on that tie-break,
    /// so it is kept here and only here.
    ///
    /// ```rust
    /// use branch_guard::logic::Connector;
    ///
    /// assert_eq!(Connector::infer(" or "), Connector::Or);
    /// assert_eq!(Connector::infer(" and "), Connector::And);
    /// assert_eq!(Connector::infer(" xor "), Connector::And);
    /// // two spaces: the second one is seen, not the `o`
    /// assert_eq!(Connector::infer("  or "), Connector::And);
    /// ```
    pub fn infer(between: &str) -> Self {
        let text = between.strip_prefix(' ').unwrap_or(between);
        if text.starts_with('o') {
            Connector::Or
        } else {
            Connector::And
        }
    }

    /// Combines the running value of a chain with the next condition.
    pub fn apply(self, lhs: bool, rhs: bool) -> bool {
        match self {
            Connector::And => lhs && rhs,
            Connector::Or => lhs || rhs,
        }
    }

    /// Returns the grammar keyword for this connector.
    pub fn as_str(&self) -> &'static str {
        match self {
            Connector::And => "and",
            Connector::Or => "or",
        }
    }
}

impl fmt::Display for Connector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An atomic equality test against another field of the same record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Condition {
    /// The field whose value is compared
    pub referenced_field: String,
    /// The literal the value must equal
    pub expected_value: String,
}

impl Condition {
    /// Creates a new condition.
    pub fn new(referenced_field: impl Into<String>, expected_value: impl Into<String>) -> Self {
        Self {
            referenced_field: referenced_field.into(),
            expected_value: expected_value.into(),
        }
    }

    /// Returns true if `value` satisfies this condition.
    pub fn holds(&self, value: &str) -> bool {
        value == self.expected_value
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] = '{}'", self.referenced_field, self.expected_value)
    }
}

/// One entry of a rule's clause sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Clause<'a> {
    /// A comparison
    Condition(&'a Condition),
    /// A connector between the previous and the next comparison
    Connector(Connector),
}

/// A branching-logic rule compiled into a flat chain of conditions.
///
/// The rule stores its first condition separately from the `(connector,
/// condition)` links that follow, so a rule with N conditions always has
/// exactly N-1 connectors and the chain can never start or end on a connector.
///
/// ```rust
/// use branch_guard::logic::{CompiledRule, Condition, Connector};
///
/// let rule = CompiledRule::new("symptom_detail", Condition::new("has_symptom", "1"))
///     .with(Connector::Or, Condition::new("fever", "1"));
///
/// assert_eq!(rule.condition_count(), 2);
/// assert_eq!(rule.to_string(), "[has_symptom] = '1' or [fever] = '1'");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledRule {
    governed_field: String,
    first: Condition,
    rest: Vec<(Connector, Condition)>,
}

impl CompiledRule {
    /// Creates a single-condition rule for `governed_field`.
    pub fn new(governed_field: impl Into<String>, first: Condition) -> Self {
        Self {
            governed_field: governed_field.into(),
            first,
            rest: Vec::new(),
        }
    }

    /// Appends a condition to the chain.
    pub fn with(mut self, connector: Connector, condition: Condition) -> Self {
        self.push(connector, condition);
        self
    }

    pub(crate) fn push(&mut self, connector: Connector, condition: Condition) {
        self.rest.push((connector, condition));
    }

    /// The field whose population this rule gates.
    pub fn governed_field(&self) -> &str {
        &self.governed_field
    }

    /// The first condition of the chain.
    pub fn first_condition(&self) -> &Condition {
        &self.first
    }

    /// The first referenced field, reported alongside violations.
    pub fn trigger_field(&self) -> &str {
        &self.first.referenced_field
    }

    /// The `(connector, condition)` links after the first condition.
    pub fn links(&self) -> &[(Connector, Condition)] {
        &self.rest
    }

    /// Iterates conditions in evaluation order.
    pub fn conditions(&self) -> impl Iterator<Item = &Condition> + '_ {
        std::iter::once(&self.first).chain(self.rest.iter().map(|(_, c)| c))
    }

    /// Iterates connectors in evaluation order.
    pub fn connectors(&self) -> impl Iterator<Item = Connector> + '_ {
        self.rest.iter().map(|(c, _)| *c)
    }

    /// Iterates the alternating Condition/Connector sequence.
    pub fn clauses(&self) -> impl Iterator<Item = Clause<'_>> + '_ {
        std::iter::once(Clause::Condition(&self.first)).chain(
            self.rest
                .iter()
                .flat_map(|(conn, cond)| [Clause::Connector(*conn), Clause::Condition(cond)]),
        )
    }

    /// Iterates the referenced field names, duplicates included.
    pub fn referenced_fields(&self) -> impl Iterator<Item = &str> + '_ {
        self.conditions().map(|c| c.referenced_field.as_str())
    }

    /// Number of conditions in the chain.
    pub fn condition_count(&self) -> usize {
        self.rest.len() + 1
    }
}

impl fmt::Display for CompiledRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.first)?;
        for (connector, condition) in &self.rest {
            write!(f, " {connector} {condition}")?;
        }
        Ok(())
    }
}
