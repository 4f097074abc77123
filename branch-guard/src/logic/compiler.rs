//! Branching-logic compiler.

use super::{CompiledRule, Condition, Connector, RejectedLogic, RuleSet};
use crate::core::FieldMetadata;
use crate::prelude::*;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

/// REDCap variable names, optionally followed by a checkbox code.
static FIELD_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9_]+(\([A-Za-z0-9_\-]+\))?$").expect("field name pattern is valid")
});

/// Options controlling how branching logic is compiled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerOptions {
    /// Reject malformed logic instead of keeping the conditions parsed so far
    pub strict: bool,
    /// Read comparison values through the legacy fixed-width window
    ///
    /// When set, only the first character after the opening quote is kept as
    /// the value and the cursor skips one more character, so `'12'` compiles
    /// to `'1'`.
    pub legacy_literal_truncation: bool,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self::legacy()
    }
}

impl CompilerOptions {
    /// Options reproducing the legacy audit scores.
    pub fn legacy() -> Self {
        Self {
            strict: false,
            legacy_literal_truncation: true,
        }
    }

    /// Options with full-width literals and strict grammar checking.
    pub fn corrected() -> Self {
        Self {
            strict: true,
            legacy_literal_truncation: false,
        }
    }

    /// Sets strict mode.
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Sets legacy literal truncation.
    pub fn with_legacy_literal_truncation(mut self, enabled: bool) -> Self {
        self.legacy_literal_truncation = enabled;
        self
    }
}

/// Compiles REDCap branching-logic strings into [`CompiledRule`]s.
///
/// The grammar is the flat shape REDCap writes for simple visibility rules:
/// `[field1] = 'v1' and [field2] = 'v2' or ...`. There is no grouping and no
/// precedence. Operators other than equality are read as equality.
///
/// # Examples
///
/// ```rust
/// use branch_guard::logic::{CompilerOptions, LogicCompiler};
///
/// let compiler = LogicCompiler::new(CompilerOptions::corrected());
/// let rule = compiler
///     .compile("symptom_detail", "[has_symptom] = '1' and [onset] = '2'")
///     .unwrap()
///     .unwrap();
/// assert_eq!(rule.condition_count(), 2);
///
/// assert!(compiler.compile("age", "").unwrap().is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct LogicCompiler {
    options: CompilerOptions,
}

impl LogicCompiler {
    /// Creates a compiler with the given options.
    pub fn new(options: CompilerOptions) -> Self {
        Self { options }
    }

    /// Returns the options of this compiler.
    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    /// Compiles one field's branching logic.
    ///
    /// Returns `Ok(None)` when the field has no logic. In strict mode any
    /// grammar error is returned. Otherwise a broken tail is dropped with a
    /// warning, and an error is returned only when not even the first
    /// condition could be read.
    pub fn compile(&self, field_name: &str, logic: &str) -> Result<Option<CompiledRule>> {
        if logic.trim().is_empty() {
            return Ok(None);
        }

        let (first, mut pos) = self.parse_condition(field_name, logic, 0)?;
        let mut rule = CompiledRule::new(field_name, first);

        while let Some(offset) = logic[pos..].find('[') {
            let connector = Connector::infer(&logic[pos..pos + offset]);
            match self.parse_condition(field_name, logic, pos + offset) {
                Ok((condition, end)) => {
                    rule.push(connector, condition);
                    pos = end;
                }
                Err(e) if !self.options.strict => {
                    warn!(
                        field = %field_name,
                        kept_conditions = rule.condition_count(),
                        error = %e,
                        "Dropping unreadable tail of branching logic"
                    );
                    break;
                }
                Err(e) => return Err(e),
            }
        }

        Ok(Some(rule))
    }

    /// Compiles every field of a metadata feed.
    ///
    /// A field whose logic cannot be compiled is recorded in
    /// [`RuleSet::rejected`]; the remaining fields are still compiled.
    #[instrument(skip_all, fields(strict = self.options.strict))]
    pub fn compile_rules<'a, I>(&self, metadata: I) -> RuleSet
    where
        I: IntoIterator<Item = &'a FieldMetadata>,
    {
        let mut rule_set = RuleSet::default();
        for field in metadata {
            match self.compile(&field.field_name, &field.branching_logic) {
                Ok(Some(rule)) => {
                    debug!(field = %field.field_name, rule = %rule, "Compiled branching logic");
                    rule_set.push_rule(rule);
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(field = %field.field_name, error = %e, "Rejected branching logic");
                    rule_set.push_rejected(RejectedLogic {
                        field_name: field.field_name.clone(),
                        branching_logic: field.branching_logic.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }
        info!(
            rules = rule_set.len(),
            rejected = rule_set.rejected().len(),
            "Compiled branching logic rules"
        );
        rule_set
    }

    /// Reads one `[field] ... 'value'` condition starting at byte `start`.
    ///
    /// Returns the condition and the byte offset just past it.
    fn parse_condition(
        &self,
        field_name: &str,
        logic: &str,
        start: usize,
    ) -> Result<(Condition, usize)> {
        let open = logic[start..].find('[').ok_or_else(|| {
            GuardError::malformed(field_name, start, "expected '[' opening a field reference")
        })?;
        let name_start = start + open + 1;

        let close = logic[name_start..].find(']').ok_or_else(|| {
            GuardError::malformed(field_name, name_start, "unterminated field reference, expected ']'")
        })?;
        let referenced = &logic[name_start..name_start + close];
        if self.options.strict && !FIELD_NAME.is_match(referenced) {
            return Err(GuardError::malformed(
                field_name,
                name_start,
                format!("invalid field reference '{referenced}'"),
            ));
        }
        let after_name = name_start + close + 1;

        let quote = logic[after_name..].find('\'').ok_or_else(|| {
            GuardError::malformed(field_name, after_name, "expected a quoted comparison value")
        })?;
        let value_start = after_name + quote + 1;

        let (value, end) = if self.options.legacy_literal_truncation {
            let mut chars = logic[value_start..].char_indices();
            let (_, value) = chars.next().ok_or_else(|| {
                GuardError::malformed(field_name, value_start, "missing comparison value after quote")
            })?;
            let end = match chars.next() {
                Some((offset, skipped)) => value_start + offset + skipped.len_utf8(),
                None => logic.len(),
            };
            (value.to_string(), end)
        } else {
            let len = logic[value_start..].find('\'').ok_or_else(|| {
                GuardError::malformed(
                    field_name,
                    value_start,
                    "unterminated comparison value, expected closing quote",
                )
            })?;
            (
                logic[value_start..value_start + len].to_string(),
                value_start + len + 1,
            )
        };

        Ok((Condition::new(referenced, value), end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn legacy() -> LogicCompiler {
        LogicCompiler::new(CompilerOptions::legacy())
    }

    fn corrected() -> LogicCompiler {
        LogicCompiler::new(CompilerOptions::corrected())
    }

    #[test]
    fn test_empty_logic_yields_no_rule() {
        assert!(legacy().compile("f", "").unwrap().is_none());
        assert!(corrected().compile("f", "   ").unwrap().is_none());
    }

    #[test]
    fn test_single_condition() {
        let rule = legacy().compile("symptom_detail", "[has_symptom] = '1'").unwrap().unwrap();
        assert_eq!(rule.governed_field(), "symptom_detail");
        assert_eq!(rule.condition_count(), 1);
        assert_eq!(rule.first_condition(), &Condition::new("has_symptom", "1"));
    }

    #[test]
    fn test_chain_with_connectors() {
        let rule = corrected()
            .compile("g", "[a] = '1' and [b] = '2' or [c] = '3'")
            .unwrap()
            .unwrap();
        assert_eq!(rule.condition_count(), 3);
        assert_eq!(
            rule.connectors().collect::<Vec<_>>(),
            vec![Connector::And, Connector::Or]
        );
        assert_eq!(rule.to_string(), "[a] = '1' and [b] = '2' or [c] = '3'");
    }

    #[test]
    fn test_legacy_truncates_long_literals() {
        let rule = legacy().compile("g", "[dengue_type] = '12'").unwrap().unwrap();
        assert_eq!(rule.first_condition().expected_value, "1");

        let rule = corrected().compile("g", "[dengue_type] = '12'").unwrap().unwrap();
        assert_eq!(rule.first_condition().expected_value, "12");
    }

    #[test]
    fn test_legacy_truncation_hides_or_after_long_literal() {
        // the fixed window ends inside the literal, so the text after it
        // starts with a quote and the connector falls back to AND
        let rule = legacy()
            .compile("g", "[a] = '12' or [b] = '1'")
            .unwrap()
            .unwrap();
        assert_eq!(rule.connectors().collect::<Vec<_>>(), vec![Connector::And]);

        let rule = corrected()
            .compile("g", "[a] = '12' or [b] = '1'")
            .unwrap()
            .unwrap();
        assert_eq!(rule.connectors().collect::<Vec<_>>(), vec![Connector::Or]);
    }

    #[test]
    fn test_operator_text_is_not_interpreted() {
        let rule = corrected().compile("g", "[a] <> '1'").unwrap().unwrap();
        assert_eq!(rule.first_condition(), &Condition::new("a", "1"));
    }

    #[test]
    fn test_trailing_text_without_bracket_terminates() {
        let rule = legacy().compile("g", "[a] = '1' ").unwrap().unwrap();
        assert_eq!(rule.condition_count(), 1);
    }

    #[test]
    fn test_strict_rejects_unterminated_reference() {
        let err = corrected().compile("g", "[a = '1'").unwrap_err();
        assert!(matches!(err, GuardError::MalformedLogic { position: 1, .. }));
    }

    #[test]
    fn test_strict_rejects_invalid_field_name() {
        let err = corrected().compile("g", "[a b] = '1'").unwrap_err();
        assert!(matches!(err, GuardError::MalformedLogic { .. }));

        let rule = corrected().compile("g", "[symptoms(2)] = '1'").unwrap().unwrap();
        assert_eq!(rule.trigger_field(), "symptoms(2)");
    }

    #[test]
    fn test_strict_rejects_broken_tail() {
        let err = corrected()
            .compile("g", "[a] = '1' and [b] = 2")
            .unwrap_err();
        assert!(matches!(err, GuardError::MalformedLogic { .. }));
    }

    #[test]
    fn test_lenient_keeps_conditions_before_broken_tail() {
        let rule = legacy()
            .compile("g", "[a] = '1' and [b] = '2' or [c")
            .unwrap()
            .unwrap();
        assert_eq!(rule.condition_count(), 2);
        assert_eq!(rule.to_string(), "[a] = '1' and [b] = '2'");
    }

    #[test]
    fn test_lenient_still_fails_without_any_condition() {
        let err = legacy().compile("g", "a = 1").unwrap_err();
        assert!(matches!(err, GuardError::MalformedLogic { .. }));

        let err = legacy().compile("g", "[a] = '").unwrap_err();
        assert!(matches!(err, GuardError::MalformedLogic { .. }));
    }

    #[test]
    fn test_legacy_reads_characters_not_bytes() {
        let rule = legacy().compile("g", "[cidade] = 'é' and [b] = '1'").unwrap().unwrap();
        assert_eq!(rule.first_condition().expected_value, "é");
        assert_eq!(rule.condition_count(), 2);
    }

    #[test]
    fn test_compile_rules_collects_rejections() {
        let metadata = vec![
            FieldMetadata::new("record_id", ""),
            FieldMetadata::new("symptom_detail", "[has_symptom] = '1'"),
            FieldMetadata::new("broken", "[oops = '1'"),
        ];
        let rules = corrected().compile_rules(&metadata);
        assert_eq!(rules.len(), 1);
        assert_eq!(rules.rejected().len(), 1);
        assert_eq!(rules.rejected()[0].field_name, "broken");
    }
}
