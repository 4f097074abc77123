//! Property-based tests for the branching-logic compiler and the checker.
//!
//! ## Test Categories
//!
//! ### 1. Rendering
//! - A compiled rule rendered back to text compiles to the same rule, with
//!   full-width literals and with the legacy one-character window
//!
//! ### 2. Counters
//! - Every (record, rule) pair is either checked or skipped, and every
//!   checked pair is either consistent or a violation
//! - The simple policy never reports unexpected values
//!
//! ### 3. Partitioning
//! - Splitting the records into chunks never changes the report

use branch_guard::core::{
    CheckerConfig, ConsistencyChecker, PolicyKind, Record, RecordSet, ViolationKind,
    ViolationReport,
};
use branch_guard::logic::{CompiledRule, CompilerOptions, Condition, Connector, LogicCompiler, RuleSet};
use proptest::prelude::*;
use std::sync::Arc;

const FIELDS: &[&str] = &["a", "b", "c", "d"];

fn field_name() -> impl Strategy<Value = String> {
    "[A-Za-z_][A-Za-z0-9_]{0,15}"
}

fn connector() -> impl Strategy<Value = Connector> {
    prop_oneof![Just(Connector::And), Just(Connector::Or)]
}

fn rule_with_values(
    value: impl Strategy<Value = String> + Clone,
) -> impl Strategy<Value = CompiledRule> {
    (
        field_name(),
        (field_name(), value.clone()),
        prop::collection::vec((connector(), field_name(), value), 0..6),
    )
        .prop_map(|(governed, (field, expected), rest)| {
            rest.into_iter().fold(
                CompiledRule::new(governed, Condition::new(field, expected)),
                |rule, (connector, field, expected)| {
                    rule.with(connector, Condition::new(field, expected))
                },
            )
        })
}

fn cell() -> impl Strategy<Value = Option<&'static str>> {
    prop_oneof![
        1 => Just(None),
        3 => Just(Some("")),
        3 => Just(Some("0")),
        3 => Just(Some("1")),
    ]
}

/// Records over [`FIELDS`] where any field may be absent from the export.
fn records() -> impl Strategy<Value = RecordSet> {
    prop::collection::vec(prop::collection::vec(cell(), FIELDS.len()), 0..40).prop_map(|rows| {
        rows.into_iter()
            .map(|cells| {
                let mut record = Record::new();
                for (field, value) in FIELDS.iter().zip(cells) {
                    if let Some(value) = value {
                        record.insert(*field, value);
                    }
                }
                record
            })
            .collect()
    })
}

fn rules() -> RuleSet {
    RuleSet::from_rules(vec![
        CompiledRule::new("b", Condition::new("a", "1")),
        CompiledRule::new("c", Condition::new("a", "1")).with(Connector::Or, Condition::new("b", "0")),
        CompiledRule::new("d", Condition::new("c", "1"))
            .with(Connector::And, Condition::new("a", "0"))
            .with(Connector::Or, Condition::new("b", "1")),
    ])
}

fn check(policy: PolicyKind, records: &RecordSet) -> ViolationReport {
    ConsistencyChecker::new(CheckerConfig::default().with_policy(policy)).check_all(&rules(), records)
}

proptest! {
    #[test]
    fn prop_rendered_rule_recompiles(rule in rule_with_values("[A-Za-z0-9 ]{0,8}")) {
        let compiler = LogicCompiler::new(CompilerOptions::corrected());
        let text = rule.to_string();
        let recompiled = compiler.compile(rule.governed_field(), &text).unwrap().unwrap();

        prop_assert_eq!(recompiled.condition_count(), rule.condition_count());
        prop_assert_eq!(
            recompiled.connectors().collect::<Vec<_>>(),
            rule.connectors().collect::<Vec<_>>()
        );
        prop_assert_eq!(recompiled, rule);
    }

    #[test]
    fn prop_legacy_window_reads_single_characters(rule in rule_with_values("[A-Za-z0-9]")) {
        let compiler = LogicCompiler::new(CompilerOptions::legacy());
        let recompiled = compiler.compile(rule.governed_field(), &rule.to_string()).unwrap().unwrap();
        prop_assert_eq!(recompiled, rule);
    }

    #[test]
    fn prop_counters_balance(records in records(), simple in any::<bool>()) {
        let policy = if simple { PolicyKind::Simple } else { PolicyKind::Enhanced };
        let report = check(policy, &records);

        prop_assert_eq!(report.total_pairs, records.len() * 3);
        prop_assert_eq!(report.checked + report.skipped, report.total_pairs);
        prop_assert_eq!(report.consistent + report.violation_count(), report.checked);

        match report.quality_score().value() {
            Some(score) => prop_assert!((0.0..=100.0).contains(&score)),
            None => prop_assert_eq!(report.checked, 0),
        }
    }

    #[test]
    fn prop_simple_policy_only_reports_missing_values(records in records()) {
        let report = check(PolicyKind::Simple, &records);
        prop_assert!(report
            .violations
            .iter()
            .all(|v| v.kind == ViolationKind::MissingValue));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_partitioning_preserves_report(records in records(), partitions in 1usize..9) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let sequential = check(PolicyKind::Enhanced, &records);

        let checker = ConsistencyChecker::new(CheckerConfig::default().with_partitions(partitions));
        let partitioned = runtime
            .block_on(checker.check_all_partitioned(Arc::new(rules()), Arc::new(records)))
            .unwrap();

        prop_assert_eq!(partitioned, sequential);
    }
}
