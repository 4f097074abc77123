//! Core types of the branching-logic consistency audit.
//!
//! ## Overview
//!
//! - **[`FieldMetadata`]**: a field and its raw branching logic, as exported
//! - **[`Record`]** / **[`RecordSet`]**: the exported survey data
//! - **[`evaluate`]**: flat boolean-chain evaluation of a compiled rule
//! - **[`ConsistencyPolicy`]**: decides whether a governed field agrees with
//!   its rule ([`SimplePolicy`], [`EnhancedPolicy`])
//! - **[`ConsistencyChecker`]**: visits every record x rule pair and builds a
//!   [`ViolationReport`] and a [`QualityScore`]
//! - **[`QualityPipeline`]**: wires sources, compiler and checker into one run
//!
//! ## Data flow
//!
//! ```text
//! MetadataSource ──> LogicCompiler ──> RuleSet ─┐
//!                                               ├─> ConsistencyChecker ──> ViolationReport
//! RecordSource ─────────────────────> RecordSet ┘                          + QualityScore
//! ```
//!
//! ## Example
//!
//! ```rust
//! use branch_guard::core::{run_quality_check, FieldMetadata, PolicyKind, Record, RecordSet};
//! use branch_guard::logic::LogicCompiler;
//!
//! let metadata = vec![
//!     FieldMetadata::new("record_id", ""),
//!     FieldMetadata::new("symptom_detail", "[has_symptom] = '1'"),
//! ];
//! let rules = LogicCompiler::default().compile_rules(&metadata);
//!
//! let records = RecordSet::from_records(vec![
//!     Record::from([("has_symptom", "1"), ("symptom_detail", "")]),
//!     Record::from([("has_symptom", "0"), ("symptom_detail", "")]),
//!     Record::from([("has_symptom", "1"), ("symptom_detail", "fever")]),
//! ]);
//!
//! let (report, score) = run_quality_check(&rules, &records, PolicyKind::Enhanced);
//! assert_eq!(report.violation_count(), 1);
//! assert_eq!(score.to_string(), "66.67%");
//! ```

mod checker;
mod evaluator;
mod metadata;
mod pipeline;
mod policy;
mod record;
mod report;

pub use checker::{check_all, run_quality_check, CheckerConfig, ConsistencyChecker};
pub use evaluator::evaluate;
pub use metadata::FieldMetadata;
pub use pipeline::{
    PipelineConfig, QualityPipeline, QualityPipelineBuilder, QualityReport, QualityResult,
};
pub use policy::{Assessment, ConsistencyPolicy, EnhancedPolicy, PolicyKind, SimplePolicy};
pub use record::{Record, RecordSet};
pub use report::{QualityScore, Violation, ViolationKind, ViolationReport};
