//! # branch-guard - branching-logic consistency audits for REDCap data
//!
//! REDCap instruments show or hide fields through per-field *branching
//! logic* such as `[has_symptom] = '1'`. When data is entered, imported or
//! migrated outside the survey UI, records drift away from those rules: a
//! hidden field ends up filled, or a field that should have been shown is
//! empty. branch-guard rebuilds the rules from the project metadata, checks
//! every exported record against them and scores the result.
//!
//! ## Quick Start
//!
//! ```rust
//! use branch_guard::prelude::*;
//! use branch_guard::core::{QualityPipeline, QualityResult};
//! use branch_guard::sources::MemorySource;
//! use std::sync::Arc;
//!
//! # async fn example() -> branch_guard::error::Result<()> {
//! let source = Arc::new(MemorySource::new(
//!     vec![
//!         FieldMetadata::new("record_id", ""),
//!         FieldMetadata::new("symptom_detail", "[has_symptom] = '1'"),
//!     ],
//!     RecordSet::from_records(vec![
//!         Record::from([("record_id", "1"), ("has_symptom", "1"), ("symptom_detail", "")]),
//!         Record::from([("record_id", "2"), ("has_symptom", "0"), ("symptom_detail", "")]),
//!     ]),
//! ));
//!
//! let result = QualityPipeline::builder("intake_audit")
//!     .metadata(source.clone())
//!     .records(source)
//!     .min_quality(95.0)
//!     .build()?
//!     .run()
//!     .await?;
//!
//! match &result {
//!     QualityResult::Passed { report } => println!("quality {}", report.score),
//!     QualityResult::Failed { report } => {
//!         for violation in &report.report.violations {
//!             println!("row {}: {}", violation.record_index, violation.governed_field);
//!         }
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Policies
//!
//! - **enhanced** (default): a field must be filled exactly when its whole
//!   rule holds. Both missing and unexpected values are reported.
//! - **simple**: only the rule's first condition is read and only missing
//!   values are reported.
//!
//! ## Legacy compatibility
//!
//! Scores are meant to stay comparable with the audit scripts projects have
//! used so far. [`logic::CompilerOptions::legacy`] (the default) keeps their
//! one-character comparison values and lenient parsing;
//! [`core::PipelineConfig::corrected`] reads full values and rejects
//! malformed logic.
//!
//! ## Architecture
//!
//! - **`logic`**: branching-logic compiler and the typed rule model
//! - **`core`**: records, evaluation, policies, checker and pipeline
//! - **`sources`**: metadata and record feeds (memory, JSON, CSV, DataFusion,
//!   REDCap API behind the `redcap` feature)
//! - **`formatters`**: JSON, human and Markdown output
//! - **`logging`**: logging configuration and subscriber setup

pub mod core;
pub mod error;
pub mod formatters;
pub mod logging;
pub mod logic;
pub mod prelude;
pub mod sources;
