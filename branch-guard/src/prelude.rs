//! Prelude for commonly used types and traits in branch-guard.

pub use crate::core::{FieldMetadata, PolicyKind, QualityScore, Record, RecordSet};
pub use crate::error::{ErrorContext, GuardError, Result};
pub use crate::formatters::{FormatterConfig, ResultFormatter};
pub use crate::logging::LogConfig;
pub use crate::logic::{CompiledRule, LogicCompiler, RuleSet};
