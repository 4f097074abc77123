//! Compilation of REDCap branching logic into evaluable rules.
//!
//! REDCap stores each field's conditional-display rule as text, for example
//! `[has_symptom] = '1' and [onset_days] = '2'`. This module turns that text
//! into a typed [`CompiledRule`]: a chain of [`Condition`]s joined by
//! [`Connector`]s, evaluated strictly left to right.
//!
//! ```text
//! "[a] = '1' and [b] = '2' or [c] = '3'"
//!          │
//!          ▼  LogicCompiler::compile
//! Condition(a = 1) ─ And ─ Condition(b = 2) ─ Or ─ Condition(c = 3)
//! ```
//!
//! Two behaviors of the audit scripts this crate replaces are kept on
//! purpose and can be switched through [`CompilerOptions`]:
//!
//! - `legacy_literal_truncation`: comparison values are read through a fixed
//!   one-character window.
//! - the connector tie-break in [`Connector::infer`].

mod clause;
mod compiler;
mod rule_set;

pub use clause::{Clause, CompiledRule, Condition, Connector};
pub use compiler::{CompilerOptions, LogicCompiler};
pub use rule_set::{RejectedLogic, RuleSet};
