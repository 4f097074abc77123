//! Rendering of quality run results.
//!
//! Three formatters share the [`ResultFormatter`] trait: JSON for machines,
//! colored text for terminals and Markdown for reports pasted into tickets or
//! wikis.
//!
//! # Examples
//!
//! ```rust
//! use branch_guard::formatters::{HumanFormatter, ResultFormatter};
//! use branch_guard::core::QualityResult;
//!
//! let formatter = HumanFormatter::new();
//! // let result: QualityResult = pipeline.run().await?;
//! // println!("{}", formatter.format(&result)?);
//! ```

use crate::core::{QualityReport, QualityResult, Violation, ViolationKind};
use crate::prelude::*;
use std::fmt::Write;

/// Configuration options for formatting results.
#[derive(Debug, Clone)]
pub struct FormatterConfig {
    /// Include the counter summary
    pub include_summary: bool,
    /// Include individual violations
    pub include_violations: bool,
    /// Include fields whose logic was rejected
    pub include_rejected: bool,
    /// Maximum number of violations to display; `None` shows all
    pub max_violations: Option<usize>,
    /// Whether to use colorized output (human formatter)
    pub use_colors: bool,
    /// Whether to include timestamps in output
    pub include_timestamps: bool,
}

impl Default for FormatterConfig {
    fn default() -> Self {
        Self {
            include_summary: true,
            include_violations: true,
            include_rejected: true,
            max_violations: None,
            use_colors: true,
            include_timestamps: true,
        }
    }
}

impl FormatterConfig {
    /// Creates a minimal configuration showing only the summary.
    pub fn minimal() -> Self {
        Self {
            include_summary: true,
            include_violations: false,
            include_rejected: false,
            max_violations: Some(0),
            use_colors: false,
            include_timestamps: false,
        }
    }

    /// Creates a configuration suitable for CI logs.
    pub fn ci() -> Self {
        Self {
            include_summary: true,
            include_violations: true,
            include_rejected: true,
            max_violations: Some(50),
            use_colors: false,
            include_timestamps: true,
        }
    }

    /// Sets whether to include individual violations.
    pub fn with_violations(mut self, include: bool) -> Self {
        self.include_violations = include;
        self
    }

    /// Sets the maximum number of violations to display.
    pub fn with_max_violations(mut self, max: Option<usize>) -> Self {
        self.max_violations = max;
        self
    }

    /// Sets whether to use colorized output.
    pub fn with_colors(mut self, use_colors: bool) -> Self {
        self.use_colors = use_colors;
        self
    }

    /// Sets whether to include timestamps.
    pub fn with_timestamps(mut self, include: bool) -> Self {
        self.include_timestamps = include;
        self
    }

    fn shown<'a>(&self, violations: &'a [Violation]) -> &'a [Violation] {
        match self.max_violations {
            Some(max) => &violations[..max.min(violations.len())],
            None => violations,
        }
    }
}

/// Formats a [`QualityResult`] into text.
///
/// # Examples
///
/// ```rust
/// use branch_guard::formatters::ResultFormatter;
/// use branch_guard::core::QualityResult;
///
/// struct OneLine;
///
/// impl ResultFormatter for OneLine {
///     fn format(&self, result: &QualityResult) -> branch_guard::prelude::Result<String> {
///         Ok(format!("{} {}", result.report().name, result.report().score))
///     }
/// }
/// ```
pub trait ResultFormatter {
    /// Formats a result with the formatter's own configuration.
    fn format(&self, result: &QualityResult) -> Result<String>;

    /// Formats a result with a custom configuration.
    fn format_with_config(&self, result: &QualityResult, _config: &FormatterConfig) -> Result<String> {
        self.format(result)
    }
}

/// Formats results as JSON.
#[derive(Debug, Clone)]
pub struct JsonFormatter {
    config: FormatterConfig,
    pretty: bool,
}

impl JsonFormatter {
    /// Creates a new JSON formatter with default configuration.
    pub fn new() -> Self {
        Self::with_config(FormatterConfig::default())
    }

    /// Creates a new JSON formatter with the specified configuration.
    pub fn with_config(config: FormatterConfig) -> Self {
        Self {
            config,
            pretty: true,
        }
    }

    /// Sets whether to use pretty-printed JSON.
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }
}

impl Default for JsonFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultFormatter for JsonFormatter {
    fn format(&self, result: &QualityResult) -> Result<String> {
        self.format_with_config(result, &self.config)
    }

    fn format_with_config(&self, result: &QualityResult, config: &FormatterConfig) -> Result<String> {
        let filtered = filter_result(result, config);
        let json = if self.pretty {
            serde_json::to_string_pretty(&filtered)?
        } else {
            serde_json::to_string(&filtered)?
        };
        Ok(json)
    }
}

/// Formats results for terminals.
#[derive(Debug, Clone)]
pub struct HumanFormatter {
    config: FormatterConfig,
}

impl HumanFormatter {
    /// Creates a new human formatter with default configuration.
    pub fn new() -> Self {
        Self::with_config(FormatterConfig::default())
    }

    /// Creates a new human formatter with the specified configuration.
    pub fn with_config(config: FormatterConfig) -> Self {
        Self { config }
    }
}

impl Default for HumanFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultFormatter for HumanFormatter {
    fn format(&self, result: &QualityResult) -> Result<String> {
        self.format_with_config(result, &self.config)
    }

    fn format_with_config(&self, result: &QualityResult, config: &FormatterConfig) -> Result<String> {
        let mut output = String::new();
        let run = result.report();
        let report = &run.report;
        let paint = |code: &str, text: &str| {
            if config.use_colors {
                format!("\x1b[{code}m{text}\x1b[0m")
            } else {
                text.to_string()
            }
        };

        writeln!(output)?;
        if result.is_passed() {
            writeln!(output, "✅ {}", paint("32", "Quality check PASSED"))?;
        } else {
            writeln!(output, "❌ {}", paint("31", "Quality check FAILED"))?;
        }
        writeln!(output)?;
        writeln!(output, "Run: {}", run.name)?;
        writeln!(output, "Policy: {}", run.policy)?;
        if config.include_timestamps {
            writeln!(output, "Timestamp: {}", run.timestamp)?;
        }

        writeln!(output)?;
        if report.is_clean() {
            writeln!(output, "There are no inconsistent rows.")?;
        } else {
            writeln!(
                output,
                "There are {} inconsistent rows.",
                report.violation_count()
            )?;
        }
        write!(output, "Quality: {}", run.score)?;
        match run.min_quality {
            Some(min) => writeln!(output, " (minimum {min:.2}%)")?,
            None => writeln!(output)?,
        }

        if config.include_summary {
            writeln!(output)?;
            writeln!(output, "📊 Summary:")?;
            writeln!(output, "   Rules: {}", run.rules)?;
            writeln!(output, "   Records: {}", run.records)?;
            writeln!(output, "   Pairs checked: {}", report.checked)?;
            writeln!(
                output,
                "   ✅ Consistent: {}",
                paint("32", &report.consistent.to_string())
            )?;
            writeln!(
                output,
                "   ❌ Inconsistent: {}",
                paint("31", &report.violation_count().to_string())
            )?;
            writeln!(
                output,
                "   ⏭️  Skipped: {}",
                paint("33", &report.skipped.to_string())
            )?;
            if !report.missing_fields.is_empty() {
                let fields: Vec<&str> = report.missing_fields.iter().map(String::as_str).collect();
                writeln!(output, "   Missing fields: {}", fields.join(", "))?;
            }
            writeln!(output, "   Execution Time: {}ms", run.execution_time_ms)?;
        }

        if config.include_rejected && !run.rejected_rules.is_empty() {
            writeln!(output)?;
            writeln!(output, "⚠️  Rejected branching logic:")?;
            for rejected in &run.rejected_rules {
                writeln!(output, "   {}: {}", rejected.field_name, rejected.reason)?;
            }
        }

        if config.include_violations && !report.is_clean() {
            let shown = config.shown(&report.violations);
            if !shown.is_empty() {
                writeln!(output)?;
                writeln!(output, "🔍 Inconsistent rows:")?;
            }
            for violation in shown {
                writeln!(output)?;
                let symbol = match violation.kind {
                    ViolationKind::MissingValue => paint("31", "∅"),
                    ViolationKind::UnexpectedValue => paint("33", "≠"),
                };
                write!(output, "   {symbol} Row {}", violation.record_index)?;
                if let Some(id) = &violation.record_id {
                    write!(output, " (record {id})")?;
                }
                writeln!(output, ": {}", violation.governed_field)?;
                writeln!(output, "      {}", violation.kind)?;
                writeln!(output, "      Rule: {}", violation.rule)?;
            }

            if report.violation_count() > shown.len() {
                writeln!(output)?;
                writeln!(
                    output,
                    "   ... and {} more rows (use --max-violations to show more)",
                    report.violation_count() - shown.len()
                )?;
            }
        }

        writeln!(output)?;
        Ok(output)
    }
}

/// Formats results as Markdown.
#[derive(Debug, Clone)]
pub struct MarkdownFormatter {
    config: FormatterConfig,
    heading_level: u8,
}

impl MarkdownFormatter {
    /// Creates a new Markdown formatter with default configuration.
    pub fn new() -> Self {
        Self::with_config(FormatterConfig::default())
    }

    /// Creates a new Markdown formatter with the specified configuration.
    pub fn with_config(config: FormatterConfig) -> Self {
        Self {
            config,
            heading_level: 2,
        }
    }

    /// Sets the base heading level for the output.
    pub fn with_heading_level(mut self, level: u8) -> Self {
        self.heading_level = level.clamp(1, 5);
        self
    }
}

impl Default for MarkdownFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultFormatter for MarkdownFormatter {
    fn format(&self, result: &QualityResult) -> Result<String> {
        self.format_with_config(result, &self.config)
    }

    fn format_with_config(&self, result: &QualityResult, config: &FormatterConfig) -> Result<String> {
        let mut output = String::new();
        let run = result.report();
        let report = &run.report;
        let h = "#".repeat(self.heading_level as usize);

        if result.is_passed() {
            writeln!(output, "{h} ✅ Quality Report - PASSED")?;
        } else {
            writeln!(output, "{h} ❌ Quality Report - FAILED")?;
        }
        writeln!(output)?;
        writeln!(output, "**Run:** {}", run.name)?;
        writeln!(output, "**Policy:** {}", run.policy)?;
        writeln!(output, "**Quality:** {}", run.score)?;
        if config.include_timestamps {
            writeln!(output, "**Timestamp:** {}", run.timestamp)?;
        }

        if config.include_summary {
            writeln!(output)?;
            writeln!(output, "{h}# Summary")?;
            writeln!(output)?;
            writeln!(output, "| Metric | Value |")?;
            writeln!(output, "|--------|-------|")?;
            writeln!(output, "| Rules | {} |", run.rules)?;
            writeln!(output, "| Rejected rules | {} |", run.rejected_rules.len())?;
            writeln!(output, "| Records | {} |", run.records)?;
            writeln!(output, "| Pairs checked | {} |", report.checked)?;
            writeln!(output, "| Consistent | {} |", report.consistent)?;
            writeln!(output, "| Inconsistent | {} |", report.violation_count())?;
            writeln!(output, "| Skipped | {} |", report.skipped)?;
            if let Some(min) = run.min_quality {
                writeln!(output, "| Minimum quality | {min:.2}% |")?;
            }
            writeln!(output, "| Execution Time | {}ms |", run.execution_time_ms)?;
        }

        if config.include_rejected && !run.rejected_rules.is_empty() {
            writeln!(output)?;
            writeln!(output, "{h}# Rejected Branching Logic")?;
            writeln!(output)?;
            for rejected in &run.rejected_rules {
                writeln!(
                    output,
                    "- `{}`: {} (`{}`)",
                    rejected.field_name, rejected.reason, rejected.branching_logic
                )?;
            }
        }

        if config.include_violations && !report.is_clean() {
            let shown = config.shown(&report.violations);
            writeln!(output)?;
            writeln!(output, "{h}# Inconsistent Rows")?;
            writeln!(output)?;
            writeln!(output, "| Row | Record | Field | Problem | Rule |")?;
            writeln!(output, "|-----|--------|-------|---------|------|")?;
            for violation in shown {
                writeln!(
                    output,
                    "| {} | {} | {} | {} | `{}` |",
                    violation.record_index,
                    violation.record_id.as_deref().unwrap_or("-"),
                    violation.governed_field,
                    violation.kind,
                    violation.rule
                )?;
            }

            if report.violation_count() > shown.len() {
                writeln!(output)?;
                writeln!(
                    output,
                    "> **Note:** {} additional rows not shown in this report.",
                    report.violation_count() - shown.len()
                )?;
            }
        }

        Ok(output)
    }
}

fn filter_result(result: &QualityResult, config: &FormatterConfig) -> QualityResult {
    match result {
        QualityResult::Passed { report } => QualityResult::Passed {
            report: filter_report(report, config),
        },
        QualityResult::Failed { report } => QualityResult::Failed {
            report: filter_report(report, config),
        },
    }
}

fn filter_report(report: &QualityReport, config: &FormatterConfig) -> QualityReport {
    let mut filtered = report.clone();

    if !config.include_violations {
        filtered.report.violations.clear();
    } else if let Some(max) = config.max_violations {
        filtered.report.violations.truncate(max);
    }

    if !config.include_rejected {
        filtered.rejected_rules.clear();
    }

    if !config.include_timestamps {
        filtered.timestamp = String::new();
    }

    filtered
}
