//! branch-guard command line
//!
//! Audits exported REDCap records against the project's branching logic.
//! Exit codes: 0 when the run passes, 1 when the score is below
//! `--min-quality`, 2 on any error.

use anyhow::{Context, Result};
use branch_guard::core::{PipelineConfig, PolicyKind, QualityPipeline, QualityResult};
use branch_guard::formatters::{
    FormatterConfig, HumanFormatter, JsonFormatter, MarkdownFormatter, ResultFormatter,
};
use branch_guard::logging::setup::{init_logging, LoggingConfig};
use branch_guard::logging::LogConfig;
use branch_guard::sources::{metadata_from_path, records_from_path, MetadataSource, RecordSource};
use clap::{Parser, ValueEnum};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Metadata export or data dictionary (.json or .csv)
    #[arg(long)]
    metadata: Option<PathBuf>,

    /// Record export (.json or .csv)
    #[arg(long)]
    records: Option<PathBuf>,

    /// Fetch both feeds from the REDCap API (REDCAP_API_URL, REDCAP_API_TOKEN)
    #[cfg(feature = "redcap")]
    #[arg(long, conflicts_with_all = ["metadata", "records"])]
    redcap: bool,

    /// JSON file with pipeline settings; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Consistency policy
    #[arg(long, value_enum)]
    policy: Option<PolicyArg>,

    /// Reject malformed branching logic instead of keeping what parses
    #[arg(long)]
    strict: bool,

    /// Read full comparison values instead of the legacy one-character window
    #[arg(long)]
    no_legacy_truncation: bool,

    /// Check records in N concurrent chunks (0 = one per CPU)
    #[arg(long)]
    partitions: Option<usize>,

    /// Fail (exit code 1) when the quality score is below this percentage
    #[arg(long)]
    min_quality: Option<f64>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Human)]
    format: OutputFormat,

    /// Maximum number of violations to print
    #[arg(long)]
    max_violations: Option<usize>,

    /// Log level for branch-guard
    #[arg(long, default_value = "info")]
    log_level: tracing::Level,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PolicyArg {
    Simple,
    Enhanced,
}

impl From<PolicyArg> for PolicyKind {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Simple => PolicyKind::Simple,
            PolicyArg::Enhanced => PolicyKind::Enhanced,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Human,
    Json,
    Markdown,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let logging = LoggingConfig::default()
        .with_crate_level(args.log_level)
        .with_json_format(args.log_json);
    if let Err(e) = init_logging(logging) {
        eprintln!("warning: {e}");
    }

    match run(args).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(2)
        }
    }
}

async fn run(args: Args) -> Result<bool> {
    let config = pipeline_config(&args)?;
    let (metadata, records) = sources(&args)?;
    let log_config = if args.log_level >= tracing::Level::DEBUG {
        LogConfig::verbose()
    } else {
        LogConfig::default()
    };

    let name = args
        .records
        .as_deref()
        .and_then(|p| p.file_stem())
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "redcap".to_string());

    let pipeline = QualityPipeline::builder(name)
        .metadata(metadata)
        .records(records)
        .config(config)
        .log_config(log_config)
        .build()?;
    let result = pipeline.run().await?;

    print!("{}", render(&args, &result)?);
    Ok(result.is_passed())
}

fn pipeline_config(args: &Args) -> Result<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_json_file(path)
            .with_context(|| format!("cannot load config '{}'", path.display()))?,
        None => PipelineConfig::legacy(),
    };

    if args.strict {
        config.compiler.strict = true;
    }
    if args.no_legacy_truncation {
        config.compiler.legacy_literal_truncation = false;
    }
    if let Some(policy) = args.policy {
        config.checker.policy = policy.into();
    }
    match args.partitions {
        Some(0) => config.checker = config.checker.with_cpu_partitions(),
        Some(n) => config.checker.partitions = n,
        None => {}
    }
    if let Some(min) = args.min_quality {
        config.min_quality = Some(min);
    }
    config.validate()?;
    Ok(config)
}

fn sources(args: &Args) -> Result<(Arc<dyn MetadataSource>, Arc<dyn RecordSource>)> {
    #[cfg(feature = "redcap")]
    {
        if args.redcap {
            let source = Arc::new(branch_guard::sources::RedcapSource::from_env()?);
            let metadata: Arc<dyn MetadataSource> = source.clone();
            let records: Arc<dyn RecordSource> = source;
            return Ok((metadata, records));
        }
    }

    let metadata = args.metadata.as_ref().context("--metadata is required")?;
    let records = args.records.as_ref().context("--records is required")?;
    Ok((metadata_from_path(metadata)?, records_from_path(records)?))
}

fn render(args: &Args, result: &QualityResult) -> Result<String> {
    let mut config = FormatterConfig::default()
        .with_colors(args.format == OutputFormat::Human && std::io::stdout().is_terminal());
    if let Some(max) = args.max_violations {
        config = config.with_max_violations(Some(max));
    }

    let output = match args.format {
        OutputFormat::Human => HumanFormatter::with_config(config).format(result)?,
        OutputFormat::Json => format!("{}\n", JsonFormatter::with_config(config).format(result)?),
        OutputFormat::Markdown => MarkdownFormatter::with_config(config).format(result)?,
    };
    Ok(output)
}
