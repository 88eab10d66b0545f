//! CLI command definitions and dispatch.

mod report;
mod summary;

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use layerlens_core::AnalysisConfig;
use layerlens_engine::{
    dockerfile, AnalysisContext, Analyzer, DockerCli, ReportMode, RuleLibrary, RunReport,
};

use crate::output;

/// LayerLens — container image package provenance analyzer.
#[derive(Parser)]
#[command(name = "layerlens", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Subcommand)]
pub enum Command {
    /// Write the long-form narrative report (default execution route)
    Report(report::ReportArgs),
    /// Write the condensed summary report
    Summary(summary::SummaryArgs),
}

/// Options shared by both report modes.
#[derive(Args)]
pub struct AnalysisArgs {
    /// Dockerfile to analyze (defaults to ./Dockerfile)
    #[arg(short, long)]
    pub dockerfile: Option<PathBuf>,

    /// Tag for the image built from the Dockerfile
    #[arg(short, long)]
    pub tag: Option<String>,

    /// Report output path
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Layer cache file
    #[arg(long)]
    pub cache_file: Option<PathBuf>,

    /// Timeout in seconds for command knowledge lookups
    #[arg(long)]
    pub timeout: Option<u64>,
}

/// Dispatch a parsed CLI to the appropriate command handler.
pub async fn dispatch(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Command::Report(args) => report::execute(args).await,
        Command::Summary(args) => summary::execute(args).await,
    }
}

/// Fold CLI overrides into the default configuration.
fn apply_overrides(mut config: AnalysisConfig, args: &AnalysisArgs) -> AnalysisConfig {
    if let Some(output) = &args.output {
        config.report_file = output.clone();
    }
    if let Some(cache_file) = &args.cache_file {
        config.cache_file = cache_file.clone();
    }
    if let Some(secs) = args.timeout {
        config.command_timeout = Duration::from_secs(secs);
    }
    if let Some(tag) = &args.tag {
        config.image_tag = tag.clone();
    }
    config
}

/// Run one analysis against the docker CLI adapter and the built-in
/// command knowledge rules.
pub(crate) async fn run_analysis(
    args: AnalysisArgs,
    mode: ReportMode,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = apply_overrides(AnalysisConfig::default(), &args);

    let dockerfile_path = args
        .dockerfile
        .unwrap_or_else(|| PathBuf::from("Dockerfile"));
    let instructions = dockerfile::load_instructions(&dockerfile_path)?;
    tracing::debug!(
        dockerfile = %dockerfile_path.display(),
        count = instructions.len(),
        "loaded instructions"
    );

    let docker = DockerCli::new(instructions.clone(), &dockerfile_path, &config.image_tag);
    let library = RuleLibrary;
    let ctx = AnalysisContext::load(&config, instructions)?;
    let analyzer = Analyzer::new(&config, &docker, &library, &docker);

    let run = match mode {
        ReportMode::Longform => analyzer.execute(&ctx).await?,
        ReportMode::Summary => analyzer.execute_summary(&ctx).await?,
    };

    print_bucket_counts(&run);
    println!("Report completed: {}", config.report_file.display());
    Ok(())
}

fn print_bucket_counts(run: &RunReport) {
    let confirmed = run.state.confirmed().len().to_string();
    let unconfirmed = run.state.unconfirmed().len().to_string();
    let unrecognized = run.state.unrecognized().len().to_string();
    let notes = run.state.notes().len().to_string();

    let mut table = output::new_table(&["BUCKET", "COUNT"]);
    table.add_row(["confirmed", confirmed.as_str()]);
    table.add_row(["unconfirmed", unconfirmed.as_str()]);
    table.add_row(["unrecognized", unrecognized.as_str()]);
    table.add_row(["notes", notes.as_str()]);
    println!("{table}");
}
