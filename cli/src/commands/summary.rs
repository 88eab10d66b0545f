//! `layerlens summary` command — condensed summary report.

use clap::Args;
use layerlens_engine::ReportMode;

use super::AnalysisArgs;

#[derive(Args)]
pub struct SummaryArgs {
    #[command(flatten)]
    pub analysis: AnalysisArgs,
}

pub async fn execute(args: SummaryArgs) -> Result<(), Box<dyn std::error::Error>> {
    super::run_analysis(args.analysis, ReportMode::Summary).await
}
