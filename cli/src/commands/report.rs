//! `layerlens report` command — long-form narrative report.

use clap::Args;
use layerlens_engine::ReportMode;

use super::AnalysisArgs;

#[derive(Args)]
pub struct ReportArgs {
    #[command(flatten)]
    pub analysis: AnalysisArgs,
}

pub async fn execute(args: ReportArgs) -> Result<(), Box<dyn std::error::Error>> {
    super::run_analysis(args.analysis, ReportMode::Longform).await
}
