use crate::report::{run_explain, run_score, ExplainArgs, ScoreArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use student_risk::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Student Risk Screening",
    about = "Score student wellbeing surveys and explain the results",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Score a CSV export and print the batch outcome as JSON
    Score(ScoreArgs),
    /// Describe a survey feature by name or alias
    Explain(ExplainArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Override the configured model artifact path
    #[arg(long)]
    pub(crate) model: Option<PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Score(args) => run_score(args),
        Command::Explain(args) => run_explain(args),
    }
}
