use crate::server;
use crate::submit::{run_submit, SubmitArgs};
use clap::{Args, Parser, Subcommand};
use intake::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Intake Desk",
    about = "Receive intake form submissions, archive them, and notify staff",
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
    /// Process one submission from a JSON file and print the outcome
    Submit(SubmitArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Submit(args) => run_submit(args).await,
    }
}
