use crate::demo::{run_demo, run_term_preview, DemoArgs, TermArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use ojt_placement::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "OJT Placement",
    about = "Run the internship placement service or exercise its workflow from the command line",
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
    /// Compute an internship term's end date and required hours
    Term(TermArgs),
    /// Run the applied -> shortlisted -> selected -> signed -> MOA scenario in memory
    Demo(DemoArgs),
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
        Command::Term(args) => run_term_preview(args),
        Command::Demo(args) => run_demo(args).await,
    }
}
