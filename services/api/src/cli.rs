use crate::demo::{run_demo, run_forecast, DemoArgs, ForecastArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use hemovital::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "HemoVital Analytics",
    about = "Run the donor matching and blood demand analytics service from the command line",
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
    /// Forecast demand from a request history CSV export
    Forecast(ForecastArgs),
    /// Walk through matching, forecasting, retention and a donation lifecycle on demo data
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
    /// Seed the in-memory store with a demo hospital, donors and request history
    #[arg(long)]
    pub(crate) seed_demo: bool,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Forecast(args) => run_forecast(args),
        Command::Demo(args) => run_demo(args),
    }
}
