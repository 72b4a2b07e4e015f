mod categorizer;
mod cli;
mod donors;
mod error;
mod fmt;
mod loader;
mod metrics;
mod models;
mod reports;
mod rules;
mod settings;
mod storage;

use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands, ReportCommands, RulesCommands};
use metrics::Window;
use models::Subset;

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("fundledger={level}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        None => cli::dashboard::run(Window::All, Subset::All),
        Some(Commands::Init { data_dir }) => cli::init::run(data_dir),
        Some(Commands::Refresh(args)) => cli::refresh::run(args),
        Some(Commands::Rules { command }) => match command {
            RulesCommands::Show { rules } => cli::rules::show(rules),
            RulesCommands::Check { path } => cli::rules::check(&path),
        },
        Some(Commands::Report { command }) => match command {
            ReportCommands::Totals { period } => cli::report::totals(period),
            ReportCommands::Categories { stream, subset } => cli::report::categories(stream, subset),
            ReportCommands::Period {
                stream,
                period,
                categories,
            } => cli::report::period(stream, period, categories),
            ReportCommands::Donors { ledger, min_total } => cli::report::donors(ledger, min_total),
        },
        Some(Commands::Dashboard { window, subset }) => cli::dashboard::run(window, subset),
        Some(Commands::Status) => cli::status::run(),
        Some(Commands::Demo { data_dir }) => cli::demo::run(data_dir),
        Some(Commands::Completions { shell }) => {
            clap_complete::generate(shell, &mut Cli::command(), "fundledger", &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
