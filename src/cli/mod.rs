pub mod dashboard;
pub mod demo;
pub mod init;
pub mod refresh;
pub mod report;
pub mod rules;
pub mod status;

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;

use crate::error::Result;
use crate::metrics::Window;
use crate::models::{Stream, Subset, SummaryTables};
use crate::reports::Period;
use crate::settings::Settings;
use crate::storage::read_tables;

/// Read the persisted tables from the configured data directory.
pub(crate) fn load_tables(settings: &Settings) -> Result<SummaryTables> {
    read_tables(&settings.tables_dir())
}

pub(crate) fn resolve_path(flag: Option<&Path>, configured: Option<PathBuf>) -> Option<PathBuf> {
    flag.map(Path::to_path_buf).or(configured)
}

#[derive(Parser)]
#[command(
    name = "fundledger",
    version,
    about = "Categorize a charitable fund's ledger into donation and spending summary tables."
)]
pub struct Cli {
    /// More log output on stderr (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Set up fundledger: choose a data directory and write the default rules.
    Init {
        /// Path for fundledger data (default: ~/Documents/fundledger)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
    },
    /// Load the ledger, categorize it and rewrite the summary tables.
    Refresh(RefreshArgs),
    /// Inspect categorization rule tables.
    Rules {
        #[command(subcommand)]
        command: RulesCommands,
    },
    /// Reports over the summary tables.
    Report {
        #[command(subcommand)]
        command: ReportCommands,
    },
    /// Headline metrics and a per-category breakdown.
    Dashboard {
        /// Trailing window: all, day, week, month, quarter, half-year, year
        #[arg(long, default_value = "all")]
        window: Window,
        /// Which rows to include: all, large, below
        #[arg(long, default_value = "all")]
        subset: Subset,
    },
    /// Show settings, table presence and freshness.
    Status,
    /// Write a sample ledger and refresh from it.
    Demo {
        /// Directory for the demo data (default: configured data dir)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
    },
    /// Print shell completions.
    Completions {
        shell: clap_complete::Shell,
    },
}

#[derive(clap::Args, Debug, Default, Clone)]
pub struct RefreshArgs {
    /// Ledger export (CSV, or XLSX with the xlsx feature)
    #[arg(long)]
    pub ledger: Option<PathBuf>,
    /// Rule tables in TOML (default: built-in rules)
    #[arg(long)]
    pub rules: Option<PathBuf>,
    /// Output directory for the tables (default: <data_dir>/tables)
    #[arg(long)]
    pub out: Option<PathBuf>,
    /// Large-transaction threshold in UAH
    #[arg(long)]
    pub threshold: Option<Decimal>,
    /// Only read the first N data rows of the ledger
    #[arg(long)]
    pub limit: Option<usize>,
    /// First date to include: YYYY-MM-DD
    #[arg(long = "from")]
    pub from_date: Option<NaiveDate>,
    /// Last date to include: YYYY-MM-DD
    #[arg(long = "to")]
    pub to_date: Option<NaiveDate>,
}

#[derive(Subcommand)]
pub enum RulesCommands {
    /// Print the rule tables for each stream.
    Show {
        /// Rule file (default: configured rules, else built-in)
        #[arg(long)]
        rules: Option<PathBuf>,
    },
    /// Parse a rule file and report what it contains.
    Check {
        path: PathBuf,
    },
}

#[derive(Subcommand)]
pub enum ReportCommands {
    /// Donations against spending per period.
    Totals {
        /// day, week, month, year
        #[arg(long, default_value = "month")]
        period: Period,
    },
    /// Category totals for one stream.
    Categories {
        /// donations or spending
        #[arg(long)]
        stream: Stream,
        /// all, large, below
        #[arg(long, default_value = "all")]
        subset: Subset,
    },
    /// Per-period amounts for selected categories of one stream.
    Period {
        /// donations or spending
        #[arg(long)]
        stream: Stream,
        /// day, week, month, year
        #[arg(long, default_value = "month")]
        period: Period,
        /// Category to include (repeatable; default: all)
        #[arg(long = "category")]
        categories: Vec<String>,
    },
    /// Donors whose large donations add up past a minimum.
    Donors {
        /// Ledger export (default: configured ledger)
        #[arg(long)]
        ledger: Option<PathBuf>,
        /// Minimum total per donor in UAH (default from rules)
        #[arg(long = "min-total")]
        min_total: Option<Decimal>,
    },
}
