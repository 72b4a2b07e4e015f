use std::path::PathBuf;

use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::categorizer::{categorize, RunParams};
use crate::cli::{resolve_path, RefreshArgs};
use crate::error::{FundError, Result};
use crate::fmt::money;
use crate::loader::{file_checksum, load_ledger};
use crate::models::{CategorizeReport, SummaryTables};
use crate::reports::aggregate;
use crate::rules::RuleSet;
use crate::settings::{load_settings, Settings};
use crate::storage::{write_tables, Manifest, TABLE_NAMES};

pub struct RefreshOutcome {
    pub ledger: PathBuf,
    pub out_dir: PathBuf,
    pub report: CategorizeReport,
    pub tables: SummaryTables,
}

/// Run the whole pipeline: load, categorize, aggregate, persist.
pub fn refresh(settings: &Settings, args: &RefreshArgs) -> Result<RefreshOutcome> {
    let ledger = resolve_path(args.ledger.as_deref(), settings.ledger()).ok_or_else(|| {
        FundError::Settings(
            "No ledger configured. Pass --ledger or set ledger_path in settings.json.".into(),
        )
    })?;

    let rules_path = resolve_path(args.rules.as_deref(), settings.rules());
    let rules = RuleSet::resolve(rules_path.as_deref())?;
    let rules_sha256 = match &rules_path {
        Some(p) => file_checksum(p)?,
        None => "builtin".to_string(),
    };

    let params = RunParams {
        threshold: args.threshold.unwrap_or(settings.threshold),
        from: args.from_date,
        to: args.to_date,
    };
    if let (Some(from), Some(to)) = (params.from, params.to) {
        if from > to {
            return Err(FundError::Other(format!(
                "--from {from} is after --to {to}"
            )));
        }
    }

    let txns = load_ledger(&ledger, args.limit)?;
    let categorized = categorize(&txns, &rules, &params);
    let tables = aggregate(&categorized, params.threshold)?;

    let out_dir = args.out.clone().unwrap_or_else(|| settings.tables_dir());
    write_tables(&out_dir, &tables)?;
    Manifest::build(&out_dir, &ledger, rules_sha256, params.threshold, &tables)?.save(&out_dir)?;

    Ok(RefreshOutcome {
        ledger,
        out_dir,
        report: categorized.report,
        tables,
    })
}

fn table_rows(tables: &SummaryTables, name: &str) -> usize {
    match name {
        "large_donations_by_category" => tables.large_donations_by_category.len(),
        "large_spending_by_category" => tables.large_spending_by_category.len(),
        "donations_below_large_by_category" => tables.donations_below_large_by_category.len(),
        "spending_below_large_by_category" => tables.spending_below_large_by_category.len(),
        "donations_total" => tables.donations_total.len(),
        "spending_total" => tables.spending_total.len(),
        "donations_total_by_category" => tables.donations_total_by_category.len(),
        "spending_total_by_category" => tables.spending_total_by_category.len(),
        _ => 0,
    }
}

pub fn format_outcome(outcome: &RefreshOutcome) -> String {
    let r = &outcome.report;
    let mut out = String::new();

    let mut summary = Table::new();
    summary.set_header(vec!["Rows", "Count"]);
    summary.add_row(vec![Cell::new("Loaded"), Cell::new(r.loaded)]);
    summary.add_row(vec![Cell::new("Outside date range"), Cell::new(r.out_of_range)]);
    summary.add_row(vec![Cell::new("Excluded (donations)"), Cell::new(r.excluded_donations)]);
    summary.add_row(vec![Cell::new("Excluded (spending)"), Cell::new(r.excluded_spending)]);
    summary.add_row(vec![Cell::new("Ambiguous"), Cell::new(r.ambiguous.len())]);
    summary.add_row(vec![Cell::new("Uncategorized"), Cell::new(r.uncategorized.len())]);
    out.push_str(&format!("Ledger: {}\n{summary}\n", outcome.ledger.display()));

    if !r.ambiguous.is_empty() {
        let mut amb = Table::new();
        amb.set_header(vec!["Line", "Date", "UAH", "To account", "From account"]);
        for row in &r.ambiguous {
            amb.add_row(vec![
                Cell::new(row.line),
                Cell::new(row.date),
                Cell::new(money(row.uah)),
                Cell::new(row.to_account.as_deref().unwrap_or("")),
                Cell::new(row.from_account.as_deref().unwrap_or("")),
            ]);
        }
        out.push_str(&format!(
            "\n{}\n{amb}\n",
            "Ambiguous rows (left out of both streams)".yellow()
        ));
    }

    if !r.uncategorized.is_empty() {
        let mut unc = Table::new();
        unc.set_header(vec!["Line", "Stream", "Date", "UAH"]);
        for row in &r.uncategorized {
            unc.add_row(vec![
                Cell::new(row.line),
                Cell::new(row.stream.label()),
                Cell::new(row.date),
                Cell::new(money(row.uah)),
            ]);
        }
        out.push_str(&format!("\n{}\n{unc}\n", "Uncategorized rows".yellow()));
    }

    let mut written = Table::new();
    written.set_header(vec!["Table", "Rows"]);
    for name in TABLE_NAMES {
        written.add_row(vec![Cell::new(name), Cell::new(table_rows(&outcome.tables, name))]);
    }
    out.push_str(&format!(
        "\n{} {}\n{written}",
        "Tables written to".green(),
        outcome.out_dir.display()
    ));
    out
}

pub fn run(args: RefreshArgs) -> Result<()> {
    let settings = load_settings();
    let outcome = refresh(&settings, &args)?;
    println!("{}", format_outcome(&outcome));
    Ok(())
}
