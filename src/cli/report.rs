use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::NaiveDate;
use colored::Colorize;
use comfy_table::{Cell, CellAlignment, Table};
use rust_decimal::Decimal;

use crate::categorizer::RunParams;
use crate::cli::{load_tables, resolve_path};
use crate::donors::{top_donors, Donor};
use crate::error::{FundError, Result};
use crate::fmt::money;
use crate::loader::load_ledger;
use crate::models::{Stream, Subset, SummaryTables};
use crate::reports::{
    accumulate, categories_of, sum_by_period, sum_by_period_by_category, totals_by_category,
    Period, PeriodTable,
};
use crate::rules::RuleSet;
use crate::settings::load_settings;
use crate::storage::Manifest;

fn amount_cell(val: Decimal) -> Cell {
    Cell::new(money(val)).set_alignment(CellAlignment::Right)
}

// ---------------------------------------------------------------------------
// Formatting
// ---------------------------------------------------------------------------

fn net(donations: Decimal, spending: Decimal) -> Result<Decimal> {
    let mut total = donations;
    accumulate(&mut total, spending)?;
    Ok(total)
}

pub fn format_totals(tables: &SummaryTables, period: Period) -> Result<String> {
    let mut merged: BTreeMap<NaiveDate, (Decimal, Decimal)> = BTreeMap::new();
    for (start, uah) in sum_by_period(tables.total(Stream::Donations), period)? {
        merged.entry(start).or_default().0 = uah;
    }
    for (start, uah) in sum_by_period(tables.total(Stream::Spending), period)? {
        merged.entry(start).or_default().1 = uah;
    }

    let mut table = Table::new();
    table.set_header(vec!["Period", "Donations", "Spending", "Net"]);
    let (mut total_in, mut total_out) = (Decimal::ZERO, Decimal::ZERO);
    for (start, (donations, spending)) in merged {
        accumulate(&mut total_in, donations)?;
        accumulate(&mut total_out, spending)?;
        table.add_row(vec![
            Cell::new(period.label(start)),
            amount_cell(donations),
            amount_cell(spending),
            amount_cell(net(donations, spending)?),
        ]);
    }
    table.add_row(vec![
        Cell::new("TOTAL"),
        amount_cell(total_in),
        amount_cell(total_out),
        amount_cell(net(total_in, total_out)?),
    ]);
    Ok(format!("{}\n{table}", "Donations vs Spending".bold()))
}

pub fn format_categories(tables: &SummaryTables, stream: Stream, subset: Subset) -> Result<String> {
    let totals = totals_by_category(tables.by_category(stream, subset))?;
    let mut grand = Decimal::ZERO;
    for (_, total) in &totals {
        accumulate(&mut grand, *total)?;
    }

    let mut table = Table::new();
    table.set_header(vec!["Category", "UAH", "%"]);
    for (category, total) in &totals {
        let pct = if grand.is_zero() {
            Some(Decimal::ZERO)
        } else {
            total
                .checked_div(grand)
                .and_then(|share| share.checked_mul(Decimal::from(100)))
                .map(|p| p.round_dp(1))
        };
        let pct = pct.map(|p| format!("{p:.1}%")).unwrap_or_default();
        table.add_row(vec![
            Cell::new(category),
            amount_cell(*total),
            Cell::new(pct).set_alignment(CellAlignment::Right),
        ]);
    }
    table.add_row(vec![Cell::new("TOTAL"), amount_cell(grand), Cell::new("")]);
    let subset_label = match subset {
        Subset::All => "all",
        Subset::Large => "large",
        Subset::Below => "below large",
    };
    Ok(format!("{} by category ({subset_label})\n{table}", stream.label().bold()))
}

pub fn format_period_table(stream: Stream, data: &PeriodTable) -> Result<String> {
    let mut header = vec!["Period".to_string()];
    header.extend(data.categories.iter().cloned());
    header.push("Total".to_string());

    let mut table = Table::new();
    table.set_header(header);
    for row in &data.rows {
        let mut cells = vec![Cell::new(data.period.label(row.start))];
        cells.extend(row.amounts.iter().map(|amt| match amt {
            Some(v) => amount_cell(*v),
            None => Cell::new(""),
        }));
        cells.push(amount_cell(data.row_total(row)?));
        table.add_row(cells);
    }
    Ok(format!("{} per period\n{table}", stream.label().bold()))
}

pub fn format_donors(donors: &[Donor], min_total: Decimal) -> String {
    if donors.is_empty() {
        return format!("No donors with at least {} UAH.", money(min_total));
    }
    let mut table = Table::new();
    table.set_header(vec!["Top Donors", "UAH"]);
    for d in donors {
        table.add_row(vec![Cell::new(&d.name), amount_cell(d.total)]);
    }
    format!("{}\n{table}", "Top donors".bold())
}

// ---------------------------------------------------------------------------
// Data-fetching wrappers (used by dispatch)
// ---------------------------------------------------------------------------

pub fn totals(period: Period) -> Result<()> {
    let tables = load_tables(&load_settings())?;
    println!("{}", format_totals(&tables, period)?);
    Ok(())
}

pub fn categories(stream: Stream, subset: Subset) -> Result<()> {
    let tables = load_tables(&load_settings())?;
    println!("{}", format_categories(&tables, stream, subset)?);
    Ok(())
}

pub fn period(stream: Stream, period: Period, categories: Vec<String>) -> Result<()> {
    let tables = load_tables(&load_settings())?;
    let rows = tables.by_category(stream, Subset::All);
    let categories = if categories.is_empty() {
        categories_of(rows)
    } else {
        categories
    };
    let data = sum_by_period_by_category(rows, period, &categories)?;
    println!("{}", format_period_table(stream, &data)?);
    Ok(())
}

pub fn donors(ledger: Option<PathBuf>, min_total: Option<Decimal>) -> Result<()> {
    let settings = load_settings();
    let ledger = resolve_path(ledger.as_deref(), settings.ledger())
        .or_else(|| Manifest::load(&settings.tables_dir()).map(|m| PathBuf::from(m.ledger)))
        .ok_or_else(|| {
            FundError::Settings("No ledger configured. Pass --ledger or run `fundledger refresh` first.".into())
        })?;
    let rules = RuleSet::resolve(settings.rules().as_deref())?;
    let params = RunParams {
        threshold: settings.threshold,
        ..RunParams::default()
    };
    let min_total = min_total.unwrap_or(rules.donors.min_total);

    let txns = load_ledger(&ledger, None)?;
    let donors = top_donors(&txns, &rules, &params, min_total)?;
    println!("{}", format_donors(&donors, min_total));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SummaryRow;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn tables() -> SummaryTables {
        SummaryTables {
            donations_total: vec![
                SummaryRow::dated(date(2023, 3, 1), Decimal::from(1000)),
                SummaryRow::dated(date(2023, 4, 2), Decimal::from(3000)),
            ],
            spending_total: vec![SummaryRow::dated(date(2023, 3, 5), Decimal::from(-400))],
            donations_total_by_category: vec![
                SummaryRow::categorized(date(2023, 3, 1), "Літай", Decimal::from(1000)),
                SummaryRow::categorized(date(2023, 4, 2), "Адмін", Decimal::from(3000)),
            ],
            ..SummaryTables::default()
        }
    }

    #[test]
    fn test_totals_by_month() {
        let text = format_totals(&tables(), Period::Month).unwrap();
        assert!(text.contains("2023-03"));
        assert!(text.contains("2023-04"));
        assert!(text.contains("600.00"));
        assert!(text.contains("3,600.00"));
    }

    #[test]
    fn test_categories_share() {
        let text = format_categories(&tables(), Stream::Donations, Subset::All).unwrap();
        assert!(text.contains("75.0%"));
        assert!(text.contains("25.0%"));
        assert!(text.contains("4,000.00"));
    }

    #[test]
    fn test_period_table_blank_cells() {
        let t = tables();
        let rows = t.by_category(Stream::Donations, Subset::All);
        let data = sum_by_period_by_category(rows, Period::Month, &categories_of(rows)).unwrap();
        let text = format_period_table(Stream::Donations, &data).unwrap();
        assert!(text.contains("Адмін"));
        assert!(text.contains("Літай"));
        assert_eq!(data.rows.len(), 2);
        assert_eq!(data.rows[0].amounts, vec![None, Some(Decimal::from(1000))]);
    }

    #[test]
    fn test_totals_out_of_range_is_error() {
        let mut t = tables();
        t.donations_total.push(SummaryRow::dated(date(2023, 3, 2), Decimal::MAX));
        t.donations_total.push(SummaryRow::dated(date(2023, 3, 3), Decimal::MAX));
        let err = format_totals(&t, Period::Month).unwrap_err();
        assert!(matches!(err, FundError::Other(_)));
    }

    #[test]
    fn test_empty_donor_list_message() {
        let text = format_donors(&[], Decimal::from(1_000_000));
        assert_eq!(text, "No donors with at least 1,000,000.00 UAH.");
    }
}
