use chrono::{Local, NaiveDate};
use colored::Colorize;
use comfy_table::{Cell, CellAlignment, Table};

use crate::cli::load_tables;
use crate::error::Result;
use crate::fmt::{compact, money};
use crate::metrics::{breakdown, summarize, Breakdown, Metrics, Window};
use crate::models::{Subset, SummaryTables};
use crate::settings::load_settings;

fn format_metrics(m: &Metrics) -> String {
    let mut table = Table::new();
    table.set_header(vec!["Days", "Donations", "Spending"]);
    table.add_row(vec![
        Cell::new(m.days_since_launch),
        Cell::new(money(m.donations_total)).set_alignment(CellAlignment::Right),
        Cell::new(money(m.spending_total)).set_alignment(CellAlignment::Right),
    ]);
    let latest = m
        .latest_date
        .map(|d| d.to_string())
        .unwrap_or_else(|| "n/a".to_string());
    table.add_row(vec![
        Cell::new(format!("latest {latest}")),
        Cell::new(format!("+{}", compact(m.latest_donations))).set_alignment(CellAlignment::Right),
        Cell::new(compact(m.latest_spending)).set_alignment(CellAlignment::Right),
    ]);
    table.to_string()
}

fn format_breakdown(b: &Breakdown) -> String {
    let mut table = Table::new();
    table.set_header(vec!["Donations by category", "UAH", "Spending by category", "UAH"]);
    let len = b.donations.len().max(b.spending.len());
    for i in 0..len {
        let (d_name, d_amt) = match b.donations.get(i) {
            Some((name, amt)) => (name.as_str(), compact(*amt)),
            None => ("", String::new()),
        };
        let (s_name, s_amt) = match b.spending.get(i) {
            Some((name, amt)) => (name.as_str(), compact(*amt)),
            None => ("", String::new()),
        };
        table.add_row(vec![
            Cell::new(d_name),
            Cell::new(d_amt).set_alignment(CellAlignment::Right),
            Cell::new(s_name),
            Cell::new(s_amt).set_alignment(CellAlignment::Right),
        ]);
    }
    table.to_string()
}

pub fn render(
    tables: &SummaryTables,
    launch_date: NaiveDate,
    today: NaiveDate,
    window: Window,
    subset: Subset,
) -> Result<String> {
    let metrics = summarize(tables, launch_date, today)?;
    let b = breakdown(tables, window, subset)?;
    let mut out = format!("{}\n{}\n", "Fund Financials".bold(), format_metrics(&metrics));
    if b.donations.is_empty() && b.spending.is_empty() {
        out.push_str(&format!("\nNo rows for {}.", window.label()));
    } else {
        let through = b.latest_date.map(|d| format!(" through {d}")).unwrap_or_default();
        out.push_str(&format!(
            "\nBy category, {}{through}\n{}",
            window.label(),
            format_breakdown(&b)
        ));
    }
    Ok(out)
}

pub fn run(window: Window, subset: Subset) -> Result<()> {
    let settings = load_settings();
    let tables = load_tables(&settings)?;
    let today = Local::now().date_naive();
    println!("{}", render(&tables, settings.launch_date, today, window, subset)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SummaryRow;
    use rust_decimal::Decimal;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_render_with_data() {
        let tables = SummaryTables {
            donations_total: vec![SummaryRow::dated(date(2023, 3, 1), Decimal::from(2_500_000))],
            donations_total_by_category: vec![SummaryRow::categorized(
                date(2023, 3, 1),
                "Загальні донати",
                Decimal::from(2_500_000),
            )],
            ..SummaryTables::default()
        };
        let text = render(&tables, date(2023, 2, 15), date(2023, 3, 1), Window::All, Subset::All).unwrap();
        assert!(text.contains("14"));
        assert!(text.contains("2,500,000.00"));
        assert!(text.contains("+2.50M"));
        assert!(text.contains("Загальні донати"));
    }

    #[test]
    fn test_render_quarter_window() {
        let tables = SummaryTables {
            donations_total_by_category: vec![
                SummaryRow::categorized(date(2022, 11, 5), "Літай", Decimal::from(700)),
                SummaryRow::categorized(date(2023, 3, 1), "Адмін", Decimal::from(300)),
            ],
            ..SummaryTables::default()
        };
        let text = render(&tables, date(2023, 2, 15), date(2023, 3, 1), Window::Quarter, Subset::All)
            .unwrap();
        assert!(text.contains("By category, last 3 months through 2023-03-01"));
        assert!(text.contains("Адмін"));
        assert!(!text.contains("Літай"));
    }

    #[test]
    fn test_render_empty_window() {
        let text = render(
            &SummaryTables::default(),
            date(2023, 2, 15),
            date(2023, 3, 1),
            Window::Week,
            Subset::Large,
        )
        .unwrap();
        assert!(text.contains("No rows for last week."));
        assert!(text.contains("latest n/a"));
    }
}
