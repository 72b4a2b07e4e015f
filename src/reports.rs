use std::collections::{BTreeMap, BTreeSet};

use chrono::{Datelike, Duration, NaiveDate};
use rust_decimal::Decimal;

use crate::error::{FundError, Result};
use crate::models::{Categorized, CategorizedTransaction, Stream, SummaryRow, SummaryTables};

/// Add `amount` into `total`. A sum outside `Decimal`'s range is an error.
pub fn accumulate(total: &mut Decimal, amount: Decimal) -> Result<()> {
    *total = total
        .checked_add(amount)
        .ok_or_else(|| FundError::Other(format!("UAH sum out of range: {total} + {amount}")))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Grouping
// ---------------------------------------------------------------------------

/// Group by (date, category) and sum UAH. Only UAH is summed.
pub fn totals_by_date_category<'a>(
    rows: impl IntoIterator<Item = &'a CategorizedTransaction>,
) -> Result<Vec<SummaryRow>> {
    let mut groups: BTreeMap<(NaiveDate, &str), Decimal> = BTreeMap::new();
    for r in rows {
        accumulate(groups.entry((r.date, r.category.as_str())).or_default(), r.uah)?;
    }
    Ok(groups
        .into_iter()
        .map(|((date, category), uah)| SummaryRow::categorized(date, category, uah))
        .collect())
}

/// Group by date only; the category dimension is dropped.
pub fn totals_by_date<'a>(
    rows: impl IntoIterator<Item = &'a CategorizedTransaction>,
) -> Result<Vec<SummaryRow>> {
    let mut groups: BTreeMap<NaiveDate, Decimal> = BTreeMap::new();
    for r in rows {
        accumulate(groups.entry(r.date).or_default(), r.uah)?;
    }
    Ok(groups
        .into_iter()
        .map(|(date, uah)| SummaryRow::dated(date, uah))
        .collect())
}

/// Rows at or above the threshold. `uah == threshold` counts as large.
pub fn large_by_category(
    rows: &[CategorizedTransaction],
    threshold: Decimal,
) -> Result<Vec<SummaryRow>> {
    totals_by_date_category(rows.iter().filter(|r| r.uah >= threshold))
}

pub fn below_by_category(
    rows: &[CategorizedTransaction],
    threshold: Decimal,
) -> Result<Vec<SummaryRow>> {
    totals_by_date_category(rows.iter().filter(|r| r.uah < threshold))
}

pub fn aggregate(categorized: &Categorized, threshold: Decimal) -> Result<SummaryTables> {
    let donations = categorized.stream(Stream::Donations);
    let spending = categorized.stream(Stream::Spending);
    Ok(SummaryTables {
        donations_total: totals_by_date(donations)?,
        spending_total: totals_by_date(spending)?,
        donations_total_by_category: totals_by_date_category(donations)?,
        spending_total_by_category: totals_by_date_category(spending)?,
        large_donations_by_category: large_by_category(donations, threshold)?,
        large_spending_by_category: large_by_category(spending, threshold)?,
        donations_below_large_by_category: below_by_category(donations, threshold)?,
        spending_below_large_by_category: below_by_category(spending, threshold)?,
    })
}

pub fn sum_uah(rows: &[SummaryRow]) -> Result<Decimal> {
    let mut total = Decimal::ZERO;
    for r in rows {
        accumulate(&mut total, r.uah)?;
    }
    Ok(total)
}

// ---------------------------------------------------------------------------
// Period bucketing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Day,
    Week,
    Month,
    Year,
}

impl std::str::FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "d" | "day" | "daily" => Ok(Self::Day),
            "w" | "week" | "weekly" => Ok(Self::Week),
            "m" | "month" | "monthly" => Ok(Self::Month),
            "y" | "year" | "yearly" => Ok(Self::Year),
            other => Err(format!("Unknown period: '{other}' (expected day, week, month or year)")),
        }
    }
}

impl Period {
    /// First day of the period containing `date`. Weeks start on Monday.
    pub fn start(self, date: NaiveDate) -> NaiveDate {
        match self {
            Self::Day => date,
            Self::Week => date - Duration::days(date.weekday().num_days_from_monday() as i64),
            Self::Month => date.with_day(1).unwrap_or(date),
            Self::Year => date.with_ordinal(1).unwrap_or(date),
        }
    }

    pub fn label(self, start: NaiveDate) -> String {
        match self {
            Self::Day | Self::Week => start.format("%Y-%m-%d").to_string(),
            Self::Month => start.format("%Y-%m").to_string(),
            Self::Year => start.format("%Y").to_string(),
        }
    }
}

/// Sum UAH per period, ordered by period start.
pub fn sum_by_period(rows: &[SummaryRow], period: Period) -> Result<Vec<(NaiveDate, Decimal)>> {
    let mut groups: BTreeMap<NaiveDate, Decimal> = BTreeMap::new();
    for r in rows {
        accumulate(groups.entry(period.start(r.date)).or_default(), r.uah)?;
    }
    Ok(groups.into_iter().collect())
}

#[derive(Debug, Clone, PartialEq)]
pub struct PeriodRow {
    pub start: NaiveDate,
    /// One entry per column; `None` where the period has no rows for that category.
    pub amounts: Vec<Option<Decimal>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PeriodTable {
    pub period: Period,
    pub categories: Vec<String>,
    pub rows: Vec<PeriodRow>,
}

impl PeriodTable {
    pub fn row_total(&self, row: &PeriodRow) -> Result<Decimal> {
        let mut total = Decimal::ZERO;
        for amount in row.amounts.iter().flatten() {
            accumulate(&mut total, *amount)?;
        }
        Ok(total)
    }
}

/// One column per listed category, outer-joined on period.
pub fn sum_by_period_by_category(
    rows: &[SummaryRow],
    period: Period,
    categories: &[String],
) -> Result<PeriodTable> {
    let mut cells: BTreeMap<NaiveDate, Vec<Option<Decimal>>> = BTreeMap::new();
    for r in rows {
        let Some(idx) = categories.iter().position(|c| c == r.category_name()) else {
            continue;
        };
        let amounts = cells
            .entry(period.start(r.date))
            .or_insert_with(|| vec![None; categories.len()]);
        accumulate(amounts[idx].get_or_insert(Decimal::ZERO), r.uah)?;
    }
    Ok(PeriodTable {
        period,
        categories: categories.to_vec(),
        rows: cells
            .into_iter()
            .map(|(start, amounts)| PeriodRow { start, amounts })
            .collect(),
    })
}

/// Distinct category names, sorted.
pub fn categories_of(rows: &[SummaryRow]) -> Vec<String> {
    rows.iter()
        .filter_map(|r| r.category.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Total per category across all dates, largest first.
pub fn totals_by_category(rows: &[SummaryRow]) -> Result<Vec<(String, Decimal)>> {
    let mut groups: BTreeMap<&str, Decimal> = BTreeMap::new();
    for r in rows {
        accumulate(groups.entry(r.category_name()).or_default(), r.uah)?;
    }
    let mut out: Vec<(String, Decimal)> = groups
        .into_iter()
        .map(|(c, t)| (c.to_string(), t))
        .collect();
    out.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    Ok(out)
}
