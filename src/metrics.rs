use chrono::{Days, Months, NaiveDate};
use rust_decimal::Decimal;

use crate::error::Result;
use crate::models::{Stream, Subset, SummaryRow, SummaryTables};
use crate::reports::{sum_uah, totals_by_category};

/// Headline numbers shown at the top of the dashboard.
#[derive(Debug, Clone, PartialEq)]
pub struct Metrics {
    pub days_since_launch: i64,
    pub donations_total: Decimal,
    pub spending_total: Decimal,
    pub latest_date: Option<NaiveDate>,
    pub latest_donations: Decimal,
    pub latest_spending: Decimal,
}

fn latest(rows: &[SummaryRow]) -> Option<NaiveDate> {
    rows.iter().map(|r| r.date).max()
}

fn sum_on(rows: &[SummaryRow], date: Option<NaiveDate>) -> Result<Decimal> {
    match date {
        Some(d) => {
            let day: Vec<SummaryRow> = rows.iter().filter(|r| r.date == d).cloned().collect();
            sum_uah(&day)
        }
        None => Ok(Decimal::ZERO),
    }
}

pub fn summarize(tables: &SummaryTables, launch_date: NaiveDate, today: NaiveDate) -> Result<Metrics> {
    let donations = tables.total(Stream::Donations);
    let spending = tables.total(Stream::Spending);
    let latest_date = latest(donations).max(latest(spending));
    Ok(Metrics {
        days_since_launch: (today - launch_date).num_days(),
        donations_total: sum_uah(donations)?,
        spending_total: sum_uah(spending)?,
        latest_date,
        latest_donations: sum_on(donations, latest(donations))?,
        latest_spending: sum_on(spending, latest(spending))?,
    })
}

// ---------------------------------------------------------------------------
// Windowed breakdown
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Window {
    All,
    Day,
    Week,
    Month,
    Quarter,
    HalfYear,
    Year,
}

impl std::str::FromStr for Window {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all" | "since-launch" => Ok(Self::All),
            "day" | "d" => Ok(Self::Day),
            "week" | "w" => Ok(Self::Week),
            "month" | "m" => Ok(Self::Month),
            "quarter" | "3m" => Ok(Self::Quarter),
            "half-year" | "6m" => Ok(Self::HalfYear),
            "year" | "y" => Ok(Self::Year),
            other => Err(format!(
                "Unknown window: '{other}' (expected all, day, week, month, quarter, half-year or year)"
            )),
        }
    }
}

impl Window {
    pub fn label(self) -> &'static str {
        match self {
            Self::All => "since launch",
            Self::Day => "latest day",
            Self::Week => "last week",
            Self::Month => "last month",
            Self::Quarter => "last 3 months",
            Self::HalfYear => "last 6 months",
            Self::Year => "last year",
        }
    }

    /// Whether `date` falls inside the window ending at `latest`.
    pub fn contains(self, date: NaiveDate, latest: NaiveDate) -> bool {
        let cutoff = match self {
            Self::All => return true,
            Self::Day => return date == latest,
            Self::Week => latest.checked_sub_days(Days::new(7)),
            Self::Month => latest.checked_sub_months(Months::new(1)),
            Self::Quarter => latest.checked_sub_months(Months::new(3)),
            Self::HalfYear => latest.checked_sub_months(Months::new(6)),
            Self::Year => latest.checked_sub_months(Months::new(12)),
        };
        cutoff.map_or(true, |c| date >= c) && date <= latest
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Breakdown {
    pub window: Window,
    pub latest_date: Option<NaiveDate>,
    pub donations: Vec<(String, Decimal)>,
    pub spending: Vec<(String, Decimal)>,
}

fn windowed(rows: &[SummaryRow], window: Window, latest: NaiveDate) -> Vec<SummaryRow> {
    rows.iter()
        .filter(|r| window.contains(r.date, latest))
        .cloned()
        .collect()
}

/// Category totals per stream over a trailing window. The window is anchored
/// on the most recent date of each stream's own table.
pub fn breakdown(tables: &SummaryTables, window: Window, subset: Subset) -> Result<Breakdown> {
    let pick = |stream: Stream| {
        let rows = tables.by_category(stream, subset);
        match latest(rows) {
            Some(last) => totals_by_category(&windowed(rows, window, last)),
            None => Ok(Vec::new()),
        }
    };
    let latest_date = latest(tables.by_category(Stream::Donations, subset))
        .max(latest(tables.by_category(Stream::Spending, subset)));
    Ok(Breakdown {
        window,
        latest_date,
        donations: pick(Stream::Donations)?,
        spending: pick(Stream::Spending)?,
    })
}
