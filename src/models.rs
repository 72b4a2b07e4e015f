use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;

/// One raw ledger row as loaded from the export.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    /// 1-based line in the source file (header is line 1).
    pub line: usize,
    pub date: NaiveDate,
    pub uah: Decimal,
    pub to_account: Option<String>,
    pub from_account: Option<String>,
    pub category: String,
    pub subcategory: String,
    pub commentary: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stream {
    Donations,
    Spending,
}

impl Stream {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Donations => "donations",
            Self::Spending => "spending",
        }
    }
}

impl std::str::FromStr for Stream {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "donations" | "donation" | "in" => Ok(Self::Donations),
            "spending" | "spend" | "out" => Ok(Self::Spending),
            other => Err(format!("Unknown stream: '{other}' (expected donations or spending)")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategorizedTransaction {
    pub date: NaiveDate,
    pub category: String,
    pub uah: Decimal,
}

/// Unit of the persisted summary tables. `category` is absent for date-only totals.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Deserialize)]
pub struct SummaryRow {
    #[serde(rename = "Date")]
    pub date: NaiveDate,
    #[serde(rename = "Category", default)]
    pub category: Option<String>,
    #[serde(rename = "UAH", with = "rust_decimal::serde::str")]
    pub uah: Decimal,
}

impl SummaryRow {
    pub fn dated(date: NaiveDate, uah: Decimal) -> Self {
        Self {
            date,
            category: None,
            uah,
        }
    }

    pub fn categorized(date: NaiveDate, category: impl Into<String>, uah: Decimal) -> Self {
        Self {
            date,
            category: Some(category.into()),
            uah,
        }
    }

    pub fn category_name(&self) -> &str {
        self.category.as_deref().unwrap_or("")
    }
}

/// The eight tables handed from the pipeline to the viewer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SummaryTables {
    pub donations_total: Vec<SummaryRow>,
    pub spending_total: Vec<SummaryRow>,
    pub donations_total_by_category: Vec<SummaryRow>,
    pub spending_total_by_category: Vec<SummaryRow>,
    pub large_donations_by_category: Vec<SummaryRow>,
    pub large_spending_by_category: Vec<SummaryRow>,
    pub donations_below_large_by_category: Vec<SummaryRow>,
    pub spending_below_large_by_category: Vec<SummaryRow>,
}

/// Which slice of the by-category tables to look at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subset {
    All,
    Large,
    Below,
}

impl std::str::FromStr for Subset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all" => Ok(Self::All),
            "large" | "over" => Ok(Self::Large),
            "below" | "small" => Ok(Self::Below),
            other => Err(format!("Unknown subset: '{other}' (expected all, large or below)")),
        }
    }
}

impl SummaryTables {
    pub fn total(&self, stream: Stream) -> &[SummaryRow] {
        match stream {
            Stream::Donations => &self.donations_total,
            Stream::Spending => &self.spending_total,
        }
    }

    pub fn by_category(&self, stream: Stream, subset: Subset) -> &[SummaryRow] {
        match (stream, subset) {
            (Stream::Donations, Subset::All) => &self.donations_total_by_category,
            (Stream::Donations, Subset::Large) => &self.large_donations_by_category,
            (Stream::Donations, Subset::Below) => &self.donations_below_large_by_category,
            (Stream::Spending, Subset::All) => &self.spending_total_by_category,
            (Stream::Spending, Subset::Large) => &self.large_spending_by_category,
            (Stream::Spending, Subset::Below) => &self.spending_below_large_by_category,
        }
    }
}

/// A row with both or neither account populated. Kept out of both streams.
#[derive(Debug, Clone, PartialEq)]
pub struct AmbiguousRow {
    pub line: usize,
    pub date: NaiveDate,
    pub uah: Decimal,
    pub to_account: Option<String>,
    pub from_account: Option<String>,
}

/// A row that came out of the rule chain with no category.
#[derive(Debug, Clone, PartialEq)]
pub struct UncategorizedRow {
    pub line: usize,
    pub stream: Stream,
    pub date: NaiveDate,
    pub uah: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategorizeReport {
    pub loaded: usize,
    pub out_of_range: usize,
    pub excluded_donations: usize,
    pub excluded_spending: usize,
    pub ambiguous: Vec<AmbiguousRow>,
    pub uncategorized: Vec<UncategorizedRow>,
}

#[derive(Debug, Clone, Default)]
pub struct Categorized {
    pub donations: Vec<CategorizedTransaction>,
    pub spending: Vec<CategorizedTransaction>,
    pub report: CategorizeReport,
}

impl Categorized {
    pub fn stream(&self, stream: Stream) -> &[CategorizedTransaction] {
        match stream {
            Stream::Donations => &self.donations,
            Stream::Spending => &self.spending,
        }
    }
}
