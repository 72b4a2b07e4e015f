use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::models::{
    AmbiguousRow, CategorizeReport, Categorized, CategorizedTransaction, Stream, Transaction,
    UncategorizedRow,
};
use crate::rules::{
    AccountOverride, Collapse, CommentaryOverride, Remap, Replacement, RuleSet, StreamRules,
};

/// Per-run parameters threaded through the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct RunParams {
    pub threshold: Decimal,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl Default for RunParams {
    fn default() -> Self {
        Self {
            threshold: Decimal::from(100_000),
            from: None,
            to: None,
        }
    }
}

impl RunParams {
    fn in_range(&self, date: NaiveDate) -> bool {
        self.from.map_or(true, |f| date >= f) && self.to.map_or(true, |t| date <= t)
    }
}

/// A row travelling through the rule chain. The stream's account stays
/// attached until the account overrides have run.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkingRow {
    pub line: usize,
    pub date: NaiveDate,
    pub uah: Decimal,
    pub account: String,
    pub category: String,
    pub subcategory: String,
    pub commentary: String,
    /// Category was empty in the ledger itself.
    pub originally_empty: bool,
}

impl WorkingRow {
    fn from_txn(txn: &Transaction, account: &str) -> Self {
        Self {
            line: txn.line,
            date: txn.date,
            uah: txn.uah,
            account: account.to_string(),
            category: txn.category.clone(),
            subcategory: txn.subcategory.clone(),
            commentary: txn.commentary.clone().unwrap_or_default(),
            originally_empty: txn.category.is_empty(),
        }
    }
}

/// Output of the split step.
#[derive(Debug, Default)]
pub struct Split {
    pub donations: Vec<WorkingRow>,
    pub spending: Vec<WorkingRow>,
    pub ambiguous: Vec<AmbiguousRow>,
    pub out_of_range: usize,
}

// ---------------------------------------------------------------------------
// Steps. Each is (rows, config) -> rows and is applied in chain order.
// ---------------------------------------------------------------------------

pub fn split(txns: &[Transaction], params: &RunParams) -> Split {
    let mut out = Split::default();
    for txn in txns {
        if !params.in_range(txn.date) {
            out.out_of_range += 1;
            continue;
        }
        match (&txn.to_account, &txn.from_account) {
            (Some(to), None) => out.donations.push(WorkingRow::from_txn(txn, to)),
            (None, Some(from)) => out.spending.push(WorkingRow::from_txn(txn, from)),
            _ => out.ambiguous.push(AmbiguousRow {
                line: txn.line,
                date: txn.date,
                uah: txn.uah,
                to_account: txn.to_account.clone(),
                from_account: txn.from_account.clone(),
            }),
        }
    }
    out
}

pub fn exclude(rows: Vec<WorkingRow>, phrases: &[String], categories: &[String]) -> Vec<WorkingRow> {
    rows.into_iter()
        .filter(|r| !phrases.iter().any(|p| r.commentary.contains(p.as_str())))
        .filter(|r| !categories.iter().any(|c| *c == r.category))
        .collect()
}

pub fn promote_subcategory(rows: Vec<WorkingRow>, placeholders: &[String]) -> Vec<WorkingRow> {
    rows.into_iter()
        .map(|mut r| {
            if placeholders.iter().any(|p| *p == r.category) {
                r.category = r.subcategory.clone();
            }
            r
        })
        .collect()
}

pub fn remap_values(rows: Vec<WorkingRow>, remaps: &[Remap]) -> Vec<WorkingRow> {
    rows.into_iter()
        .map(|mut r| {
            if let Some(m) = remaps.iter().find(|m| m.from.iter().any(|f| *f == r.category)) {
                r.category = m.to.clone();
            }
            r
        })
        .collect()
}

pub fn drop_subcategory(rows: Vec<WorkingRow>) -> Vec<WorkingRow> {
    rows.into_iter()
        .map(|mut r| {
            r.subcategory.clear();
            r
        })
        .collect()
}

pub fn replace_substrings(rows: Vec<WorkingRow>, replacements: &[Replacement]) -> Vec<WorkingRow> {
    rows.into_iter()
        .map(|mut r| {
            for rep in replacements {
                if r.category.contains(rep.from.as_str()) {
                    r.category = r.category.replace(rep.from.as_str(), &rep.to);
                }
            }
            r
        })
        .collect()
}

pub fn override_by_account(rows: Vec<WorkingRow>, overrides: &[AccountOverride]) -> Vec<WorkingRow> {
    rows.into_iter()
        .map(|mut r| {
            if let Some(o) = overrides.iter().rev().find(|o| o.account == r.account) {
                r.category = o.category.clone();
            }
            r
        })
        .collect()
}

pub fn collapse_labels(rows: Vec<WorkingRow>, groups: &[Collapse]) -> Vec<WorkingRow> {
    let lowered: Vec<(Vec<String>, &str)> = groups
        .iter()
        .map(|g| (g.fragments.iter().map(|f| f.to_lowercase()).collect(), g.label.as_str()))
        .collect();
    rows.into_iter()
        .map(|mut r| {
            for (fragments, label) in &lowered {
                let cat = r.category.to_lowercase();
                if fragments.iter().any(|f| cat.contains(f.as_str())) {
                    r.category = label.to_string();
                }
            }
            r
        })
        .collect()
}

pub fn override_by_commentary(
    rows: Vec<WorkingRow>,
    overrides: &[CommentaryOverride],
) -> Vec<WorkingRow> {
    let lowered: Vec<(String, &str)> = overrides
        .iter()
        .map(|o| (o.pattern.to_lowercase(), o.category.as_str()))
        .collect();
    rows.into_iter()
        .map(|mut r| {
            let comment = r.commentary.to_lowercase();
            for (pattern, category) in &lowered {
                if comment.contains(pattern.as_str()) {
                    r.category = category.to_string();
                }
            }
            r
        })
        .collect()
}

/// Run steps 2-9 over one stream.
pub fn apply_chain(rows: Vec<WorkingRow>, rules: &StreamRules) -> Vec<WorkingRow> {
    let rows = exclude(rows, &rules.exclude_commentary, &rules.exclude_categories);
    let rows = promote_subcategory(rows, &rules.promote_subcategory);
    let rows = remap_values(rows, &rules.remap);
    let rows = drop_subcategory(rows);
    let rows = replace_substrings(rows, &rules.replacements);
    let rows = override_by_account(rows, &rules.account_overrides);
    let rows = collapse_labels(rows, &rules.collapse);
    override_by_commentary(rows, &rules.commentary_overrides)
}

/// Drop commentary and resolve empty categories to the explicit bucket.
fn finish(
    rows: Vec<WorkingRow>,
    stream: Stream,
    uncategorized_label: &str,
    report: &mut CategorizeReport,
) -> Vec<CategorizedTransaction> {
    rows.into_iter()
        .map(|r| {
            let category = if r.category.trim().is_empty() {
                tracing::debug!(
                    line = r.line,
                    stream = stream.label(),
                    was_empty = r.originally_empty,
                    "row left uncategorized"
                );
                report.uncategorized.push(UncategorizedRow {
                    line: r.line,
                    stream,
                    date: r.date,
                    uah: r.uah,
                });
                uncategorized_label.to_string()
            } else {
                r.category
            };
            CategorizedTransaction {
                date: r.date,
                category,
                uah: r.uah,
            }
        })
        .collect()
}

pub fn categorize(txns: &[Transaction], rules: &RuleSet, params: &RunParams) -> Categorized {
    let split = split(txns, params);
    let mut report = CategorizeReport {
        loaded: txns.len(),
        out_of_range: split.out_of_range,
        ..Default::default()
    };
    for row in &split.ambiguous {
        tracing::warn!(
            line = row.line,
            date = %row.date,
            uah = %row.uah,
            to_account = row.to_account.as_deref().unwrap_or(""),
            from_account = row.from_account.as_deref().unwrap_or(""),
            "row has both or neither account set; left out of both streams"
        );
    }
    report.ambiguous = split.ambiguous;

    let donations_in = split.donations.len();
    let donations = apply_chain(split.donations, &rules.donations);
    report.excluded_donations = donations_in - donations.len();

    let spending_in = split.spending.len();
    let spending = apply_chain(split.spending, &rules.spending);
    report.excluded_spending = spending_in - spending.len();

    let label = rules.uncategorized_label.as_str();
    let donations = finish(donations, Stream::Donations, label, &mut report);
    let spending = finish(spending, Stream::Spending, label, &mut report);

    if !report.uncategorized.is_empty() {
        tracing::warn!(
            count = report.uncategorized.len(),
            label,
            "rows without a category after the rule chain"
        );
    }
    tracing::info!(
        donations = donations.len(),
        spending = spending.len(),
        excluded = report.excluded_donations + report.excluded_spending,
        ambiguous = report.ambiguous.len(),
        "categorized"
    );

    Categorized {
        donations,
        spending,
        report,
    }
}
