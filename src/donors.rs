use std::collections::BTreeMap;

use regex::Regex;
use rust_decimal::Decimal;

use crate::categorizer::{exclude, split, RunParams, WorkingRow};
use crate::error::{FundError, Result};
use crate::models::Transaction;
use crate::reports::accumulate;
use crate::rules::{DonorRules, RuleSet};

#[derive(Debug, Clone, PartialEq)]
pub struct Donor {
    pub name: String,
    pub total: Decimal,
}

/// Canonical donor name for one row, or `None` when the row is excluded or
/// carries no commentary.
///
/// Exclusion phrases are checked against every text column. Aliases are
/// applied in order to the commentary as it is rewritten, so once a pattern
/// has replaced it, later patterns match against the new name.
fn donor_name(digits: &Regex, row: &WorkingRow, rules: &DonorRules) -> Option<String> {
    let stripped = digits.replace_all(&row.commentary, "");
    let columns = [
        row.account.as_str(),
        row.category.as_str(),
        row.subcategory.as_str(),
        &*stripped,
    ];
    if rules
        .exclude
        .iter()
        .any(|p| columns.iter().any(|c| c.contains(p.as_str())))
    {
        return None;
    }
    let name = rules.aliases.iter().fold(stripped.trim().to_string(), |name, alias| {
        if name.contains(alias.pattern.as_str()) {
            alias.name.clone()
        } else {
            name
        }
    });
    (!name.is_empty()).then_some(name)
}

/// Largest donors over the whole ledger.
///
/// Only single donations at or above `params.threshold` count towards a
/// donor's total, and only donors summing to at least `min_total` are kept.
pub fn top_donors(
    txns: &[Transaction],
    rules: &RuleSet,
    params: &RunParams,
    min_total: Decimal,
) -> Result<Vec<Donor>> {
    let digits = Regex::new(r"\d+").map_err(|e| FundError::Other(e.to_string()))?;
    let donations = exclude(
        split(txns, params).donations,
        &rules.donations.exclude_commentary,
        &rules.donations.exclude_categories,
    );

    let mut totals: BTreeMap<String, Decimal> = BTreeMap::new();
    for row in donations.iter().filter(|r| r.uah >= params.threshold) {
        if let Some(name) = donor_name(&digits, row, &rules.donors) {
            accumulate(totals.entry(name).or_default(), row.uah)?;
        }
    }

    let mut donors: Vec<Donor> = totals
        .into_iter()
        .filter(|(_, total)| *total >= min_total)
        .map(|(name, total)| Donor { name, total })
        .collect();
    donors.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.name.cmp(&b.name)));
    tracing::debug!(count = donors.len(), "top donors computed");
    Ok(donors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn donation(line: usize, uah: i64, commentary: &str) -> Transaction {
        Transaction {
            line,
            date: NaiveDate::from_ymd_opt(2023, 3, 1).unwrap(),
            uah: Decimal::from(uah),
            to_account: Some("ПриватБанк Загальний рахунок зборів".into()),
            from_account: None,
            category: "Донати".into(),
            subcategory: String::new(),
            commentary: Some(commentary.into()),
        }
    }

    fn params() -> RunParams {
        RunParams {
            threshold: Decimal::from(100_000),
            ..RunParams::default()
        }
    }

    #[test]
    fn test_aliases_and_digit_stripping_group_donors() {
        let rules = RuleSet::builtin().unwrap();
        let txns = vec![
            donation(2, 700_000, "ТОВ РУШ оплата 123"),
            donation(3, 600_000, "РУШ рахунок 77"),
            donation(4, 1_500_000, "UNITED HELP UKRAINE wire 2023"),
            donation(5, 50_000, "UNITED HELP UKRAINE small"),
        ];
        let donors = top_donors(&txns, &rules, &params(), Decimal::from(1_000_000)).unwrap();
        assert_eq!(
            donors,
            vec![
                Donor { name: "UNITED HELP UKRAINE".into(), total: Decimal::from(1_500_000) },
                Donor { name: "eva.ua".into(), total: Decimal::from(1_300_000) },
            ]
        );
    }

    #[test]
    fn test_excluded_phrases_and_min_total() {
        let rules = RuleSet::builtin().unwrap();
        let txns = vec![
            donation(2, 5_000_000, "Гривнi вiд продажу валюти"),
            donation(3, 2_000_000, "Луценко Ігор Вікторович"),
            donation(4, 900_000, "Someone Generous 42"),
        ];
        let donors = top_donors(&txns, &rules, &params(), Decimal::from(1_000_000)).unwrap();
        assert!(donors.is_empty());

        let donors = top_donors(&txns, &rules, &params(), Decimal::from(500_000)).unwrap();
        assert_eq!(donors.len(), 1);
        assert_eq!(donors[0].name, "Someone Generous");
    }

    #[test]
    fn test_aliases_fold_over_rewritten_commentary() {
        let rules = RuleSet::builtin().unwrap();
        // РУШ rewrites the text to eva.ua, so the later UNITED HELP UKRAINE
        // alias no longer matches.
        let txns = vec![donation(2, 2_000_000, "РУШ via UNITED HELP UKRAINE")];
        let donors = top_donors(&txns, &rules, &params(), Decimal::ONE).unwrap();
        assert_eq!(donors, vec![Donor { name: "eva.ua".into(), total: Decimal::from(2_000_000) }]);
    }

    #[test]
    fn test_exclusion_checks_every_text_column() {
        let rules = RuleSet::builtin().unwrap();
        let mut txn = donation(2, 2_000_000, "Someone");
        txn.subcategory = "Гривнi вiд продажу валюти".into();
        assert!(top_donors(&[txn], &rules, &params(), Decimal::ONE).unwrap().is_empty());
    }

    #[test]
    fn test_rows_without_commentary_are_skipped() {
        let rules = RuleSet::builtin().unwrap();
        let mut txn = donation(2, 2_000_000, "");
        txn.commentary = None;
        assert!(top_donors(&[txn], &rules, &params(), Decimal::ONE).unwrap().is_empty());
    }

    #[test]
    fn test_donor_total_out_of_range_is_error() {
        let rules = RuleSet::builtin().unwrap();
        let mut a = donation(2, 0, "Someone");
        a.uah = Decimal::MAX;
        let b = a.clone();
        let err = top_donors(&[a, b], &rules, &params(), Decimal::ONE).unwrap_err();
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn test_spending_rows_are_ignored() {
        let rules = RuleSet::builtin().unwrap();
        let mut txn = donation(2, 2_000_000, "РУШ");
        txn.to_account = None;
        txn.from_account = Some("Приват Літай".into());
        let donors = top_donors(&[txn], &rules, &params(), Decimal::ONE).unwrap();
        assert!(donors.is_empty());
    }
}
