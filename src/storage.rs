use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{FundError, Result};
use crate::loader::file_checksum;
use crate::models::{SummaryRow, SummaryTables};

pub const MANIFEST_FILE: &str = "manifest.json";

/// Table names double as file stems. Order is the order tables are written.
pub const TABLE_NAMES: [&str; 8] = [
    "large_donations_by_category",
    "large_spending_by_category",
    "donations_below_large_by_category",
    "spending_below_large_by_category",
    "donations_total",
    "spending_total",
    "donations_total_by_category",
    "spending_total_by_category",
];

fn has_category(name: &str) -> bool {
    !name.ends_with("_total")
}

fn table<'a>(tables: &'a SummaryTables, name: &str) -> &'a [SummaryRow] {
    match name {
        "large_donations_by_category" => &tables.large_donations_by_category,
        "large_spending_by_category" => &tables.large_spending_by_category,
        "donations_below_large_by_category" => &tables.donations_below_large_by_category,
        "spending_below_large_by_category" => &tables.spending_below_large_by_category,
        "donations_total" => &tables.donations_total,
        "spending_total" => &tables.spending_total,
        "donations_total_by_category" => &tables.donations_total_by_category,
        "spending_total_by_category" => &tables.spending_total_by_category,
        _ => &[],
    }
}

fn table_mut<'a>(tables: &'a mut SummaryTables, name: &str) -> Option<&'a mut Vec<SummaryRow>> {
    match name {
        "large_donations_by_category" => Some(&mut tables.large_donations_by_category),
        "large_spending_by_category" => Some(&mut tables.large_spending_by_category),
        "donations_below_large_by_category" => Some(&mut tables.donations_below_large_by_category),
        "spending_below_large_by_category" => Some(&mut tables.spending_below_large_by_category),
        "donations_total" => Some(&mut tables.donations_total),
        "spending_total" => Some(&mut tables.spending_total),
        "donations_total_by_category" => Some(&mut tables.donations_total_by_category),
        "spending_total_by_category" => Some(&mut tables.spending_total_by_category),
        _ => None,
    }
}

pub fn table_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{name}.csv"))
}

// ---------------------------------------------------------------------------
// Write
// ---------------------------------------------------------------------------

fn write_table(path: &Path, rows: &[SummaryRow], with_category: bool) -> Result<()> {
    let tmp = path.with_extension("csv.tmp");
    {
        let mut wtr = csv::Writer::from_path(&tmp)?;
        if with_category {
            wtr.write_record(["Date", "Category", "UAH"])?;
        } else {
            wtr.write_record(["Date", "UAH"])?;
        }
        for row in rows {
            let date = row.date.format("%Y-%m-%d").to_string();
            let uah = row.uah.normalize().to_string();
            if with_category {
                wtr.write_record([date.as_str(), row.category_name(), uah.as_str()])?;
            } else {
                wtr.write_record([date.as_str(), uah.as_str()])?;
            }
        }
        wtr.flush()?;
    }
    std::fs::rename(&tmp, path)?;
    Ok(())
}

/// Write all eight tables into `dir`, replacing whatever was there.
pub fn write_tables(dir: &Path, tables: &SummaryTables) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;
    let mut written = Vec::with_capacity(TABLE_NAMES.len());
    for name in TABLE_NAMES {
        let path = table_path(dir, name);
        let rows = table(tables, name);
        write_table(&path, rows, has_category(name))?;
        tracing::debug!(table = name, rows = rows.len(), "table written");
        written.push(path);
    }
    tracing::info!(dir = %dir.display(), "summary tables written");
    Ok(written)
}

// ---------------------------------------------------------------------------
// Read
// ---------------------------------------------------------------------------

fn read_table(path: &Path, with_category: bool) -> Result<Vec<SummaryRow>> {
    if !path.exists() {
        return Err(FundError::MissingTable(path.to_path_buf()));
    }
    let mut rdr = csv::Reader::from_path(path)?;
    let headers = rdr.headers()?.clone();
    let expected: &[&str] = if with_category {
        &["Date", "Category", "UAH"]
    } else {
        &["Date", "UAH"]
    };
    if headers.iter().ne(expected.iter().copied()) {
        return Err(FundError::Other(format!(
            "Malformed table {}: expected header {}, found {}",
            path.display(),
            expected.join(","),
            headers.iter().collect::<Vec<_>>().join(",")
        )));
    }
    let mut rows = Vec::new();
    for result in rdr.deserialize::<SummaryRow>() {
        let mut row = result?;
        if with_category && row.category.is_none() {
            row.category = Some(String::new());
        }
        rows.push(row);
    }
    Ok(rows)
}

pub fn read_tables(dir: &Path) -> Result<SummaryTables> {
    let mut tables = SummaryTables::default();
    for name in TABLE_NAMES {
        let rows = read_table(&table_path(dir, name), has_category(name))?;
        if let Some(slot) = table_mut(&mut tables, name) {
            *slot = rows;
        }
    }
    Ok(tables)
}

// ---------------------------------------------------------------------------
// Manifest
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableEntry {
    pub rows: usize,
    pub sha256: String,
}

/// What a refresh was built from, written next to the tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub ledger: String,
    pub ledger_sha256: String,
    pub rules_sha256: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub threshold: Decimal,
    pub tables: BTreeMap<String, TableEntry>,
}

impl Manifest {
    pub fn build(
        dir: &Path,
        ledger: &Path,
        rules_sha256: String,
        threshold: Decimal,
        tables: &SummaryTables,
    ) -> Result<Self> {
        let mut entries = BTreeMap::new();
        for name in TABLE_NAMES {
            entries.insert(
                name.to_string(),
                TableEntry {
                    rows: table(tables, name).len(),
                    sha256: file_checksum(&table_path(dir, name))?,
                },
            );
        }
        Ok(Self {
            ledger: ledger.to_string_lossy().to_string(),
            ledger_sha256: file_checksum(ledger)?,
            rules_sha256,
            threshold,
            tables: entries,
        })
    }

    pub fn save(&self, dir: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(dir.join(MANIFEST_FILE), format!("{json}\n"))?;
        Ok(())
    }

    pub fn load(dir: &Path) -> Option<Self> {
        let content = std::fs::read_to_string(dir.join(MANIFEST_FILE)).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// True when the ledger on disk no longer matches the one the tables came from.
    pub fn is_stale(&self) -> bool {
        match file_checksum(Path::new(&self.ledger)) {
            Ok(sum) => sum != self.ledger_sha256,
            Err(_) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::str::FromStr;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn sample_tables() -> SummaryTables {
        SummaryTables {
            donations_total: vec![SummaryRow::dated(date("2023-03-01"), dec("150020.50"))],
            spending_total: vec![SummaryRow::dated(date("2023-03-02"), dec("-12.5"))],
            donations_total_by_category: vec![
                SummaryRow::categorized(date("2023-03-01"), "Загальні донати", dec("150000")),
                SummaryRow::categorized(date("2023-03-01"), "Літай, дрони", dec("20.50")),
            ],
            spending_total_by_category: vec![SummaryRow::categorized(
                date("2023-03-02"),
                "Адмін",
                dec("-12.5"),
            )],
            large_donations_by_category: vec![SummaryRow::categorized(
                date("2023-03-01"),
                "Загальні донати",
                dec("150000"),
            )],
            large_spending_by_category: vec![],
            donations_below_large_by_category: vec![SummaryRow::categorized(
                date("2023-03-01"),
                "Літай, дрони",
                dec("20.50"),
            )],
            spending_below_large_by_category: vec![SummaryRow::categorized(
                date("2023-03-02"),
                "Адмін",
                dec("-12.5"),
            )],
        }
    }

    #[test]
    fn test_write_then_read_reproduces_tables() {
        let dir = tempfile::tempdir().unwrap();
        let tables = sample_tables();
        let written = write_tables(dir.path(), &tables).unwrap();
        assert_eq!(written.len(), 8);
        let loaded = read_tables(dir.path()).unwrap();
        assert_eq!(loaded, tables);
    }

    #[test]
    fn test_headers_and_utf8_content() {
        let dir = tempfile::tempdir().unwrap();
        write_tables(dir.path(), &sample_tables()).unwrap();
        let total = std::fs::read_to_string(table_path(dir.path(), "donations_total")).unwrap();
        assert_eq!(total, "Date,UAH\n2023-03-01,150020.5\n");
        let by_cat =
            std::fs::read_to_string(table_path(dir.path(), "large_donations_by_category")).unwrap();
        assert_eq!(by_cat, "Date,Category,UAH\n2023-03-01,Загальні донати,150000\n");
    }

    #[test]
    fn test_empty_table_still_has_header() {
        let dir = tempfile::tempdir().unwrap();
        write_tables(dir.path(), &sample_tables()).unwrap();
        let large =
            std::fs::read_to_string(table_path(dir.path(), "large_spending_by_category")).unwrap();
        assert_eq!(large, "Date,Category,UAH\n");
    }

    #[test]
    fn test_rewrite_is_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        write_tables(dir.path(), &sample_tables()).unwrap();
        let first: Vec<Vec<u8>> = TABLE_NAMES
            .iter()
            .map(|n| std::fs::read(table_path(dir.path(), n)).unwrap())
            .collect();
        write_tables(dir.path(), &sample_tables()).unwrap();
        let second: Vec<Vec<u8>> = TABLE_NAMES
            .iter()
            .map(|n| std::fs::read(table_path(dir.path(), n)).unwrap())
            .collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_table_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        write_tables(dir.path(), &sample_tables()).unwrap();
        std::fs::remove_file(table_path(dir.path(), "spending_total")).unwrap();
        match read_tables(dir.path()) {
            Err(FundError::MissingTable(p)) => assert!(p.ends_with("spending_total.csv")),
            other => panic!("expected MissingTable, got {other:?}"),
        }
    }

    #[test]
    fn test_malformed_table_is_error() {
        let dir = tempfile::tempdir().unwrap();
        write_tables(dir.path(), &sample_tables()).unwrap();
        std::fs::write(
            table_path(dir.path(), "donations_total"),
            "Date,UAH\n2023-03-01,lots\n",
        )
        .unwrap();
        assert!(read_tables(dir.path()).is_err());

        std::fs::write(table_path(dir.path(), "donations_total"), "When,How much\n").unwrap();
        let err = read_tables(dir.path()).unwrap_err();
        assert!(err.to_string().contains("Malformed table"));
    }

    #[test]
    fn test_manifest_roundtrip_and_staleness() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = dir.path().join("ledger.csv");
        std::fs::write(&ledger, "Date,UAH\n2023-03-01,1\n").unwrap();
        let tables = sample_tables();
        write_tables(dir.path(), &tables).unwrap();

        let manifest =
            Manifest::build(dir.path(), &ledger, "builtin".into(), dec("100000"), &tables).unwrap();
        manifest.save(dir.path()).unwrap();
        let loaded = Manifest::load(dir.path()).unwrap();
        assert_eq!(loaded, manifest);
        assert_eq!(loaded.tables["donations_total_by_category"].rows, 2);
        assert!(!loaded.is_stale());

        std::fs::write(&ledger, "Date,UAH\n2023-03-01,2\n").unwrap();
        assert!(loaded.is_stale());
    }
}
