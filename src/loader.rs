use std::path::Path;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sha2::{Digest, Sha256};

use crate::error::{FundError, Result};
use crate::models::Transaction;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Parse a signed amount: optional sign, integer digits, optional `.` fraction
/// and exponent. `,`, space and no-break space are accepted only as 3-digit
/// thousands grouping, so decimal-comma input such as `1,5` is rejected rather
/// than misread.
pub fn parse_amount(raw: &str) -> Option<Decimal> {
    let s = raw.trim().trim_matches('"').trim();
    let (sign, body) = match s.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", s.strip_prefix('+').unwrap_or(s)),
    };
    let (mantissa, exponent) = match body.find(|c: char| c == 'e' || c == 'E') {
        Some(i) => (&body[..i], Some(&body[i + 1..])),
        None => (body, None),
    };
    let (int_part, frac) = match mantissa.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (mantissa, None),
    };

    let digits = match (int_part.is_empty(), frac) {
        (true, Some(_)) => "0".to_string(),
        _ => grouped_digits(int_part)?,
    };
    let mut text = format!("{sign}{digits}");
    if let Some(f) = frac {
        if !all_digits(f) {
            return None;
        }
        text.push('.');
        text.push_str(f);
    }
    match exponent {
        None => Decimal::from_str(&text).ok(),
        Some(exp) => {
            let unsigned = exp.strip_prefix(['-', '+']).unwrap_or(exp);
            if !all_digits(unsigned) {
                return None;
            }
            Decimal::from_scientific(&format!("{text}e{exp}")).ok()
        }
    }
}

fn all_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// Integer digits with optional thousands grouping: a leading group of 1-3
/// digits followed by groups of exactly 3.
fn grouped_digits(int_part: &str) -> Option<String> {
    let mut groups = int_part.split([',', ' ', '\u{a0}']);
    let first = groups.next()?;
    let rest: Vec<&str> = groups.collect();
    if rest.is_empty() {
        return all_digits(first).then(|| first.to_string());
    }
    if first.len() > 3 || !all_digits(first) {
        return None;
    }
    if !rest.iter().all(|g| g.len() == 3 && all_digits(g)) {
        return None;
    }
    Some(std::iter::once(first).chain(rest).collect())
}

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d.%m.%Y", "%m/%d/%Y"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%d.%m.%Y %H:%M"];

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(raw, f).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|f| chrono::NaiveDateTime::parse_from_str(raw, f).ok())
                .map(|dt| dt.date())
        })
}

#[cfg(any(feature = "xlsx", test))]
pub fn excel_serial_to_date(serial: f64) -> String {
    // Excel epoch is 1899-12-30 (accounting for the 1900 leap year bug)
    NaiveDate::from_ymd_opt(1899, 12, 30)
        .and_then(|base| base.checked_add_days(chrono::Days::new(serial.max(0.0) as u64)))
        .map(|date| date.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

pub fn file_checksum(file_path: &Path) -> Result<String> {
    let data = std::fs::read(file_path)?;
    let mut hasher = Sha256::new();
    hasher.update(&data);
    Ok(hex::encode(hasher.finalize()))
}

/// Accounts and commentary: surrounding whitespace is dropped and a blank or
/// `nan` cell is absent.
fn non_empty(field: Option<&str>) -> Option<String> {
    field
        .map(str::trim)
        .filter(|s| !s.is_empty() && *s != "nan")
        .map(str::to_string)
}

/// Category labels are matched exactly by the rule tables, so they are kept
/// verbatim. Only a blank or `nan` cell becomes the empty label.
fn label(field: Option<&str>) -> String {
    match field {
        Some(s) if !s.trim().is_empty() && s != "nan" => s.to_string(),
        _ => String::new(),
    }
}

// ---------------------------------------------------------------------------
// Column layout
// ---------------------------------------------------------------------------

/// Positions of the ledger columns, located by header name.
#[derive(Debug, Clone, Copy)]
struct Columns {
    date: usize,
    uah: usize,
    to_account: Option<usize>,
    from_account: Option<usize>,
    category: Option<usize>,
    subcategory: Option<usize>,
    commentary: Option<usize>,
}

impl Columns {
    fn from_headers<'a>(headers: impl Iterator<Item = &'a str>) -> Result<Self> {
        let names: Vec<String> = headers
            .map(|h| h.trim().trim_start_matches('\u{feff}').to_string())
            .collect();
        let find = |name: &str| names.iter().position(|h| h.eq_ignore_ascii_case(name));
        let date = find("Date").ok_or_else(|| FundError::load(1, "missing required column 'Date'"))?;
        let uah = find("UAH").ok_or_else(|| FundError::load(1, "missing required column 'UAH'"))?;
        Ok(Self {
            date,
            uah,
            to_account: find("To Account"),
            from_account: find("From Account"),
            category: find("Category"),
            subcategory: find("Subcategory"),
            commentary: find("Commentary"),
        })
    }

    fn build<'a>(&self, line: usize, get: impl Fn(usize) -> Option<&'a str>) -> Result<Transaction> {
        let raw_date = get(self.date).unwrap_or("");
        let date = parse_date(raw_date)
            .ok_or_else(|| FundError::load(line, format!("unparseable date '{raw_date}'")))?;
        let raw_amount = get(self.uah).unwrap_or("");
        let uah = parse_amount(raw_amount)
            .ok_or_else(|| FundError::load(line, format!("non-numeric amount '{raw_amount}'")))?;
        let col = |idx: Option<usize>| idx.and_then(&get);
        Ok(Transaction {
            line,
            date,
            uah,
            to_account: non_empty(col(self.to_account)),
            from_account: non_empty(col(self.from_account)),
            category: label(col(self.category)),
            subcategory: label(col(self.subcategory)),
            commentary: non_empty(col(self.commentary)),
        })
    }
}

// ---------------------------------------------------------------------------
// load_ledger
// ---------------------------------------------------------------------------

/// Load the ledger export. Any row with a bad date or amount fails the whole load.
pub fn load_ledger(file_path: &Path, limit: Option<usize>) -> Result<Vec<Transaction>> {
    #[cfg(feature = "xlsx")]
    if file_path
        .extension()
        .map_or(false, |e| e.eq_ignore_ascii_case("xlsx"))
    {
        return load_xlsx(file_path, limit);
    }

    let file = std::fs::File::open(file_path).map_err(|e| {
        FundError::Other(format!("Cannot open ledger {}: {e}", file_path.display()))
    })?;
    let txns = read_csv(std::io::BufReader::new(file), limit)?;
    tracing::info!(rows = txns.len(), path = %file_path.display(), "ledger loaded");
    Ok(txns)
}

pub fn read_csv<R: std::io::Read>(reader: R, limit: Option<usize>) -> Result<Vec<Transaction>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);
    let columns = Columns::from_headers(rdr.headers()?.iter())?;

    let mut rows = Vec::new();
    for result in rdr.records() {
        if limit.is_some_and(|n| rows.len() >= n) {
            break;
        }
        let record = result?;
        if record.iter().all(|f| f.trim().is_empty()) {
            continue;
        }
        let line = record.position().map_or(rows.len() + 2, |p| p.line() as usize);
        rows.push(columns.build(line, |i| record.get(i))?);
    }
    Ok(rows)
}

// ---------------------------------------------------------------------------
// XLSX ledgers (feature-gated)
// ---------------------------------------------------------------------------

#[cfg(feature = "xlsx")]
fn load_xlsx(file_path: &Path, limit: Option<usize>) -> Result<Vec<Transaction>> {
    use calamine::{Data, Reader};

    let mut workbook = calamine::open_workbook_auto(file_path)
        .map_err(|e| FundError::Other(format!("Failed to open XLSX: {e}")))?;
    let sheet = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| FundError::Other("XLSX ledger has no worksheets".into()))?;
    let range = workbook
        .worksheet_range(&sheet)
        .map_err(|e| FundError::Other(format!("Failed to read sheet '{sheet}': {e}")))?;

    let cell_text = |cell: &Data| -> String {
        match cell {
            Data::String(s) => s.clone(),
            Data::Float(f) => f.to_string(),
            Data::Int(i) => i.to_string(),
            Data::DateTime(dt) => excel_serial_to_date(dt.as_f64()),
            Data::DateTimeIso(s) => s.clone(),
            Data::Bool(b) => b.to_string(),
            _ => String::new(),
        }
    };

    let mut rows_iter = range.rows();
    let header: Vec<String> = rows_iter
        .next()
        .map(|r| r.iter().map(cell_text).collect())
        .unwrap_or_default();
    let columns = Columns::from_headers(header.iter().map(String::as_str))?;

    let mut txns = Vec::new();
    for (idx, row) in rows_iter.enumerate() {
        if limit.is_some_and(|n| txns.len() >= n) {
            break;
        }
        let cells: Vec<String> = row.iter().map(cell_text).collect();
        if cells.iter().all(|c| c.trim().is_empty()) {
            continue;
        }
        txns.push(columns.build(idx + 2, |i| cells.get(i).map(String::as_str))?);
    }
    tracing::info!(rows = txns.len(), path = %file_path.display(), "ledger loaded");
    Ok(txns)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "Date,UAH,To Account,From Account,Category,Subcategory,Commentary\n";

    fn write_ledger(dir: &Path, body: &str) -> std::path::PathBuf {
        let path = dir.join("ledger.csv");
        std::fs::write(&path, format!("{HEADER}{body}")).unwrap();
        path
    }

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("1,234.56"), Some(d("1234.56")));
        assert_eq!(parse_amount("\"500.00\""), Some(d("500")));
        assert_eq!(parse_amount("  -42.50  "), Some(d("-42.5")));
        assert_eq!(parse_amount("150 000"), Some(d("150000")));
        assert_eq!(parse_amount("1e3"), Some(d("1000")));
        assert_eq!(parse_amount("+7"), Some(d("7")));
        assert_eq!(parse_amount(".5"), Some(d("0.5")));
        assert_eq!(parse_amount("1,234,567"), Some(d("1234567")));
        assert_eq!(parse_amount("not_a_number"), None);
        assert_eq!(parse_amount(""), None);
    }

    #[test]
    fn test_parse_amount_rejects_decimal_comma() {
        assert_eq!(parse_amount("1,5"), None);
        assert_eq!(parse_amount("1.234,56"), None);
        assert_eq!(parse_amount("12,34"), None);
        assert_eq!(parse_amount("1234,567"), None);
        assert_eq!(parse_amount("1,234."), None);
        assert_eq!(parse_amount("1e"), None);
        assert_eq!(parse_amount("-"), None);
    }

    #[test]
    fn test_decimal_comma_amount_fails_load() {
        let data = format!("{HEADER}2023-03-01,\"1,5\",A,,,,\n");
        match read_csv(data.as_bytes(), None).unwrap_err() {
            FundError::Load { line, message } => {
                assert_eq!(line, 2);
                assert!(message.contains("1,5"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2023, 3, 1);
        assert_eq!(parse_date("2023-03-01"), expected);
        assert_eq!(parse_date("01.03.2023"), expected);
        assert_eq!(parse_date("03/01/2023"), expected);
        assert_eq!(parse_date("2023-03-01 14:22:05"), expected);
        assert_eq!(parse_date("2023-02-30"), None);
        assert_eq!(parse_date("yesterday"), None);
    }

    #[test]
    fn test_load_normalizes_missing_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_ledger(dir.path(), "2023-03-01,150000,ПриватБанк PLN,,,,\n");
        let rows = load_ledger(&path, None).unwrap();
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.line, 2);
        assert_eq!(row.uah, d("150000"));
        assert_eq!(row.to_account.as_deref(), Some("ПриватБанк PLN"));
        assert_eq!(row.from_account, None);
        assert_eq!(row.category, "");
        assert_eq!(row.subcategory, "");
        assert_eq!(row.commentary, None);
    }

    #[test]
    fn test_labels_kept_verbatim() {
        let data = format!("{HEADER}2023-03-01,5, A ,, Донати ,nan, note \n");
        let row = &read_csv(data.as_bytes(), None).unwrap()[0];
        assert_eq!(row.to_account.as_deref(), Some("A"));
        assert_eq!(row.category, " Донати ");
        assert_eq!(row.subcategory, "");
        assert_eq!(row.commentary.as_deref(), Some("note"));
    }

    #[test]
    fn test_load_respects_limit() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_ledger(
            dir.path(),
            "2023-03-01,1,A,,Донати,,\n2023-03-02,2,A,,Донати,,\n2023-03-03,3,A,,Донати,,\n",
        );
        assert_eq!(load_ledger(&path, Some(2)).unwrap().len(), 2);
        assert_eq!(load_ledger(&path, None).unwrap().len(), 3);
    }

    #[test]
    fn test_bad_amount_fails_whole_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_ledger(dir.path(), "2023-03-01,100,A,,,,\n2023-03-02,abc,A,,,,\n");
        let err = load_ledger(&path, None).unwrap_err();
        match err {
            FundError::Load { line, message } => {
                assert_eq!(line, 3);
                assert!(message.contains("abc"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_bad_date_fails_whole_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_ledger(dir.path(), "someday,100,A,,,,\n");
        assert!(matches!(load_ledger(&path, None), Err(FundError::Load { line: 2, .. })));
    }

    #[test]
    fn test_missing_required_column() {
        let data = "Date,Amount\n2023-03-01,5\n";
        let err = read_csv(data.as_bytes(), None).unwrap_err();
        assert!(err.to_string().contains("UAH"));
    }

    #[test]
    fn test_columns_found_by_name_in_any_order() {
        let data = "Commentary,UAH,Date,From Account\nвода,-20,2023-05-05,Приват Літай\n";
        let rows = read_csv(data.as_bytes(), None).unwrap();
        assert_eq!(rows[0].from_account.as_deref(), Some("Приват Літай"));
        assert_eq!(rows[0].commentary.as_deref(), Some("вода"));
        assert_eq!(rows[0].to_account, None);
    }

    #[test]
    fn test_blank_lines_skipped() {
        let data = format!("{HEADER}2023-03-01,5,A,,,,\n,,,,,,\n");
        assert_eq!(read_csv(data.as_bytes(), None).unwrap().len(), 1);
    }

    #[test]
    fn test_excel_serial_to_date() {
        assert_eq!(excel_serial_to_date(44986.0), "2023-03-01");
    }

    #[test]
    fn test_file_checksum_stable() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_ledger(dir.path(), "2023-03-01,5,A,,,,\n");
        let a = file_checksum(&path).unwrap();
        let b = file_checksum(&path).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }
}
