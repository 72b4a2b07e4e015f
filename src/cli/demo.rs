use std::path::PathBuf;

use chrono::{Days, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::cli::refresh::{format_outcome, refresh};
use crate::cli::RefreshArgs;
use crate::error::{FundError, Result};
use crate::settings::{load_settings, save_settings, shellexpand_path};

const SEED: u64 = 0x5EED_F00D;
const DEMO_DAYS: u64 = 120;
const LEDGER_FILE: &str = "demo-ledger.csv";

/// Incoming accounts with the category/subcategory the bank export would carry.
const DONATION_SOURCES: &[(&str, &str, &str, &str)] = &[
    ("ПриватБанк Загальний рахунок зборів", "Донати", "Донати Загальні", "Переказ від благодійника"),
    ("Приват Літай", "Донати", "Донати Літай", "Літай збір"),
    ("Вікторі Дронс", "Донати", "", "Victory Drones"),
    ("ПриватБанк PLN", "Income categories", "", "From UK ONLINE GIVING FOUNDATION"),
    ("ПриватБанк Адмін рахунок", "Донати", "Адмін Донати", "Адмін внесок"),
    ("Приват На захисті краси України", "Гранти", "Грант МЛПК", "MOBILE LAUNDRY SHOWER UNITS"),
];

const SPENDING_SINKS: &[(&str, &str, &str, &str)] = &[
    ("Приват Літай", "Закупівлі", "Закупівля Дрони", "Оплата за дрони"),
    ("ПриватБанк Адмін рахунок", "Taxes", "", "Податки"),
    ("ПриватБанк Загальний рахунок зборів", "Закупівлі", "Закупівля Антени", "Антени"),
    ("ПриватБанк Загальний рахунок зборів", "Закупівлі", "Закупівля генераторне обладнання", "Генератори"),
    ("ПриватБанк Загальний рахунок зборів", "Комісія банку", "", "Комісія"),
    ("Вікторі Дронс", "Suppliers and Contractors", "", "Підрядник"),
];

const DONORS: &[&str] = &[
    "ТОВ РУШ",
    "UNITED HELP UKRAINE",
    "АМІК УКРАЇНА",
    "ФОНД \"ДЯКУЮ ТОБІ\"",
];

fn start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 2, 15).unwrap_or_default()
}

/// A reproducible ledger export covering the first months after launch.
pub fn generate_ledger(seed: u64) -> Result<String> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record([
        "Date",
        "UAH",
        "To Account",
        "From Account",
        "Category",
        "Subcategory",
        "Commentary",
    ])?;

    for day in 0..DEMO_DAYS {
        let date = start_date() + Days::new(day);
        let date = date.format("%Y-%m-%d").to_string();

        for _ in 0..rng.gen_range(1..=4) {
            let (account, cat, sub, note) = DONATION_SOURCES[rng.gen_range(0..DONATION_SOURCES.len())];
            let uah = (rng.gen_range(100..20_000) * 10).to_string();
            wtr.write_record([date.as_str(), uah.as_str(), account, "", cat, sub, note])?;
        }

        // One large named donation every couple of weeks
        if day % 13 == 5 {
            let donor = DONORS[rng.gen_range(0..DONORS.len())];
            let uah = (rng.gen_range(150..900) * 1_000).to_string();
            let note = format!("{donor} платіж {}", rng.gen_range(1000..9999));
            wtr.write_record([
                date.as_str(),
                uah.as_str(),
                "ПриватБанк Загальний рахунок зборів",
                "",
                "Донати",
                "",
                note.as_str(),
            ])?;
        }

        if rng.gen_bool(0.6) {
            let (account, cat, sub, note) = SPENDING_SINKS[rng.gen_range(0..SPENDING_SINKS.len())];
            let uah = (-(rng.gen_range(50..15_000) * 10)).to_string();
            wtr.write_record([date.as_str(), uah.as_str(), "", account, cat, sub, note])?;
        }

        // Internal transfers are excluded by the rules
        if day % 30 == 0 {
            wtr.write_record([
                date.as_str(),
                "-50000",
                "",
                "ПриватБанк Загальний рахунок зборів",
                "Переказ",
                "",
                "Переказ між рахунками організації",
            ])?;
        }
    }

    let bytes = wtr.into_inner().map_err(|e| FundError::Other(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| FundError::Other(e.to_string()))
}

pub fn run(data_dir: Option<String>) -> Result<()> {
    let mut settings = load_settings();
    if let Some(dir) = data_dir {
        settings.data_dir = shellexpand_path(&dir);
    }
    let dir = PathBuf::from(&settings.data_dir);
    std::fs::create_dir_all(&dir)?;

    let ledger = dir.join(LEDGER_FILE);
    std::fs::write(&ledger, generate_ledger(SEED)?)?;
    settings.ledger_path = Some(ledger.to_string_lossy().to_string());
    save_settings(&settings)?;
    tracing::info!(ledger = %ledger.display(), "demo ledger written");

    let outcome = refresh(&settings, &RefreshArgs::default())?;
    println!("Demo ledger written to {}\n", ledger.display());
    println!("{}", format_outcome(&outcome));
    Ok(())
}
