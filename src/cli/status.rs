use colored::Colorize;

use crate::error::Result;
use crate::settings::{load_settings, settings_path, Settings};
use crate::storage::{table_path, Manifest, TABLE_NAMES};

pub fn format_status(settings: &Settings) -> String {
    let mut out = String::new();
    let or_unset = |v: Option<&str>| v.unwrap_or("(not set)").to_string();

    out.push_str(&format!("Settings:     {}\n", settings_path().display()));
    out.push_str(&format!("Data dir:     {}\n", settings.data_dir));
    out.push_str(&format!("Ledger:       {}\n", or_unset(settings.ledger_path.as_deref())));
    out.push_str(&format!(
        "Rules:        {}\n",
        settings.rules_path.as_deref().unwrap_or("(built-in)")
    ));
    out.push_str(&format!("Threshold:    {}\n", settings.threshold));
    out.push_str(&format!("Launch date:  {}\n", settings.launch_date));

    let dir = settings.tables_dir();
    let missing: Vec<&str> = TABLE_NAMES
        .iter()
        .copied()
        .filter(|name| !table_path(&dir, name).exists())
        .collect();
    out.push('\n');
    out.push_str(&format!(
        "Tables:       {}/{} in {}\n",
        TABLE_NAMES.len() - missing.len(),
        TABLE_NAMES.len(),
        dir.display()
    ));
    for name in &missing {
        out.push_str(&format!("  {} {name}\n", "missing".red()));
    }

    match Manifest::load(&dir) {
        Some(manifest) => {
            let rows: usize = manifest.tables.values().map(|t| t.rows).sum();
            out.push_str(&format!("Built from:   {}\n", manifest.ledger));
            out.push_str(&format!("Rows written: {rows}\n"));
            if manifest.is_stale() {
                out.push_str(&format!(
                    "{}\n",
                    "Ledger changed since the last refresh. Run `fundledger refresh`.".yellow()
                ));
            } else {
                out.push_str(&format!("{}\n", "Tables are up to date.".green()));
            }
        }
        None if missing.len() == TABLE_NAMES.len() => {
            out.push_str("No tables yet. Run `fundledger refresh` to build them.\n");
        }
        None => {
            out.push_str(&format!("{}\n", "No manifest found; freshness unknown.".yellow()));
        }
    }
    out
}

pub fn run() -> Result<()> {
    let settings = load_settings();
    print!("{}", format_status(&settings));
    Ok(())
}
