use std::io::IsTerminal;
use std::path::PathBuf;

use crate::error::Result;
use crate::rules::RuleSet;
use crate::settings::{load_settings, save_settings, settings_file_exists, shellexpand_path};

pub fn run(data_dir: Option<String>) -> Result<()> {
    let mut settings = load_settings();

    if let Some(dir) = data_dir {
        settings.data_dir = shellexpand_path(&dir);
    } else if !settings_file_exists() && std::io::stdin().is_terminal() {
        // First run, prompt for data dir
        println!("Data directory [{}]: ", settings.data_dir);
        let mut input = String::new();
        std::io::stdin().read_line(&mut input).ok();
        let chosen = input.trim();
        if !chosen.is_empty() {
            settings.data_dir = shellexpand_path(chosen);
        }
    }

    let resolved = PathBuf::from(&settings.data_dir);
    std::fs::create_dir_all(resolved.join("tables"))?;

    let rules_path = resolved.join("rules.toml");
    if !rules_path.exists() {
        std::fs::write(&rules_path, RuleSet::builtin_source())?;
        println!("Wrote default rules to {}", rules_path.display());
    }
    if settings.rules_path.is_none() {
        settings.rules_path = Some(rules_path.to_string_lossy().to_string());
    }

    save_settings(&settings)?;
    tracing::info!(data_dir = %resolved.display(), "settings saved");

    println!("Initialized fundledger at {}", resolved.display());
    Ok(())
}
