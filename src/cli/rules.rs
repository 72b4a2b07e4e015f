use std::path::{Path, PathBuf};

use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::resolve_path;
use crate::error::Result;
use crate::models::Stream;
use crate::rules::{RuleSet, StreamRules};
use crate::settings::load_settings;

fn stream_table(rules: &StreamRules) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["Step", "Match", "Result"]);
    for phrase in &rules.exclude_commentary {
        table.add_row(vec![Cell::new("exclude"), Cell::new(format!("commentary ~ {phrase}")), Cell::new("dropped")]);
    }
    for cat in &rules.exclude_categories {
        table.add_row(vec![Cell::new("exclude"), Cell::new(format!("category = {cat}")), Cell::new("dropped")]);
    }
    for placeholder in &rules.promote_subcategory {
        table.add_row(vec![
            Cell::new("promote"),
            Cell::new(format!("category = {placeholder}")),
            Cell::new("subcategory"),
        ]);
    }
    for remap in &rules.remap {
        table.add_row(vec![
            Cell::new("remap"),
            Cell::new(remap.from.join(" | ")),
            Cell::new(&remap.to),
        ]);
    }
    for rep in &rules.replacements {
        let to = if rep.to.is_empty() { "(removed)" } else { rep.to.as_str() };
        table.add_row(vec![Cell::new("replace"), Cell::new(&rep.from), Cell::new(to)]);
    }
    for ov in &rules.account_overrides {
        table.add_row(vec![
            Cell::new("account"),
            Cell::new(format!("account = {}", ov.account)),
            Cell::new(&ov.category),
        ]);
    }
    for group in &rules.collapse {
        table.add_row(vec![
            Cell::new("collapse"),
            Cell::new(group.fragments.join(" | ")),
            Cell::new(&group.label),
        ]);
    }
    for ov in &rules.commentary_overrides {
        table.add_row(vec![
            Cell::new("commentary"),
            Cell::new(format!("commentary ~ {}", ov.pattern)),
            Cell::new(&ov.category),
        ]);
    }
    table
}

pub fn format_rules(rules: &RuleSet, source: &str) -> String {
    let mut out = format!("Rules from {source}\n");
    for stream in [Stream::Donations, Stream::Spending] {
        out.push_str(&format!(
            "\n{} ({} rules)\n{}\n",
            stream.label().bold(),
            rules.rule_count(stream),
            stream_table(rules.stream(stream))
        ));
    }
    let donors = &rules.donors;
    out.push_str(&format!(
        "\n{} min total {}, {} exclusions, {} aliases\n",
        "Donors:".bold(),
        donors.min_total,
        donors.exclude.len(),
        donors.aliases.len()
    ));
    out.push_str(&format!("Uncategorized label: {}", rules.uncategorized_label));
    out
}

pub fn show(rules_flag: Option<PathBuf>) -> Result<()> {
    let settings = load_settings();
    let path = resolve_path(rules_flag.as_deref(), settings.rules());
    let rules = RuleSet::resolve(path.as_deref())?;
    let source = path
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "built-in tables".to_string());
    println!("{}", format_rules(&rules, &source));
    Ok(())
}

pub fn check(path: &Path) -> Result<()> {
    let rules = RuleSet::load(path)?;
    println!(
        "{} {}: {} donation rules, {} spending rules, {} donor aliases",
        "OK".green(),
        path.display(),
        rules.rule_count(Stream::Donations),
        rules.rule_count(Stream::Spending),
        rules.donors.aliases.len()
    );
    Ok(())
}
