use std::path::Path;

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::error::{FundError, Result};
use crate::models::Stream;

const BUILTIN_RULES: &str = include_str!("../rules/default.toml");

/// Rule tables for both streams, loaded from TOML.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleSet {
    #[serde(default = "default_uncategorized_label")]
    pub uncategorized_label: String,
    #[serde(default)]
    pub donations: StreamRules,
    #[serde(default)]
    pub spending: StreamRules,
    #[serde(default)]
    pub donors: DonorRules,
}

fn default_uncategorized_label() -> String {
    "Uncategorized".to_string()
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StreamRules {
    /// Literal phrases in Commentary marking internal transfers and FX bookkeeping.
    #[serde(default)]
    pub exclude_commentary: Vec<String>,
    #[serde(default)]
    pub exclude_categories: Vec<String>,
    /// Placeholder categories replaced by the row's Subcategory.
    #[serde(default)]
    pub promote_subcategory: Vec<String>,
    #[serde(default)]
    pub remap: Vec<Remap>,
    #[serde(default)]
    pub replacements: Vec<Replacement>,
    #[serde(default)]
    pub account_overrides: Vec<AccountOverride>,
    #[serde(default)]
    pub collapse: Vec<Collapse>,
    #[serde(default)]
    pub commentary_overrides: Vec<CommentaryOverride>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Remap {
    pub from: Vec<String>,
    pub to: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Replacement {
    pub from: String,
    #[serde(default)]
    pub to: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AccountOverride {
    pub account: String,
    pub category: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Collapse {
    pub fragments: Vec<String>,
    pub label: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommentaryOverride {
    pub pattern: String,
    pub category: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DonorRules {
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default)]
    pub aliases: Vec<DonorAlias>,
    #[serde(default = "default_min_total")]
    pub min_total: Decimal,
}

impl Default for DonorRules {
    fn default() -> Self {
        Self {
            exclude: Vec::new(),
            aliases: Vec::new(),
            min_total: default_min_total(),
        }
    }
}

fn default_min_total() -> Decimal {
    Decimal::from(1_000_000)
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DonorAlias {
    pub pattern: String,
    pub name: String,
}

impl RuleSet {
    pub fn from_toml(content: &str) -> Result<Self> {
        let rules: RuleSet = toml::from_str(content)?;
        rules.validate()?;
        Ok(rules)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            FundError::Rules(format!("Cannot read rules file {}: {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    pub fn builtin() -> Result<Self> {
        Self::from_toml(BUILTIN_RULES)
    }

    pub fn builtin_source() -> &'static str {
        BUILTIN_RULES
    }

    /// Load from `path` if given, otherwise the built-in tables.
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Self::builtin(),
        }
    }

    pub fn stream(&self, stream: Stream) -> &StreamRules {
        match stream {
            Stream::Donations => &self.donations,
            Stream::Spending => &self.spending,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.uncategorized_label.trim().is_empty() {
            return Err(FundError::Rules("uncategorized_label must not be empty".into()));
        }
        for stream in [Stream::Donations, Stream::Spending] {
            let rules = self.stream(stream);
            let name = stream.label();
            if rules.exclude_commentary.iter().any(|p| p.is_empty()) {
                return Err(FundError::Rules(format!(
                    "[{name}] exclude_commentary contains an empty phrase"
                )));
            }
            if rules.replacements.iter().any(|r| r.from.is_empty()) {
                return Err(FundError::Rules(format!(
                    "[{name}] replacement with empty 'from'"
                )));
            }
            if rules
                .collapse
                .iter()
                .any(|c| c.fragments.is_empty() || c.fragments.iter().any(|f| f.is_empty()))
            {
                return Err(FundError::Rules(format!(
                    "[{name}] collapse group with no fragments or an empty fragment"
                )));
            }
            if rules.commentary_overrides.iter().any(|o| o.pattern.is_empty()) {
                return Err(FundError::Rules(format!(
                    "[{name}] commentary override with empty pattern"
                )));
            }
        }
        Ok(())
    }

    pub fn rule_count(&self, stream: Stream) -> usize {
        let r = self.stream(stream);
        r.exclude_commentary.len()
            + r.exclude_categories.len()
            + r.promote_subcategory.len()
            + r.remap.len()
            + r.replacements.len()
            + r.account_overrides.len()
            + r.collapse.len()
            + r.commentary_overrides.len()
    }
}
