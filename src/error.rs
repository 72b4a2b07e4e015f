use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FundError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Ledger line {line}: {message}")]
    Load { line: usize, message: String },

    #[error("Rules error: {0}")]
    Rules(String),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("Missing table {}\nRun `fundledger refresh` to build it.", .0.display())]
    MissingTable(PathBuf),

    #[error("{0}")]
    Other(String),
}

impl From<toml::de::Error> for FundError {
    fn from(e: toml::de::Error) -> Self {
        FundError::Rules(e.to_string())
    }
}

impl FundError {
    pub fn load(line: usize, message: impl Into<String>) -> Self {
        FundError::Load {
            line,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, FundError>;
