//! Run configuration loaded from TOML.
//!
//! Every section has defaults, so an empty file (or no file at all) is a
//! valid configuration and CLI flags only override what they name:
//!
//! ```toml
//! [backtest]
//! symbol = "QQQ"
//! start_date = "2015-01-02"
//! end_date = "2020-12-31"
//! history_years = 15
//!
//! [strategy]
//! atr_window = 50
//! leverage = 3.0
//! stance = "trend"
//!
//! [data]
//! source = "csv"
//! csv_dir = "data"
//!
//! [output]
//! dir = "output"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use swingatr_core::data::{RetryPolicy, DEFAULT_URL_TEMPLATE};
use swingatr_core::strategy::{ParamsError, StrategyParams};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid date '{value}' (expected YYYY-MM-DD)")]
    InvalidDate { value: String },

    #[error("missing {0} (set it in [backtest] or on the command line)")]
    MissingDate(&'static str),

    #[error("start date {start} is after end date {end}")]
    StartAfterEnd { start: NaiveDate, end: NaiveDate },

    #[error("invalid strategy parameters: {0}")]
    Strategy(#[from] ParamsError),

    #[error("invalid [data] section: {0}")]
    Data(String),
}

/// Parse a `YYYY-MM-DD` date.
pub fn parse_date(value: &str) -> Result<NaiveDate, ConfigError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|_| ConfigError::InvalidDate {
        value: value.to_string(),
    })
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub backtest: BacktestSection,
    pub strategy: StrategyParams,
    pub data: DataSection,
    pub output: OutputSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestSection {
    pub symbol: String,
    /// Kept as text so a bad date is reported as such, not as a TOML error.
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    /// Years of history fetched before the start date to seed the ATR and
    /// the initial extreme scan.
    pub history_years: u32,
}

impl Default for BacktestSection {
    fn default() -> Self {
        Self {
            symbol: "QQQ".to_string(),
            start_date: None,
            end_date: None,
            history_years: 15,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[default]
    Http,
    Csv,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSection {
    pub source: SourceKind,
    pub csv_dir: PathBuf,
    pub url_template: String,
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    /// Fall back to generated bars when the provider fails. Results are tagged.
    pub synthetic: bool,
}

impl Default for DataSection {
    fn default() -> Self {
        let retry = RetryPolicy::default();
        Self {
            source: SourceKind::Http,
            csv_dir: PathBuf::from("data"),
            url_template: DEFAULT_URL_TEMPLATE.to_string(),
            max_attempts: retry.max_attempts,
            base_delay_ms: retry.base_delay.as_millis() as u64,
            synthetic: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSection {
    pub dir: PathBuf,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("output"),
        }
    }
}

impl RunConfig {
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    /// The inclusive simulation range. Both dates must be present.
    pub fn date_range(&self) -> Result<(NaiveDate, NaiveDate), ConfigError> {
        let start = self
            .backtest
            .start_date
            .as_deref()
            .ok_or(ConfigError::MissingDate("start date"))
            .and_then(parse_date)?;
        let end = self
            .backtest
            .end_date
            .as_deref()
            .ok_or(ConfigError::MissingDate("end date"))
            .and_then(parse_date)?;
        if start > end {
            return Err(ConfigError::StartAfterEnd { start, end });
        }
        Ok((start, end))
    }

    /// First date fetched: `history_years` before the simulation start.
    pub fn history_start(&self, start: NaiveDate) -> NaiveDate {
        start
            .checked_sub_months(Months::new(self.backtest.history_years.saturating_mul(12)))
            .unwrap_or(NaiveDate::MIN)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.data.max_attempts,
            Duration::from_millis(self.data.base_delay_ms),
        )
    }

    /// Check everything a run needs before any data is fetched.
    pub fn validate(&self) -> Result<(NaiveDate, NaiveDate), ConfigError> {
        if self.backtest.symbol.trim().is_empty() {
            return Err(ConfigError::Data("symbol must not be empty".into()));
        }
        self.strategy.validate()?;
        if self.data.max_attempts == 0 {
            return Err(ConfigError::Data("max_attempts must be at least 1".into()));
        }
        if self.data.source == SourceKind::Http && !self.data.url_template.contains("{symbol}") {
            return Err(ConfigError::Data(
                "url_template must contain a {symbol} placeholder".into(),
            ));
        }
        self.date_range()
    }
}
