//! Local CSV provider: `<dir>/<SYMBOL>.csv` in the daily price format.

use chrono::NaiveDate;
use std::fs::File;
use std::path::{Path, PathBuf};

use super::csv_format::parse_price_csv;
use super::provider::{restrict_to_range, DataError, DataProvider, DataSource, FetchResult};

pub struct CsvFileProvider {
    dir: PathBuf,
}

impl CsvFileProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, symbol: &str) -> PathBuf {
        self.dir.join(format!("{}.csv", symbol.to_uppercase()))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl DataProvider for CsvFileProvider {
    fn name(&self) -> &str {
        "csv-file"
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<FetchResult, DataError> {
        let path = self.path_for(symbol);
        let file = File::open(&path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                DataError::SymbolNotFound {
                    symbol: symbol.to_string(),
                }
            } else {
                DataError::Io {
                    path: path.display().to_string(),
                    source,
                }
            }
        })?;

        let bars = restrict_to_range(parse_price_csv(symbol, file)?, start, end);
        if bars.is_empty() {
            return Err(DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            });
        }
        Ok(FetchResult {
            symbol: symbol.to_string(),
            bars,
            source: DataSource::CsvFile,
        })
    }

    fn is_available(&self) -> bool {
        self.dir.is_dir()
    }
}
