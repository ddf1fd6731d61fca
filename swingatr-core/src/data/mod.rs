//! Price data: provider trait, CSV wire format and the concrete providers.

pub mod csv_file;
pub mod csv_format;
pub mod http_csv;
pub mod provider;
pub mod retry;

pub use csv_file::CsvFileProvider;
pub use csv_format::{parse_price_csv, write_price_csv};
pub use http_csv::{HttpCsvProvider, DEFAULT_URL_TEMPLATE};
pub use provider::{
    restrict_to_range, DataError, DataProvider, DataSource, FetchProgress, FetchResult, RawBar,
    StdoutProgress,
};
pub use retry::RetryPolicy;
