//! HTTP price provider for CSV download endpoints.
//!
//! The URL is built from a template with `{symbol}`, `{start}`, `{end}`
//! (YYYY-MM-DD) and `{period1}`, `{period2}` (unix seconds) placeholders, so
//! any endpoint serving the daily price CSV format can be plugged in.

use chrono::NaiveDate;
use std::time::Duration;
use tracing::debug;

use super::csv_format::parse_price_csv;
use super::provider::{
    restrict_to_range, DataError, DataProvider, DataSource, FetchResult, RawBar,
};
use super::retry::RetryPolicy;

/// Yahoo-style history download endpoint.
pub const DEFAULT_URL_TEMPLATE: &str = "https://query1.finance.yahoo.com/v7/finance/download/{symbol}?period1={period1}&period2={period2}&interval=1d&events=history&includeAdjustedClose=true";

pub struct HttpCsvProvider {
    client: reqwest::blocking::Client,
    url_template: String,
    retry: RetryPolicy,
}

impl HttpCsvProvider {
    pub fn new(url_template: impl Into<String>, retry: RetryPolicy) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .map_err(|e| DataError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            url_template: url_template.into(),
            retry,
        })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Expand the URL template for one request.
    pub fn url_for(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> String {
        let period1 = start
            .and_hms_opt(0, 0, 0)
            .map_or(0, |dt| dt.and_utc().timestamp());
        let period2 = end
            .and_hms_opt(23, 59, 59)
            .map_or(0, |dt| dt.and_utc().timestamp());
        self.url_template
            .replace("{symbol}", symbol)
            .replace("{start}", &start.format("%Y-%m-%d").to_string())
            .replace("{end}", &end.format("%Y-%m-%d").to_string())
            .replace("{period1}", &period1.to_string())
            .replace("{period2}", &period2.to_string())
    }

    fn fetch_once(&self, symbol: &str, url: &str) -> Result<Vec<RawBar>, DataError> {
        let resp = self
            .client
            .get(url)
            .send()
            .map_err(|e| DataError::Network(format!("{symbol}: {e}")))?;
        let status = resp.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            });
        }
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = resp
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(60);
            return Err(DataError::RateLimited { retry_after_secs });
        }
        if !status.is_success() {
            return Err(DataError::HttpStatus {
                symbol: symbol.to_string(),
                status: status.as_u16(),
            });
        }

        let body = resp
            .text()
            .map_err(|e| DataError::Network(format!("{symbol}: reading body: {e}")))?;
        parse_price_csv(symbol, body.as_bytes())
    }
}

impl DataProvider for HttpCsvProvider {
    fn name(&self) -> &str {
        "http-csv"
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<FetchResult, DataError> {
        let url = self.url_for(symbol, start, end);
        debug!(symbol, %url, "fetching price history");
        let bars = self.retry.run(symbol, |_| self.fetch_once(symbol, &url))?;
        let bars = restrict_to_range(bars, start, end);
        if bars.is_empty() {
            return Err(DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            });
        }
        Ok(FetchResult {
            symbol: symbol.to_string(),
            bars,
            source: DataSource::Http,
        })
    }

    fn is_available(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn template_placeholders_expand() {
        let provider = HttpCsvProvider::new(
            "https://example.test/{symbol}.csv?from={start}&to={end}&p1={period1}&p2={period2}",
            RetryPolicy::default(),
        )
        .unwrap();
        let url = provider.url_for("QQQ", date(2024, 1, 1), date(2024, 1, 2));
        assert_eq!(
            url,
            "https://example.test/QQQ.csv?from=2024-01-01&to=2024-01-02&p1=1704067200&p2=1704239999"
        );
    }

    #[test]
    fn default_template_uses_unix_periods() {
        let provider = HttpCsvProvider::new(DEFAULT_URL_TEMPLATE, RetryPolicy::default()).unwrap();
        let url = provider.url_for("SPY", date(2024, 1, 1), date(2024, 1, 2));
        assert!(url.contains("/download/SPY?"));
        assert!(url.contains("period1=1704067200"));
        assert!(!url.contains('{'));
    }

    #[test]
    fn unreachable_host_exhausts_retries() {
        // port 9 on localhost is discard; nothing should be listening
        let provider = HttpCsvProvider::new(
            "http://127.0.0.1:9/{symbol}",
            RetryPolicy::new(2, Duration::ZERO),
        )
        .unwrap();
        let err = provider
            .fetch("SPY", date(2024, 1, 1), date(2024, 1, 2))
            .unwrap_err();
        assert!(matches!(
            err,
            DataError::RetriesExhausted { attempts: 2, .. }
        ));
    }
}
