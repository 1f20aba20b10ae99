use crate::source::{PriceSource, SourceError};
use log::{debug, warn};
use serde::Deserialize;
use std::collections::BTreeMap;
use table::OhlcvRow;

/// Bybit returns at most this many candles per request.
const MAX_PAGE: usize = 1000;

#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    #[serde(rename = "retCode")]
    pub ret_code: i64,
    #[serde(rename = "retMsg")]
    pub ret_msg: String,
    pub result: T,
}

#[derive(Debug, Deserialize)]
pub struct KlineResult {
    #[serde(default)]
    pub list: Vec<Vec<String>>,
}

/// Normalises user-facing interval names to Bybit's kline intervals.
pub fn normalize_interval(interval: &str) -> &'static str {
    match interval {
        "1" | "1m" => "1",
        "3" | "3m" => "3",
        "5" | "5m" => "5",
        "15" | "15m" => "15",
        "30" | "30m" => "30",
        "60" | "1h" | "60m" => "60",
        "120" | "2h" => "120",
        "240" | "4h" => "240",
        "360" | "6h" => "360",
        "720" | "12h" => "720",
        "W" | "1w" | "weekly" => "W",
        "M" | "1M" | "monthly" => "M",
        _ => "D",
    }
}

pub fn interval_to_millis(interval: &str) -> i64 {
    match normalize_interval(interval) {
        "1" => 60_000,
        "3" => 180_000,
        "5" => 300_000,
        "15" => 900_000,
        "30" => 1_800_000,
        "60" => 3_600_000,
        "120" => 7_200_000,
        "240" => 14_400_000,
        "360" => 21_600_000,
        "720" => 43_200_000,
        "W" => 604_800_000,
        "M" => 2_592_000_000,
        _ => 86_400_000,
    }
}

/// Parses one `[start, open, high, low, close, volume, turnover]` kline entry.
pub fn parse_kline(fields: &[String]) -> Result<OhlcvRow, SourceError> {
    if fields.len() < 6 {
        return Err(SourceError::Parse(format!(
            "kline has {} fields, expected at least 6",
            fields.len()
        )));
    }

    let num = |i: usize| -> Result<f64, SourceError> {
        fields[i]
            .parse::<f64>()
            .map_err(|_| SourceError::Parse(format!("bad number '{}' in kline", fields[i])))
    };
    let timestamp = fields[0]
        .parse::<i64>()
        .map_err(|_| SourceError::Parse(format!("bad timestamp '{}' in kline", fields[0])))?;

    Ok(OhlcvRow {
        timestamp,
        open: num(1)?,
        high: num(2)?,
        low: num(3)?,
        close: num(4)?,
        volume: num(5)?,
    })
}

pub struct BybitClient {
    client: reqwest::Client,
    base_url: String,
    category: String,
}

impl Default for BybitClient {
    fn default() -> Self {
        Self::new()
    }
}

impl BybitClient {
    pub fn new() -> Self {
        Self::with_base_url("https://api.bybit.com")
    }

    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            category: "spot".to_string(),
        }
    }

    pub fn with_category(mut self, category: &str) -> Self {
        self.category = category.to_string();
        self
    }

    /// One page of klines ending at `end` (inclusive), newest first as Bybit sends them.
    pub async fn get_kline_page(
        &self,
        symbol: &str,
        interval: &str,
        limit: usize,
        end: Option<i64>,
    ) -> Result<Vec<OhlcvRow>, SourceError> {
        let url = format!("{}/v5/market/kline", self.base_url);
        let limit = limit.min(MAX_PAGE).to_string();
        let mut query: Vec<(&str, String)> = vec![
            ("category", self.category.clone()),
            ("symbol", symbol.to_string()),
            ("interval", normalize_interval(interval).to_string()),
            ("limit", limit),
        ];
        if let Some(end) = end {
            query.push(("end", end.to_string()));
        }

        let response = self
            .client
            .get(&url)
            .query(&query)
            .send()
            .await?
            .error_for_status()?;

        let api_response: ApiResponse<KlineResult> = response.json().await?;
        if api_response.ret_code != 0 {
            return Err(SourceError::Api {
                code: api_response.ret_code,
                message: api_response.ret_msg,
            });
        }

        api_response
            .result
            .list
            .iter()
            .map(|fields| parse_kline(fields))
            .collect()
    }
}

impl PriceSource for BybitClient {
    fn name(&self) -> &str {
        "bybit"
    }

    /// Pages backwards from the newest candle until `limit` rows are collected
    /// or the exchange runs out, then returns them oldest first.
    async fn fetch_ohlcv(
        &self,
        symbol: &str,
        timeframe: &str,
        limit: usize,
    ) -> Result<Vec<OhlcvRow>, SourceError> {
        let step = interval_to_millis(timeframe);
        let mut rows: BTreeMap<i64, OhlcvRow> = BTreeMap::new();
        let mut end: Option<i64> = None;

        while rows.len() < limit {
            let page = self
                .get_kline_page(symbol, timeframe, limit - rows.len(), end)
                .await?;
            if page.is_empty() {
                break;
            }

            let before = rows.len();
            for row in page {
                rows.entry(row.timestamp).or_insert(row);
            }
            if rows.len() == before {
                warn!("bybit returned only duplicate candles for {}, stopping", symbol);
                break;
            }

            end = rows.keys().next().map(|oldest| oldest - step);
            debug!("{}: {} candles so far", symbol, rows.len());

            if rows.len() < limit {
                tokio::time::sleep(std::time::Duration::from_millis(200)).await;
            }
        }

        // Keep the newest `limit` candles.
        let skip = rows.len().saturating_sub(limit);
        Ok(rows.into_values().skip(skip).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_kline() {
        let fields: Vec<String> = ["1700000000000", "1.0", "2.0", "0.5", "1.5", "100", "150"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let row = parse_kline(&fields).unwrap();
        assert_eq!(row.timestamp, 1_700_000_000_000);
        assert_eq!(row.high, 2.0);
        assert_eq!(row.volume, 100.0);
    }

    #[test]
    fn test_parse_kline_rejects_short_or_bad_rows() {
        let short = vec!["1".to_string(), "2".to_string()];
        assert!(matches!(parse_kline(&short), Err(SourceError::Parse(_))));

        let bad: Vec<String> =
            ["x", "1", "1", "1", "1", "1"].iter().map(|s| s.to_string()).collect();
        assert!(matches!(parse_kline(&bad), Err(SourceError::Parse(_))));
    }

    #[test]
    fn test_api_response_deserializes() {
        let body = r#"{"retCode":0,"retMsg":"OK","result":{"symbol":"BTCUSDT","list":[
            ["1700086400000","2","3","1","2.5","10","25"],
            ["1700000000000","1","2","0.5","1.5","5","7"]
        ]}}"#;
        let parsed: ApiResponse<KlineResult> = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.ret_code, 0);
        assert_eq!(parsed.result.list.len(), 2);
    }

    #[test]
    fn test_intervals() {
        assert_eq!(normalize_interval("1d"), "D");
        assert_eq!(normalize_interval("4h"), "240");
        assert_eq!(interval_to_millis("D"), 86_400_000);
        assert_eq!(interval_to_millis("1h"), 3_600_000);
    }

    #[test]
    fn test_client_category_and_base_url() {
        let client = BybitClient::with_base_url("http://localhost:9000/");
        assert_eq!(client.base_url, "http://localhost:9000");
        assert_eq!(client.category, "spot");
        assert_eq!(client.with_category("linear").category, "linear");
    }
}
