use crate::source::{SentimentSource, SourceError};
use serde::Deserialize;
use table::AuxPoint;

#[derive(Debug, Deserialize)]
pub struct FearGreedResponse {
    #[serde(default)]
    pub data: Vec<FearGreedEntry>,
}

#[derive(Debug, Deserialize)]
pub struct FearGreedEntry {
    pub value: String,
    #[serde(default)]
    pub value_classification: String,
    /// Unix seconds
    pub timestamp: String,
}

impl FearGreedEntry {
    pub fn to_point(&self) -> Result<AuxPoint, SourceError> {
        let secs = self
            .timestamp
            .parse::<i64>()
            .map_err(|_| {
                SourceError::Parse(format!("bad fear/greed timestamp '{}'", self.timestamp))
            })?;
        let value = self
            .value
            .parse::<f64>()
            .map_err(|_| SourceError::Parse(format!("bad fear/greed value '{}'", self.value)))?;
        Ok(AuxPoint {
            timestamp: secs * 1000,
            value,
        })
    }
}

/// alternative.me Fear & Greed index. The API lists newest first.
pub struct FearGreedClient {
    client: reqwest::Client,
    base_url: String,
}

impl Default for FearGreedClient {
    fn default() -> Self {
        Self::new()
    }
}

impl FearGreedClient {
    pub fn new() -> Self {
        Self::with_base_url("https://api.alternative.me")
    }

    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

impl SentimentSource for FearGreedClient {
    fn name(&self) -> &str {
        "fear_greed"
    }

    async fn fetch_index(&self, limit: usize) -> Result<Vec<AuxPoint>, SourceError> {
        let url = format!("{}/fng/", self.base_url);
        let response: FearGreedResponse = self
            .client
            .get(&url)
            .query(&[("limit", limit.to_string()), ("format", "json".to_string())])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        response.data.iter().map(FearGreedEntry::to_point).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_payload() {
        let body = r#"{
            "name": "Fear and Greed Index",
            "data": [
                {"value": "72", "value_classification": "Greed",
                 "timestamp": "1700092800", "time_until_update": "100"},
                {"value": "18", "value_classification": "Extreme Fear", "timestamp": "1700006400"}
            ],
            "metadata": {"error": null}
        }"#;
        let parsed: FearGreedResponse = serde_json::from_str(body).unwrap();
        let points: Vec<AuxPoint> = parsed.data.iter().map(|e| e.to_point().unwrap()).collect();

        assert_eq!(points.len(), 2);
        assert_eq!(points[0].timestamp, 1_700_092_800_000);
        assert_eq!(points[1].value, 18.0);
        assert_eq!(parsed.data[1].value_classification, "Extreme Fear");
    }

    #[test]
    fn test_bad_value_is_parse_error() {
        let entry = FearGreedEntry {
            value: "n/a".into(),
            value_classification: String::new(),
            timestamp: "1".into(),
        };
        assert!(matches!(entry.to_point(), Err(SourceError::Parse(_))));
    }
}
