use crate::source::{OnChainSource, SourceError};
use serde::Deserialize;
use table::AuxPoint;

#[derive(Debug, Deserialize)]
pub struct GlassnodePoint {
    /// Unix seconds
    pub t: i64,
    pub v: Option<f64>,
}

/// Glassnode metrics API. `metric` is the path under `/v1/metrics`, e.g. `market/mvrv`.
pub struct GlassnodeClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl GlassnodeClient {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: "https://api.glassnode.com".to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        }
    }

    /// Reads the key from `GLASSNODE_API_KEY`.
    pub fn from_env() -> Self {
        Self::new(std::env::var("GLASSNODE_API_KEY").ok())
    }
}

/// Drops points the provider left empty; the aligner treats them as not collected.
pub fn to_points(raw: &[GlassnodePoint]) -> Vec<AuxPoint> {
    raw.iter()
        .filter_map(|p| {
            p.v.map(|value| AuxPoint {
                timestamp: p.t * 1000,
                value,
            })
        })
        .collect()
}

impl OnChainSource for GlassnodeClient {
    fn name(&self) -> &str {
        "glassnode"
    }

    fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    async fn fetch_metric(
        &self,
        asset: &str,
        metric: &str,
        since: Option<i64>,
    ) -> Result<Vec<AuxPoint>, SourceError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(SourceError::MissingCredential("glassnode"))?;

        let url = format!("{}/v1/metrics/{}", self.base_url, metric.trim_matches('/'));
        let mut query = vec![
            ("a", asset.to_string()),
            ("i", "24h".to_string()),
            ("api_key", api_key.to_string()),
        ];
        if let Some(since) = since {
            query.push(("s", (since / 1000).to_string()));
        }

        let raw: Vec<GlassnodePoint> = self
            .client
            .get(&url)
            .query(&query)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(to_points(&raw))
    }
}
