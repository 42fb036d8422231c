//! Search gateway client.
//!
//! The search service answers either with bare record ids (`GET /search`) or with
//! full records (`POST /search`). Both shapes are normalized here into
//! [`SearchResult`] so callers never inspect raw JSON.

use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// What to ask the search service for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchQuery {
    /// A page of ids for the feed.
    Page { query: String, page: u32, limit: u32 },
    /// Up to `number` full records, best first.
    Records { query: String, number: usize },
}

/// A full search hit as returned by the record variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(alias = "Title")]
    pub title: String,
    #[serde(default, alias = "Image", skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default)]
    pub relevance_score: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct IdentifierBatch {
    pub ids: Vec<String>,
    pub page: u32,
    pub limit: u32,
    pub total: usize,
    pub has_more: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SearchResult {
    IdentifierBatch(IdentifierBatch),
    RecordBatch(Vec<SearchRecord>),
}

impl SearchResult {
    /// Record ids in result order. Records without an id are skipped.
    pub fn identifiers(&self) -> Vec<String> {
        match self {
            SearchResult::IdentifierBatch(batch) => batch.ids.clone(),
            SearchResult::RecordBatch(records) => {
                records.iter().filter_map(|r| r.id.clone()).collect()
            }
        }
    }

    pub fn records(&self) -> &[SearchRecord] {
        match self {
            SearchResult::IdentifierBatch(_) => &[],
            SearchResult::RecordBatch(records) => records,
        }
    }

    /// Whether the service signalled that more results exist. Record batches are
    /// one-shot.
    pub fn has_more(&self) -> bool {
        match self {
            SearchResult::IdentifierBatch(batch) => batch.has_more && !batch.ids.is_empty(),
            SearchResult::RecordBatch(_) => false,
        }
    }

    /// Normalize a raw search service response body.
    pub fn from_json(body: Value) -> Result<SearchResult> {
        let Value::Object(mut map) = body else {
            bail!("search response is not an object");
        };
        let items = map
            .remove("result")
            .or_else(|| map.remove("results"))
            .unwrap_or(Value::Array(Vec::new()));
        let Value::Array(items) = items else {
            bail!("search response `result` is not an array");
        };

        if items.iter().any(Value::is_object) {
            let records = items
                .into_iter()
                .map(serde_json::from_value::<SearchRecord>)
                .collect::<Result<Vec<_>, _>>()
                .context("malformed search record")?;
            return Ok(SearchResult::RecordBatch(records));
        }

        let ids = items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => Ok(s),
                Value::Number(n) => Ok(n.to_string()),
                other => Err(anyhow!("unexpected search id {other}")),
            })
            .collect::<Result<Vec<String>>>()?;

        let count = |key: &str, default: usize| {
            map.get(key)
                .and_then(Value::as_u64)
                .unwrap_or(default as u64)
        };
        let page = u32::try_from(count("page", 0)).unwrap_or(u32::MAX);
        let limit = u32::try_from(count("limit", ids.len())).unwrap_or(u32::MAX);
        let total = usize::try_from(count("total", ids.len())).unwrap_or(usize::MAX);
        let has_more = map
            .get("hasMore")
            .and_then(Value::as_bool)
            .unwrap_or(!ids.is_empty());

        Ok(SearchResult::IdentifierBatch(IdentifierBatch {
            ids,
            page,
            limit,
            total,
            has_more,
        }))
    }
}

#[async_trait]
pub trait SearchGateway: Send + Sync {
    async fn search(&self, query: &SearchQuery) -> Result<SearchResult>;
}

/// Talks to an external search service over HTTP.
pub struct HttpSearchGateway {
    client: Client,
    base_url: String,
}

impl HttpSearchGateway {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[derive(Serialize)]
struct RecordsRequest<'a> {
    query: &'a str,
    number: usize,
}

#[async_trait]
impl SearchGateway for HttpSearchGateway {
    async fn search(&self, query: &SearchQuery) -> Result<SearchResult> {
        let url = format!("{}/search", self.base_url);
        let request = match query {
            SearchQuery::Page { query, page, limit } => self.client.get(&url).query(&[
                ("query", query.clone()),
                ("page", page.to_string()),
                ("limit", limit.to_string()),
            ]),
            SearchQuery::Records { query, number } => self.client.post(&url).json(&RecordsRequest {
                query,
                number: *number,
            }),
        };

        let response = request
            .send()
            .await
            .with_context(|| format!("search request to {url} failed"))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "<response unavailable>".to_string());
            bail!("search service returned {status}: {text}");
        }

        let body: Value = response
            .json()
            .await
            .context("search response is not JSON")?;
        SearchResult::from_json(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn normalizes_identifier_batch() {
        let result = SearchResult::from_json(json!({
            "result": ["1001", 1002, "1003"],
            "page": 2,
            "limit": 3,
            "total": 100,
            "hasMore": true
        }))
        .unwrap();

        assert_eq!(
            result,
            SearchResult::IdentifierBatch(IdentifierBatch {
                ids: vec!["1001".into(), "1002".into(), "1003".into()],
                page: 2,
                limit: 3,
                total: 100,
                has_more: true,
            })
        );
        assert!(result.has_more());
    }

    #[test]
    fn normalizes_record_batch_with_legacy_field_names() {
        let result = SearchResult::from_json(json!({
            "results": [
                {"Title": "Chicken Soup", "Image": "soup.jpg", "relevance_score": 0.9},
                {"id": "42", "title": "Chicken Pie"}
            ]
        }))
        .unwrap();

        let records = result.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].title, "Chicken Soup");
        assert_eq!(records[0].image.as_deref(), Some("soup.jpg"));
        assert_eq!(records[0].relevance_score, Some(0.9));
        assert_eq!(result.identifiers(), vec!["42".to_string()]);
        assert!(!result.has_more());
    }

    #[test]
    fn missing_result_is_an_empty_batch() {
        let result = SearchResult::from_json(json!({"error": "boom"})).unwrap();
        assert_eq!(
            result,
            SearchResult::IdentifierBatch(IdentifierBatch::default())
        );
    }

    #[test]
    fn oversized_counters_saturate() {
        let result = SearchResult::from_json(json!({
            "result": ["7"],
            "page": 5_000_000_000u64,
            "limit": 4_294_967_296u64,
            "hasMore": true
        }))
        .unwrap();
        let SearchResult::IdentifierBatch(batch) = result else {
            panic!("expected an id batch");
        };
        assert_eq!(batch.page, u32::MAX);
        assert_eq!(batch.limit, u32::MAX);
        assert_eq!(batch.total, 1);
    }

    #[test]
    fn rejects_non_object_body() {
        assert!(SearchResult::from_json(json!(["1", "2"])).is_err());
        assert!(SearchResult::from_json(json!({"result": [true]})).is_err());
    }
}
