//! Pinecone data-plane client.
//!
//! Talks to a single serverless or pod index over its REST API. Throttling
//! and server errors are retried with exponential backoff; everything else is
//! returned to the caller as a [`ResonateError::VectorStore`].

use super::{Match, RecordMetadata, VectorIndex, VectorRecord};
use crate::error::{ResonateError, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, instrument, warn};
use url::Url;

const API_VERSION: &str = "2024-07";

/// Client for one Pinecone index.
#[derive(Clone)]
pub struct PineconeIndex {
    client: Client,
    host: Url,
    namespace: Option<String>,
    max_retries: usize,
}

impl PineconeIndex {
    /// Build a client for the index served at `host`.
    ///
    /// `host` is the index host shown in the Pinecone console; a missing
    /// scheme defaults to `https://`.
    pub fn new(
        api_key: &str,
        host: &str,
        namespace: Option<String>,
        timeout: Duration,
        max_retries: usize,
    ) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(ResonateError::Config("missing Pinecone API key".to_string()));
        }

        let host = if host.starts_with("http://") || host.starts_with("https://") {
            host.to_string()
        } else {
            format!("https://{}", host)
        };
        let host = Url::parse(&host)
            .map_err(|e| ResonateError::Config(format!("invalid Pinecone host {:?}: {}", host, e)))?;

        let mut headers = HeaderMap::new();
        headers.insert(
            "Api-Key",
            HeaderValue::from_str(api_key.trim())
                .map_err(|_| ResonateError::Config("invalid Pinecone API key".to_string()))?,
        );
        headers.insert("X-Pinecone-API-Version", HeaderValue::from_static(API_VERSION));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            host,
            namespace: namespace.filter(|n| !n.is_empty()),
            max_retries,
        })
    }

    /// Whether a request that already failed `attempt` times may be retried.
    fn may_retry(&self, attempt: usize) -> bool {
        attempt < self.max_retries
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.host
            .join(path)
            .map_err(|e| ResonateError::Config(format!("invalid Pinecone endpoint {}: {}", path, e)))
    }

    async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let endpoint = self.endpoint(path)?;
        let mut attempt = 0usize;

        loop {
            let outcome = self.client.post(endpoint.clone()).json(body).send().await;
            match outcome {
                Ok(resp) if resp.status().is_success() => {
                    return resp.json::<R>().await.map_err(|e| {
                        ResonateError::VectorStore(format!(
                            "failed to parse Pinecone {} response: {}",
                            path, e
                        ))
                    });
                }
                Ok(resp) => {
                    let status = resp.status();
                    let body = resp
                        .text()
                        .await
                        .unwrap_or_else(|_| "<body unavailable>".to_string());
                    if should_retry(status) && self.may_retry(attempt) {
                        attempt += 1;
                        warn!("Pinecone {} returned {}, retrying (attempt {})", path, status, attempt);
                        tokio::time::sleep(retry_backoff(attempt)).await;
                        continue;
                    }
                    return Err(ResonateError::VectorStore(format!(
                        "Pinecone {} failed ({}): {}",
                        path, status, body
                    )));
                }
                Err(err) => {
                    if (err.is_timeout() || err.is_connect()) && self.may_retry(attempt) {
                        attempt += 1;
                        warn!("Pinecone {} request error, retrying (attempt {}): {}", path, attempt, err);
                        tokio::time::sleep(retry_backoff(attempt)).await;
                        continue;
                    }
                    return Err(err.into());
                }
            }
        }
    }
}

fn should_retry(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn retry_backoff(attempt: usize) -> Duration {
    let capped = attempt.min(5) as u32;
    Duration::from_millis(500 * (1 << capped))
}

#[async_trait]
impl VectorIndex for PineconeIndex {
    #[instrument(skip(self, records), fields(count = records.len()))]
    async fn upsert(&self, records: &[VectorRecord]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let request = UpsertRequest {
            vectors: records
                .iter()
                .map(|r| WireVector {
                    id: &r.id,
                    values: &r.values,
                    metadata: &r.metadata,
                })
                .collect(),
            namespace: self.namespace.as_deref(),
        };

        let response: UpsertResponse = self.post_json("vectors/upsert", &request).await?;
        let count = response.upserted_count.unwrap_or(records.len());
        debug!("Pinecone upserted {} vectors", count);
        Ok(count)
    }

    #[instrument(skip(self, vector))]
    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        include_metadata: bool,
    ) -> Result<Vec<Match>> {
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let request = QueryRequest {
            vector,
            top_k,
            include_metadata,
            include_values: false,
            namespace: self.namespace.as_deref(),
        };

        let response: QueryResponse = self.post_json("query", &request).await?;
        Ok(response.into_matches(include_metadata))
    }

    async fn count(&self) -> Result<usize> {
        let response: StatsResponse = self
            .post_json("describe_index_stats", &serde_json::json!({}))
            .await?;

        Ok(match &self.namespace {
            Some(ns) => response
                .namespaces
                .get(ns)
                .map(|n| n.vector_count)
                .unwrap_or(0),
            None => response.total_vector_count,
        })
    }
}

#[derive(Serialize)]
struct WireVector<'a> {
    id: &'a str,
    values: &'a [f32],
    metadata: &'a RecordMetadata,
}

#[derive(Serialize)]
struct UpsertRequest<'a> {
    vectors: Vec<WireVector<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    #[serde(default)]
    upserted_count: Option<usize>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
    include_values: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<WireMatch>,
}

#[derive(Debug, Deserialize)]
struct WireMatch {
    id: String,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    metadata: Option<RecordMetadata>,
}

impl QueryResponse {
    fn into_matches(self, include_metadata: bool) -> Vec<Match> {
        self.matches
            .into_iter()
            .map(|m| Match {
                id: m.id,
                score: m.score,
                metadata: if include_metadata { m.metadata } else { None },
            })
            .collect()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct StatsResponse {
    total_vector_count: usize,
    namespaces: HashMap<String, NamespaceStats>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct NamespaceStats {
    vector_count: usize,
}
