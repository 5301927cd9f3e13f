use std::time::Duration;

use async_trait::async_trait;
use deploy_config::shared::MetricsBackendConfig;
use serde::Deserialize;
use url::Url;

use crate::k8s::stats::UsagePoint;
use crate::k8s::{K8sError, MetricsApi};

/// Instant query endpoint of the metrics backend.
const QUERY_PATH: &str = "api/v1/query";
/// Range query endpoint of the metrics backend.
const QUERY_RANGE_PATH: &str = "api/v1/query_range";

/// Request timeout for metrics queries.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Metrics client backed by a Prometheus-compatible HTTP query API.
///
/// The backend reports sample times in seconds; they are converted to the
/// Unix-millisecond floats exposed by this subsystem once, here at the
/// decoding boundary, and never reformatted afterwards.
pub struct HttpMetricsApi {
    client: reqwest::Client,
    base_url: Url,
    step_seconds: u64,
}

impl HttpMetricsApi {
    /// Creates a metrics client from configuration.
    ///
    /// The underlying HTTP client is owned by this instance; no process-wide
    /// default client is involved.
    pub fn new(config: &MetricsBackendConfig) -> Result<Self, K8sError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|err| K8sError::bad_parameter(format!("metrics base url: {err}")))?;
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_url,
            step_seconds: config.step_seconds,
        })
    }

    async fn query(&self, path: &str, params: &[(&str, String)]) -> Result<QueryData, K8sError> {
        let url = self
            .base_url
            .join(path)
            .map_err(|err| K8sError::bad_parameter(format!("metrics query url: {err}")))?;

        let response = self.client.get(url.clone()).query(params).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(K8sError::UpstreamStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body: QueryResponse = response
            .json()
            .await
            .map_err(|err| K8sError::malformed(format!("metrics response: {err}")))?;
        if body.status != "success" {
            return Err(K8sError::malformed(format!(
                "metrics backend reported status {}",
                body.status
            )));
        }

        Ok(body.data)
    }

    async fn instant(&self, query: String, at_ms: f64) -> Result<Option<(f64, f64)>, K8sError> {
        let params = [
            ("query", query),
            ("time", format_seconds(at_ms)),
        ];
        let data = self.query(QUERY_PATH, &params).await?;

        Ok(data
            .result
            .into_iter()
            .next()
            .and_then(|result| result.value)
            .and_then(decode_sample))
    }

    async fn range(
        &self,
        query: String,
        start_ms: f64,
        end_ms: f64,
    ) -> Result<Vec<(f64, f64)>, K8sError> {
        let params = [
            ("query", query),
            ("start", format_seconds(start_ms)),
            ("end", format_seconds(end_ms)),
            ("step", self.step_seconds.to_string()),
        ];
        let data = self.query(QUERY_RANGE_PATH, &params).await?;

        Ok(data
            .result
            .into_iter()
            .next()
            .and_then(|result| result.values)
            .unwrap_or_default()
            .into_iter()
            .filter_map(decode_sample)
            .collect())
    }
}

#[async_trait]
impl MetricsApi for HttpMetricsApi {
    async fn usage_at(
        &self,
        namespace: &str,
        pods: &[String],
        at_ms: f64,
    ) -> Result<Option<UsagePoint>, K8sError> {
        if pods.is_empty() {
            return Ok(None);
        }

        let (cores, memory) = tokio::try_join!(
            self.instant(cpu_query(namespace, pods), at_ms),
            self.instant(memory_query(namespace, pods), at_ms),
        )?;

        Ok(combine_samples(
            cores.into_iter().collect(),
            memory.into_iter().collect(),
        )
        .into_iter()
        .next())
    }

    async fn usage_range(
        &self,
        namespace: &str,
        pods: &[String],
        start_ms: f64,
        end_ms: f64,
    ) -> Result<Vec<UsagePoint>, K8sError> {
        if pods.is_empty() {
            return Ok(Vec::new());
        }

        let (cores, memory) = tokio::try_join!(
            self.range(cpu_query(namespace, pods), start_ms, end_ms),
            self.range(memory_query(namespace, pods), start_ms, end_ms),
        )?;

        Ok(combine_samples(cores, memory))
    }
}

/// Response envelope of the query API.
#[derive(Debug, Deserialize)]
struct QueryResponse {
    status: String,
    data: QueryData,
}

#[derive(Debug, Deserialize)]
struct QueryData {
    result: Vec<QueryResult>,
}

/// One series of the query result. Instant queries fill `value`, range
/// queries fill `values`; every sample is a `[seconds, "value"]` pair.
#[derive(Debug, Deserialize)]
struct QueryResult {
    #[serde(default)]
    value: Option<(f64, String)>,
    #[serde(default)]
    values: Option<Vec<(f64, String)>>,
}

fn cpu_query(namespace: &str, pods: &[String]) -> String {
    format!(
        "sum(rate(container_cpu_usage_seconds_total{{namespace=\"{namespace}\",pod=~\"{}\"}}[2m]))",
        pod_pattern(pods)
    )
}

fn memory_query(namespace: &str, pods: &[String]) -> String {
    format!(
        "sum(container_memory_working_set_bytes{{namespace=\"{namespace}\",pod=~\"{}\"}})",
        pod_pattern(pods)
    )
}

fn pod_pattern(pods: &[String]) -> String {
    pods.join("|")
}

fn format_seconds(unix_ms: f64) -> String {
    format!("{:.3}", unix_ms / 1000.0)
}

/// Converts one backend sample into `(unix_ms, value)`.
fn decode_sample(sample: (f64, String)) -> Option<(f64, f64)> {
    let (seconds, value) = sample;
    let value = value.parse::<f64>().ok()?;

    Some((seconds * 1000.0, value))
}

/// Zips cpu and memory sample streams into combined usage points.
///
/// The backend answers aligned series for identical windows and steps, so
/// samples are paired by position; a stream that runs short contributes
/// zeroes for its dimension.
fn combine_samples(cores: Vec<(f64, f64)>, memory: Vec<(f64, f64)>) -> Vec<UsagePoint> {
    let len = cores.len().max(memory.len());
    let mut points = Vec::with_capacity(len);

    for i in 0..len {
        let time = cores
            .get(i)
            .or_else(|| memory.get(i))
            .map(|(time, _)| *time)
            .unwrap_or_default();
        points.push(UsagePoint {
            time,
            cores: cores.get(i).map(|(_, value)| *value).unwrap_or(0.0),
            memory: memory.get(i).map(|(_, value)| *value).unwrap_or(0.0),
        });
    }

    points
}
