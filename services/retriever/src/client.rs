//! Data store clients.
//!
//! The Climate Data Store runs requests as asynchronous jobs: a request is
//! submitted, its job polled until it completes, and the result file is then
//! fetched from the location the job reports.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::json;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::{RetrievalError, RetrievalResult};
use crate::request::RetrievalRequest;

pub const DEFAULT_CDS_URL: &str = "https://cds.climate.copernicus.eu/api";

/// State of a submitted job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Accepted,
    Running,
    Successful,
    Failed(String),
}

/// Operations the retriever needs from a data store.
#[async_trait]
pub trait ArchiveClient: Send + Sync {
    /// Submit a request and return its job id.
    async fn submit(&self, request: &RetrievalRequest) -> RetrievalResult<String>;

    async fn status(&self, job_id: &str) -> RetrievalResult<JobStatus>;

    /// Stream the result of a successful job into `target`, returning its size.
    async fn download(&self, job_id: &str, target: &Path) -> RetrievalResult<u64>;
}

#[derive(Debug, Deserialize)]
struct JobResponse {
    #[serde(rename = "jobID")]
    job_id: String,
    status: String,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResultsResponse {
    asset: Asset,
}

#[derive(Debug, Deserialize)]
struct Asset {
    value: AssetValue,
}

#[derive(Debug, Deserialize)]
struct AssetValue {
    href: String,
}

/// Client for the Copernicus Climate Data Store API.
pub struct CdsClient {
    client: Client,
    base_url: String,
    key: String,
}

impl CdsClient {
    pub fn new(base_url: impl Into<String>, key: impl Into<String>, timeout: Duration) -> RetrievalResult<Self> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err(RetrievalError::Credentials("CDSAPI_KEY is empty".to_string()));
        }
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(30))
            .tcp_nodelay(true)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            key,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/retrieve/v1/{}", self.base_url, path)
    }

    async fn check(response: Response) -> RetrievalResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(RetrievalError::Status {
            status: status.as_u16(),
            body,
        })
    }

    fn parse_status(job: &JobResponse) -> RetrievalResult<JobStatus> {
        match job.status.as_str() {
            "accepted" => Ok(JobStatus::Accepted),
            "running" => Ok(JobStatus::Running),
            "successful" => Ok(JobStatus::Successful),
            "failed" | "dismissed" => Ok(JobStatus::Failed(
                job.message.clone().unwrap_or_else(|| job.status.clone()),
            )),
            other => Err(RetrievalError::Protocol(format!("unknown job status '{other}'"))),
        }
    }
}

#[async_trait]
impl ArchiveClient for CdsClient {
    async fn submit(&self, request: &RetrievalRequest) -> RetrievalResult<String> {
        let response = self
            .client
            .post(self.url(&format!("processes/{}/execution", request.dataset)))
            .header("PRIVATE-TOKEN", &self.key)
            .json(&json!({ "inputs": request.inputs }))
            .send()
            .await?;
        let job: JobResponse = Self::check(response).await?.json().await?;
        debug!(dataset = request.dataset, job_id = %job.job_id, status = %job.status, "Submitted request");
        Ok(job.job_id)
    }

    async fn status(&self, job_id: &str) -> RetrievalResult<JobStatus> {
        let response = self
            .client
            .get(self.url(&format!("jobs/{job_id}")))
            .header("PRIVATE-TOKEN", &self.key)
            .send()
            .await?;
        let job: JobResponse = Self::check(response).await?.json().await?;
        Self::parse_status(&job)
    }

    async fn download(&self, job_id: &str, target: &Path) -> RetrievalResult<u64> {
        let response = self
            .client
            .get(self.url(&format!("jobs/{job_id}/results")))
            .header("PRIVATE-TOKEN", &self.key)
            .send()
            .await?;
        let results: ResultsResponse = Self::check(response).await?.json().await?;

        let response = Self::check(self.client.get(&results.asset.value.href).send().await?).await?;
        let mut file = tokio::fs::File::create(target).await?;
        let mut stream = response.bytes_stream();
        let mut written = 0u64;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        Ok(written)
    }
}
