//! Job submission with polling, retries and atomic file placement.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::fs;
use tracing::{debug, info, instrument, warn};

use crate::client::{ArchiveClient, JobStatus};
use crate::error::{RetrievalError, RetrievalResult};
use crate::request::RetrievalRequest;

/// Retry and polling behaviour.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts per request
    pub max_attempts: u32,
    /// Delay before the second attempt (doubles each retry)
    pub initial_delay: Duration,
    /// Maximum retry delay
    pub max_delay: Duration,
    /// Interval between job status checks
    pub poll_interval: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(120),
            poll_interval: Duration::from_secs(10),
        }
    }
}

/// What happened to a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The target already existed.
    Skipped,
    Downloaded { bytes: u64 },
}

/// Drives requests through an [`ArchiveClient`].
pub struct Retriever<C> {
    client: C,
    config: RetryConfig,
}

fn partial_path(target: &Path) -> PathBuf {
    let mut name = target.as_os_str().to_owned();
    name.push(".partial");
    PathBuf::from(name)
}

impl<C: ArchiveClient> Retriever<C> {
    pub fn new(client: C, config: RetryConfig) -> Self {
        Self { client, config }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Retrieve `request` into `target` unless it is already there.
    ///
    /// The file is written to `<target>.partial` and renamed once complete,
    /// so an interrupted run never leaves a truncated target behind.
    #[instrument(skip_all, fields(dataset = request.dataset, variable = %request.variable, target = %target.display()))]
    pub async fn retrieve(&self, request: &RetrievalRequest, target: &Path) -> RetrievalResult<Outcome> {
        if target.exists() {
            info!("File already exists, skipping retrieval");
            return Ok(Outcome::Skipped);
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }
        let partial = partial_path(target);

        let mut attempt = 0;
        let mut delay = self.config.initial_delay;
        loop {
            attempt += 1;
            match self.attempt(request, &partial).await {
                Ok(bytes) => {
                    fs::rename(&partial, target).await?;
                    info!(bytes, attempt, "Retrieval completed");
                    return Ok(Outcome::Downloaded { bytes });
                }
                Err(e) => {
                    fs::remove_file(&partial).await.ok();
                    if !e.is_transient() {
                        return Err(e);
                    }
                    if attempt >= self.config.max_attempts {
                        return Err(RetrievalError::Exhausted {
                            attempts: attempt,
                            last: e.to_string(),
                        });
                    }

                    warn!(
                        error = %e,
                        attempt,
                        max_attempts = self.config.max_attempts,
                        delay_secs = delay.as_secs_f64(),
                        "Retrieval failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    delay = std::cmp::min(delay * 2, self.config.max_delay);
                }
            }
        }
    }

    /// Submit, wait for the job and download its result.
    ///
    /// Transient errors while polling are retried against the same job, up
    /// to `max_attempts` in a row, rather than resubmitting the request.
    async fn attempt(&self, request: &RetrievalRequest, partial: &Path) -> RetrievalResult<u64> {
        let job_id = self.client.submit(request).await?;
        let mut poll_failures = 0;
        let mut delay = self.config.initial_delay;
        loop {
            let status = match self.client.status(&job_id).await {
                Ok(status) => {
                    poll_failures = 0;
                    delay = self.config.initial_delay;
                    status
                }
                Err(e) if e.is_transient() && poll_failures + 1 < self.config.max_attempts => {
                    poll_failures += 1;
                    warn!(job_id = %job_id, error = %e, poll_failures, "Status check failed, polling again");
                    tokio::time::sleep(delay).await;
                    delay = std::cmp::min(delay * 2, self.config.max_delay);
                    continue;
                }
                Err(e) => return Err(e),
            };
            match status {
                JobStatus::Successful => break,
                JobStatus::Failed(reason) => return Err(RetrievalError::JobFailed { job_id, reason }),
                status => {
                    debug!(job_id = %job_id, ?status, "Waiting for job");
                    tokio::time::sleep(self.config.poll_interval).await;
                }
            }
        }
        self.client.download(&job_id, partial).await
    }
}
