//! Retrieval against a scripted data store.

use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use energy_common::BoundingBox;
use retriever::{
    ArchiveClient, JobStatus, Outcome, RetrievalError, RetrievalRequest, RetrievalResult, RetryConfig, Retriever,
};

#[derive(Default)]
struct FakeClient {
    transient_failures: u32,
    status_failures: u32,
    polls_before_success: u32,
    fail_job: bool,
    submits: AtomicU32,
    polls: AtomicU32,
}

#[async_trait]
impl ArchiveClient for FakeClient {
    async fn submit(&self, _request: &RetrievalRequest) -> RetrievalResult<String> {
        let n = self.submits.fetch_add(1, Ordering::SeqCst) + 1;
        if n <= self.transient_failures {
            return Err(RetrievalError::Status {
                status: 503,
                body: "busy".to_string(),
            });
        }
        Ok(format!("job-{n}"))
    }

    async fn status(&self, _job_id: &str) -> RetrievalResult<JobStatus> {
        let n = self.polls.fetch_add(1, Ordering::SeqCst) + 1;
        if n <= self.status_failures {
            return Err(RetrievalError::Status {
                status: 502,
                body: "bad gateway".to_string(),
            });
        }
        if self.fail_job {
            Ok(JobStatus::Failed("request rejected".to_string()))
        } else if n > self.status_failures + self.polls_before_success {
            Ok(JobStatus::Successful)
        } else {
            Ok(JobStatus::Running)
        }
    }

    async fn download(&self, job_id: &str, target: &Path) -> RetrievalResult<u64> {
        tokio::fs::write(target, job_id.as_bytes()).await?;
        Ok(job_id.len() as u64)
    }
}

fn fast_config(max_attempts: u32) -> RetryConfig {
    RetryConfig {
        max_attempts,
        initial_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(4),
        poll_interval: Duration::from_millis(1),
    }
}

fn request() -> RetrievalRequest {
    RetrievalRequest::era5("2m_temperature", 2015, &BoundingBox::europe())
}

#[tokio::test]
async fn test_polls_until_done_then_renames() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("Europe__ERA5__2m_temperature").join("2015__hourly_2m_temperature.nc");
    let retriever = Retriever::new(
        FakeClient {
            polls_before_success: 3,
            ..Default::default()
        },
        fast_config(5),
    );

    let outcome = retriever.retrieve(&request(), &target).await.unwrap();
    assert_eq!(outcome, Outcome::Downloaded { bytes: 5 });
    assert_eq!(std::fs::read_to_string(&target).unwrap(), "job-1");
    assert!(!dir
        .path()
        .join("Europe__ERA5__2m_temperature/2015__hourly_2m_temperature.nc.partial")
        .exists());
    assert_eq!(retriever.client().polls.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn test_existing_target_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("done.nc");
    std::fs::write(&target, "cached").unwrap();
    let retriever = Retriever::new(FakeClient::default(), fast_config(5));

    assert_eq!(retriever.retrieve(&request(), &target).await.unwrap(), Outcome::Skipped);
    assert_eq!(retriever.client().submits.load(Ordering::SeqCst), 0);
    assert_eq!(std::fs::read_to_string(&target).unwrap(), "cached");
}

#[tokio::test]
async fn test_transient_failures_are_retried() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("out.nc");
    let retriever = Retriever::new(
        FakeClient {
            transient_failures: 2,
            ..Default::default()
        },
        fast_config(5),
    );

    retriever.retrieve(&request(), &target).await.unwrap();
    assert_eq!(retriever.client().submits.load(Ordering::SeqCst), 3);
    assert_eq!(std::fs::read_to_string(&target).unwrap(), "job-3");
}

#[tokio::test]
async fn test_gives_up_after_max_attempts() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("out.nc");
    let retriever = Retriever::new(
        FakeClient {
            transient_failures: 10,
            ..Default::default()
        },
        fast_config(3),
    );

    let err = retriever.retrieve(&request(), &target).await.unwrap_err();
    assert!(matches!(err, RetrievalError::Exhausted { attempts: 3, .. }));
    assert!(!target.exists());
}

#[tokio::test]
async fn test_failed_job_is_not_retried() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("out.nc");
    let retriever = Retriever::new(
        FakeClient {
            fail_job: true,
            ..Default::default()
        },
        fast_config(5),
    );

    let err = retriever.retrieve(&request(), &target).await.unwrap_err();
    assert!(matches!(err, RetrievalError::JobFailed { .. }));
    assert_eq!(retriever.client().submits.load(Ordering::SeqCst), 1);
    assert!(!target.exists());
}

#[tokio::test]
async fn test_status_errors_keep_polling_the_same_job() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("out.nc");
    let retriever = Retriever::new(
        FakeClient {
            status_failures: 2,
            polls_before_success: 1,
            ..Default::default()
        },
        fast_config(5),
    );

    retriever.retrieve(&request(), &target).await.unwrap();
    assert_eq!(retriever.client().submits.load(Ordering::SeqCst), 1);
    assert_eq!(retriever.client().polls.load(Ordering::SeqCst), 4);
    assert_eq!(std::fs::read_to_string(&target).unwrap(), "job-1");
}
