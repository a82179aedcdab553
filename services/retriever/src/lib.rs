//! Retrieval of climate data from the Copernicus Climate Data Store.
//!
//! [`RetrievalRequest`] builds the dataset-specific request of each climate
//! source, [`Retriever`] submits it through an [`ArchiveClient`], waits for
//! the job and places the result at its canonical path.

pub mod client;
pub mod error;
pub mod request;
pub mod retrieve;

pub use client::{ArchiveClient, CdsClient, JobStatus, DEFAULT_CDS_URL};
pub use error::{RetrievalError, RetrievalResult};
pub use request::RetrievalRequest;
pub use retrieve::{Outcome, RetryConfig, Retriever};
