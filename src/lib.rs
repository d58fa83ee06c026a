//! # skinia-client
//!
//! Async client library for the Skin IA image-analysis service.
//!
//! ## Design Philosophy
//!
//! skinia-client is designed to be:
//! - **Library-first** - No UI, purely a Rust crate for embedding in a front end
//! - **Typed outcomes** - Every failure resolves to an [`Error`] with a display message
//! - **Stream-driven** - An analysis is a cancellable stream of [`Progress`] events
//! - **Sensible defaults** - 2 s polling, 60 attempts, 5 tolerated errors, 20 history entries
//!
//! ## Quick Start
//!
//! ```no_run
//! use futures::StreamExt;
//! use skinia_client::{Config, ImageUpload, Progress, SkinIaClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = SkinIaClient::new(Config::default()).await?;
//!     client.set_api_url("https://abc123.ngrok-free.app").await?;
//!     client.login("sk_live_...").await?;
//!
//!     let upload = ImageUpload::from_path("mole.jpg".as_ref()).await?;
//!     let mut analysis = client.analyze(upload).await?;
//!     while let Some(event) = analysis.next().await {
//!         if let Progress::Polling { elapsed, .. } = &event {
//!             println!("still analysing after {}s", elapsed.as_secs());
//!         }
//!     }
//!
//!     let result = analysis.result().await?;
//!     println!("{} ({:.0}%)", result.label, result.confidence * 100.0);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Client facade (session, analysis, history, cluster dashboard)
pub mod client;
/// Configuration types
pub mod config;
/// API key handling
pub mod credentials;
/// Database persistence layer
pub mod db;
/// Error types
pub mod error;
/// Per-credential result history
pub mod history;
/// Result display helpers
pub mod insights;
/// Submit-then-await analysis runs
pub mod orchestrator;
/// Job status polling
pub mod poller;
/// HTTP transport to the backend
pub mod transport;
/// Core types and progress events
pub mod types;
/// Local input validation
pub mod validation;

// Re-export commonly used types
pub use client::{Session, SkinIaClient};
pub use config::{ApiConfig, Config, HistoryConfig, PersistenceConfig, PollConfig, UploadConfig};
pub use credentials::{Credential, CredentialStore};
pub use db::Database;
pub use error::{DatabaseError, Error, IsTransient, Result, TransportError, ValidationError};
pub use history::HistoryStore;
pub use insights::{ConditionInfo, ConfidenceLevel, Severity};
pub use orchestrator::{AnalysisHandle, UploadOrchestrator};
pub use poller::{PollOutcome, Poller};
pub use transport::{HttpTransport, Transport};
pub use types::{
    AnalysisResult, ClusterStatus, DistributedStatus, HistoryEntry, ImageUpload, Job, JobStatus,
    ModelVariant, Progress, Registration, RequestId, SubmitReceipt,
};
