//! Scripted [`Transport`] for poller and orchestrator tests.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::Transport;
use crate::credentials::Credential;
use crate::error::TransportError;
use crate::types::{ImageUpload, Job, JobStatus, ModelVariant, RequestId, ResultPayload, SubmitReceipt};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

type PollResult = Result<Job, TransportError>;

/// Answers status checks from a script, then keeps answering `processing`
pub(crate) struct ScriptedTransport {
    submit_result: Mutex<Option<Result<SubmitReceipt, TransportError>>>,
    script: Mutex<VecDeque<PollResult>>,
    submits: AtomicU32,
    polls: AtomicU32,
    in_flight: AtomicBool,
    overlapped: AtomicBool,
    latency: Duration,
}

impl ScriptedTransport {
    pub(crate) fn new(script: Vec<PollResult>) -> Self {
        Self {
            submit_result: Mutex::new(None),
            script: Mutex::new(script.into()),
            submits: AtomicU32::new(0),
            polls: AtomicU32::new(0),
            in_flight: AtomicBool::new(false),
            overlapped: AtomicBool::new(false),
            latency: Duration::ZERO,
        }
    }

    /// Make `submit` fail with `error`
    pub(crate) fn failing_submit(self, error: TransportError) -> Self {
        *self.submit_result.lock().unwrap() = Some(Err(error));
        self
    }

    /// Delay every status check by `latency`
    pub(crate) fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub(crate) fn submits(&self) -> u32 {
        self.submits.load(Ordering::SeqCst)
    }

    pub(crate) fn polls(&self) -> u32 {
        self.polls.load(Ordering::SeqCst)
    }

    pub(crate) fn overlapped(&self) -> bool {
        self.overlapped.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn submit(
        &self,
        _upload: &ImageUpload,
        _variant: ModelVariant,
    ) -> Result<SubmitReceipt, TransportError> {
        self.submits.fetch_add(1, Ordering::SeqCst);
        self.submit_result.lock().unwrap().clone().unwrap_or_else(|| {
            Ok(SubmitReceipt {
                request_id: RequestId::from("r1"),
                status: Some(JobStatus::Queued),
                assigned_to_node: None,
            })
        })
    }

    async fn poll_once(&self, request_id: &RequestId) -> PollResult {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            self.overlapped.store(true, Ordering::SeqCst);
        }
        self.polls.fetch_add(1, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let next = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(job(request_id.as_str(), JobStatus::Processing)));
        self.in_flight.store(false, Ordering::SeqCst);
        next
    }

    async fn validate_credential(&self, _credential: &Credential) -> bool {
        true
    }
}

pub(crate) fn job(id: &str, status: JobStatus) -> Job {
    Job {
        request_id: RequestId::from(id),
        status,
        result: None,
        error_message: None,
    }
}

pub(crate) fn processing() -> PollResult {
    Ok(job("r1", JobStatus::Processing))
}

pub(crate) fn network_err() -> PollResult {
    Err(TransportError::Network("connection reset".to_string()))
}

/// A completed job for `r1` labelled Melanoma at 0.87
pub(crate) fn completed() -> Job {
    Job {
        result: Some(ResultPayload {
            label: "Melanoma".to_string(),
            confidence: 0.87,
            completed_at: Some("2024-05-01T09:15:00Z".to_string()),
            extra: None,
        }),
        ..job("r1", JobStatus::Completed)
    }
}
