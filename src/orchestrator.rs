//! Submit-then-await analysis runs.
//!
//! An [`UploadOrchestrator`] validates an image locally, submits it, polls
//! the returned job to a terminal state and records successful results in the
//! owner's history. Progress is reported as [`Progress`] events; every run
//! ends with exactly one terminal event.

use crate::config::{PollConfig, UploadConfig};
use crate::error::{Error, Result, TransportError};
use crate::history::HistoryStore;
use crate::poller::{PollOutcome, Poller};
use crate::transport::Transport;
use crate::types::{AnalysisResult, HistoryEntry, ImageUpload, ModelVariant, Progress, RequestId};
use crate::validation::validate_upload;
use futures::Stream;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_util::sync::{CancellationToken, DropGuard};

/// Where successful results are recorded
#[derive(Clone)]
struct HistorySink {
    store: HistoryStore,
    owner_key: String,
}

/// Progress channel of one run; a run without listeners emits into nothing
struct Events(Option<mpsc::UnboundedSender<Progress>>);

impl Events {
    fn emit(&self, event: Progress) {
        if let Some(tx) = &self.0 {
            // The listener may have gone away; the run continues regardless
            let _ = tx.send(event);
        }
    }
}

/// Drives one full upload cycle per call
#[derive(Clone)]
pub struct UploadOrchestrator {
    transport: Arc<dyn Transport>,
    poller: Poller,
    upload: UploadConfig,
    variant: ModelVariant,
    history: Option<HistorySink>,
}

impl UploadOrchestrator {
    /// Create an orchestrator submitting through `transport`
    pub fn new(
        transport: Arc<dyn Transport>,
        polling: PollConfig,
        upload: UploadConfig,
        variant: ModelVariant,
    ) -> Self {
        Self {
            transport,
            poller: Poller::new(polling),
            upload,
            variant,
            history: None,
        }
    }

    /// Record successful results in `store` under `owner_key`
    pub fn with_history(mut self, store: HistoryStore, owner_key: impl Into<String>) -> Self {
        self.history = Some(HistorySink {
            store,
            owner_key: owner_key.into(),
        });
        self
    }

    /// Run one analysis to completion without progress events
    pub async fn run(&self, upload: ImageUpload, cancel: &CancellationToken) -> Result<AnalysisResult> {
        self.execute(upload, cancel, &Events(None)).await
    }

    /// Start an analysis in the background
    ///
    /// The returned handle streams progress, can cancel the run, and yields
    /// the final result. Dropping it cancels the run.
    pub fn start(&self, upload: ImageUpload) -> AnalysisHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let orchestrator = self.clone();
        let token = cancel.clone();
        let task = tokio::spawn(async move {
            orchestrator.execute(upload, &token, &Events(Some(tx))).await
        });

        AnalysisHandle {
            events: UnboundedReceiverStream::new(rx),
            guard: cancel.clone().drop_guard(),
            cancel,
            task,
        }
    }

    async fn execute(
        &self,
        upload: ImageUpload,
        cancel: &CancellationToken,
        events: &Events,
    ) -> Result<AnalysisResult> {
        let mut request_id = None;
        let result = self.drive(upload, cancel, events, &mut request_id).await;

        match &result {
            Ok(analysis) => events.emit(Progress::Completed {
                result: Box::new(analysis.clone()),
            }),
            Err(Error::Cancelled) => events.emit(Progress::Cancelled { request_id }),
            Err(e) => {
                tracing::error!(
                    request_id = ?request_id.as_ref().map(RequestId::as_str),
                    error = %e,
                    "analysis ended without a result"
                );
                events.emit(Progress::Failed {
                    request_id,
                    error: e.user_message(),
                })
            }
        }
        result
    }

    async fn drive(
        &self,
        upload: ImageUpload,
        cancel: &CancellationToken,
        events: &Events,
        request_id: &mut Option<RequestId>,
    ) -> Result<AnalysisResult> {
        validate_upload(&upload, &self.upload)?;

        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        events.emit(Progress::Uploading {
            file_name: upload.file_name.clone(),
            size_bytes: upload.size(),
        });

        let receipt = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            receipt = self.transport.submit(&upload, self.variant) => receipt?,
        };
        let id = receipt.request_id.clone();
        *request_id = Some(id.clone());

        tracing::info!(
            request_id = %id,
            node = %receipt.node_label(),
            "image submitted"
        );
        events.emit(Progress::Submitted {
            request_id: id.clone(),
            node: receipt.node_label(),
        });

        let interval = self.poller.config().interval;
        let outcome = self
            .poller
            .poll(self.transport.as_ref(), &id, cancel, |job, attempt| {
                if !job.status.is_terminal() {
                    events.emit(Progress::Polling {
                        request_id: id.clone(),
                        attempt,
                        elapsed: interval * attempt,
                        status: job.status.clone(),
                    });
                }
            })
            .await;

        match outcome {
            PollOutcome::Completed(job) => {
                let result = AnalysisResult::from_job(job).ok_or_else(|| {
                    TransportError::InvalidResponse("completed job carried no result".to_string())
                })?;
                self.record(&result, &upload).await;
                Ok(result)
            }
            PollOutcome::Failed { message, .. } => Err(Error::JobFailed {
                request_id: id,
                message,
            }),
            PollOutcome::TimedOut { attempts } => Err(Error::Timeout {
                request_id: id,
                attempts,
            }),
            PollOutcome::ErrorExhausted {
                last_error,
                attempts,
            } => Err(Error::PollExhausted {
                request_id: id,
                attempts,
                last_error,
            }),
            PollOutcome::Cancelled { .. } => Err(Error::Cancelled),
        }
    }

    async fn record(&self, result: &AnalysisResult, upload: &ImageUpload) {
        let Some(sink) = &self.history else {
            return;
        };
        let entry = HistoryEntry::from_result(result, Some(upload.data_url()), sink.owner_key.clone());
        // A result that arrived is still returned when the local log is unavailable
        if let Err(e) = sink.store.append(&entry).await {
            tracing::warn!(request_id = %result.request_id, error = %e, "failed to record history");
        }
    }
}

/// A running analysis
///
/// Implements [`Stream`] over its [`Progress`] events; the stream ends after
/// the terminal event. Dropping the handle cancels the run.
pub struct AnalysisHandle {
    events: UnboundedReceiverStream<Progress>,
    cancel: CancellationToken,
    guard: DropGuard,
    task: JoinHandle<Result<AnalysisResult>>,
}

impl AnalysisHandle {
    /// Request cancellation; honoured at the next suspension point
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Token that cancels this run when triggered
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Wait for the run to finish, discarding any unread events
    pub async fn result(self) -> Result<AnalysisResult> {
        let AnalysisHandle { guard, task, .. } = self;
        // Waiting for the result must not cancel the run
        guard.disarm();
        task.await
            .map_err(|e| Error::Other(format!("analysis task failed: {}", e)))?
    }
}

impl Stream for AnalysisHandle {
    type Item = Progress;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Progress>> {
        Pin::new(&mut self.events).poll_next(cx)
    }
}
