//! Job status polling
//!
//! One poll session drives a job from submission to a terminal outcome:
//!
//! 1. wait `interval`, then perform one status check (`attempt += 1`)
//! 2. a successful check resets the consecutive-error count and is reported to
//!    the progress callback; `completed` and `failed` end the session, any
//!    other status continues until `max_attempts` is reached
//! 3. a failed check is logged and swallowed until `max_consecutive_errors`
//!    failures in a row (or `max_attempts` total) end the session
//!
//! The loop awaits each check before starting the next delay, so at most one
//! request per session is ever outstanding. Cancellation is observed at every
//! suspension point and stops the session without another request.
//!
//! # Example
//!
//! ```no_run
//! use skinia_client::config::PollConfig;
//! use skinia_client::poller::{PollOutcome, Poller};
//! use skinia_client::transport::Transport;
//! use skinia_client::types::RequestId;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example(transport: &dyn Transport) {
//! let poller = Poller::new(PollConfig::default());
//! let cancel = CancellationToken::new();
//! let outcome = poller
//!     .poll(transport, &RequestId::from("req-1"), &cancel, |job, attempt| {
//!         println!("attempt {attempt}: {:?}", job.status);
//!     })
//!     .await;
//! if let PollOutcome::Completed(job) = outcome {
//!     println!("done: {:?}", job.result);
//! }
//! # }
//! ```

use crate::config::PollConfig;
use crate::error::{DEFAULT_FAILURE_MESSAGE, IsTransient, TransportError};
use crate::transport::Transport;
use crate::types::{Job, JobStatus, RequestId};
use tokio_util::sync::CancellationToken;

/// Terminal result of a poll session
#[derive(Clone, Debug, PartialEq)]
pub enum PollOutcome {
    /// The job completed; carries the final job as returned by the server
    Completed(Job),

    /// The server reported the job as failed
    Failed {
        /// The final job
        job: Job,
        /// Server message, or the default failure text
        message: String,
    },

    /// `max_attempts` status checks ran without a terminal status
    TimedOut {
        /// Status checks performed
        attempts: u32,
    },

    /// Status checks kept failing
    ErrorExhausted {
        /// The error from the final check
        last_error: TransportError,
        /// Status checks performed
        attempts: u32,
    },

    /// The session's cancellation token fired
    Cancelled {
        /// Status checks performed before cancellation
        attempts: u32,
    },
}

/// Fixed-interval status poller
#[derive(Clone, Debug)]
pub struct Poller {
    config: PollConfig,
}

impl Poller {
    /// Create a poller with the given bounds
    pub fn new(config: PollConfig) -> Self {
        Self { config }
    }

    /// Bounds this poller runs with
    pub fn config(&self) -> &PollConfig {
        &self.config
    }

    /// Poll `request_id` until it reaches a terminal outcome
    ///
    /// `on_progress` sees every successfully fetched job with its 1-based
    /// attempt number, including the terminal one.
    pub async fn poll<F>(
        &self,
        transport: &dyn Transport,
        request_id: &RequestId,
        cancel: &CancellationToken,
        mut on_progress: F,
    ) -> PollOutcome
    where
        F: FnMut(&Job, u32),
    {
        let mut attempts: u32 = 0;
        let mut consecutive_errors: u32 = 0;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return self.cancelled(request_id, attempts),
                _ = tokio::time::sleep(self.config.interval) => {}
            }

            attempts += 1;

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return self.cancelled(request_id, attempts),
                result = transport.poll_once(request_id) => result,
            };

            match result {
                Ok(job) => {
                    consecutive_errors = 0;
                    on_progress(&job, attempts);

                    match job.status {
                        JobStatus::Completed => {
                            tracing::info!(request_id = %request_id, attempts, "analysis completed");
                            return PollOutcome::Completed(job);
                        }
                        JobStatus::Failed => {
                            let message = job
                                .error_message
                                .clone()
                                .filter(|m| !m.is_empty())
                                .unwrap_or_else(|| DEFAULT_FAILURE_MESSAGE.to_string());
                            tracing::error!(
                                request_id = %request_id,
                                attempts,
                                error = %message,
                                "analysis failed on server"
                            );
                            return PollOutcome::Failed { job, message };
                        }
                        _ if attempts >= self.config.max_attempts => {
                            tracing::error!(
                                request_id = %request_id,
                                attempts,
                                "analysis did not finish within the attempt limit"
                            );
                            return PollOutcome::TimedOut { attempts };
                        }
                        _ => {
                            tracing::debug!(
                                request_id = %request_id,
                                attempt = attempts,
                                status = ?job.status,
                                "analysis still running"
                            );
                        }
                    }
                }
                Err(e) => {
                    consecutive_errors += 1;

                    if consecutive_errors >= self.config.max_consecutive_errors
                        || attempts >= self.config.max_attempts
                    {
                        tracing::error!(
                            request_id = %request_id,
                            attempts,
                            consecutive_errors,
                            error = %e,
                            "status checks exhausted"
                        );
                        return PollOutcome::ErrorExhausted {
                            last_error: e,
                            attempts,
                        };
                    }

                    tracing::warn!(
                        request_id = %request_id,
                        attempt = attempts,
                        consecutive_errors,
                        max_consecutive_errors = self.config.max_consecutive_errors,
                        transient = e.is_transient(),
                        error = %e,
                        "status check failed, will retry"
                    );
                }
            }
        }
    }

    fn cancelled(&self, request_id: &RequestId, attempts: u32) -> PollOutcome {
        tracing::info!(request_id = %request_id, attempts, "polling cancelled");
        PollOutcome::Cancelled { attempts }
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::testing::{ScriptedTransport, completed, job, network_err, processing};
    use std::time::Duration;

    fn fast(max_attempts: u32, max_consecutive_errors: u32) -> Poller {
        Poller::new(PollConfig {
            interval: Duration::from_millis(1),
            max_attempts,
            max_consecutive_errors,
        })
    }

    async fn run(poller: &Poller, transport: &ScriptedTransport) -> (PollOutcome, Vec<u32>) {
        let mut seen = Vec::new();
        let outcome = poller
            .poll(
                transport,
                &RequestId::from("r1"),
                &CancellationToken::new(),
                |_, attempt| seen.push(attempt),
            )
            .await;
        (outcome, seen)
    }

    #[tokio::test]
    async fn completed_returns_payload_and_stops() {
        let transport = ScriptedTransport::new(vec![processing(), processing(), Ok(completed())]);
        let (outcome, seen) = run(&fast(60, 5), &transport).await;

        assert_eq!(outcome, PollOutcome::Completed(completed()));
        assert_eq!(transport.polls(), 3);
        assert_eq!(seen, vec![1, 2, 3]);

        // Nothing keeps polling after resolution
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(transport.polls(), 3);
    }

    #[tokio::test]
    async fn failed_uses_server_message() {
        let failed = Job {
            error_message: Some("Model crashed".to_string()),
            ..job("r1", JobStatus::Failed)
        };
        let transport = ScriptedTransport::new(vec![processing(), Ok(failed.clone())]);
        let (outcome, _) = run(&fast(60, 5), &transport).await;

        assert_eq!(
            outcome,
            PollOutcome::Failed {
                job: failed,
                message: "Model crashed".to_string()
            }
        );
        assert_eq!(transport.polls(), 2);
    }

    #[tokio::test]
    async fn failed_without_message_uses_default() {
        let transport = ScriptedTransport::new(vec![Ok(job("r1", JobStatus::Failed))]);
        let (outcome, _) = run(&fast(60, 5), &transport).await;

        match outcome {
            PollOutcome::Failed { message, .. } => assert_eq!(message, DEFAULT_FAILURE_MESSAGE),
            other => panic!("expected failure, got {:?}", other),
        }
        assert_eq!(transport.polls(), 1);
    }

    #[tokio::test]
    async fn times_out_exactly_at_max_attempts() {
        let transport = ScriptedTransport::new(vec![]);
        let (outcome, seen) = run(&fast(4, 5), &transport).await;

        assert_eq!(outcome, PollOutcome::TimedOut { attempts: 4 });
        assert_eq!(transport.polls(), 4);
        assert_eq!(seen, vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn consecutive_errors_exhaust() {
        let transport = ScriptedTransport::new(vec![
            network_err(),
            network_err(),
            network_err(),
            network_err(),
            network_err(),
        ]);
        let (outcome, seen) = run(&fast(60, 5), &transport).await;

        assert_eq!(
            outcome,
            PollOutcome::ErrorExhausted {
                last_error: TransportError::Network("connection reset".to_string()),
                attempts: 5
            }
        );
        assert_eq!(transport.polls(), 5);
        assert!(seen.is_empty());
    }

    #[tokio::test]
    async fn success_resets_error_count() {
        // e, e, s, e, e, e, e: only the last four count, so polling continues
        let transport = ScriptedTransport::new(vec![
            network_err(),
            network_err(),
            processing(),
            network_err(),
            network_err(),
            network_err(),
            network_err(),
            Ok(completed()),
        ]);
        let (outcome, seen) = run(&fast(60, 5), &transport).await;

        assert_eq!(outcome, PollOutcome::Completed(completed()));
        assert_eq!(transport.polls(), 8);
        assert_eq!(seen, vec![3, 8]);
    }

    #[tokio::test]
    async fn error_on_last_attempt_exhausts() {
        let transport = ScriptedTransport::new(vec![processing(), processing(), network_err()]);
        let (outcome, _) = run(&fast(3, 5), &transport).await;

        assert!(matches!(
            outcome,
            PollOutcome::ErrorExhausted { attempts: 3, .. }
        ));
    }

    #[tokio::test]
    async fn interstitial_pages_are_absorbed() {
        let interstitial = || Err(TransportError::Interstitial { status: Some(200) });
        let transport =
            ScriptedTransport::new(vec![interstitial(), interstitial(), Ok(completed())]);
        let (outcome, _) = run(&fast(60, 5), &transport).await;

        assert!(matches!(outcome, PollOutcome::Completed(_)));
    }

    #[tokio::test]
    async fn cancellation_stops_polling() {
        let transport = ScriptedTransport::new(vec![]);
        let poller = Poller::new(PollConfig {
            interval: Duration::from_millis(5),
            max_attempts: 1000,
            max_consecutive_errors: 5,
        });
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            trigger.cancel();
        });

        let outcome = poller
            .poll(&transport, &RequestId::from("r1"), &cancel, |_, _| {})
            .await;

        let calls = match outcome {
            PollOutcome::Cancelled { attempts } => attempts,
            other => panic!("expected cancellation, got {:?}", other),
        };
        assert!(calls < 1000);

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(transport.polls() <= calls);
    }

    #[tokio::test]
    async fn cancelled_before_first_check_makes_no_request() {
        let transport = ScriptedTransport::new(vec![]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome = fast(60, 5)
            .poll(&transport, &RequestId::from("r1"), &cancel, |_, _| {})
            .await;

        assert_eq!(outcome, PollOutcome::Cancelled { attempts: 0 });
        assert_eq!(transport.polls(), 0);
    }

    #[tokio::test]
    async fn slow_checks_never_overlap() {
        // Each check takes far longer than the interval
        let transport = ScriptedTransport::new(vec![]).with_latency(Duration::from_millis(10));
        let (outcome, _) = run(&fast(5, 5), &transport).await;

        assert_eq!(outcome, PollOutcome::TimedOut { attempts: 5 });
        assert!(!transport.overlapped());
    }
}
