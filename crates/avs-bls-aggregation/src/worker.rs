//! # Per-Task Worker
//!
//! Each task runs in its own tokio task that exclusively owns the task's
//! state. The facade reaches it only through the task's inbox.
//!
//! ## Lifecycle
//!
//! ```text
//! fetch snapshot ──► Collecting ──(thresholds met)──► WindowOpen ──(window | expiry)──► finalize
//!                        │                                                               │
//!                        └──────────────(expiry)──► TaskExpired                          ▼
//!                                                                        indices ──► response
//! ```
//!
//! On exit the worker removes its route before pushing its single response,
//! so a caller that reads the response never sees the task as still active.

use crate::domain::aggregate::TaskSnapshot;
use crate::domain::entities::{BlsSignature, OperatorId, TaskIndex, TaskMetadata};
use crate::domain::errors::{BlsAggregationError, SignatureVerificationError};
use crate::domain::task_state::TaskState;
use crate::metrics;
use crate::ports::inbound::BlsAggregationServiceResponse;
use crate::ports::outbound::{QuorumStateProvider, SignatureVerifier, TaskResponseHasher};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{self, Instant};
use tracing::{debug, error, info, warn};

/// A signed response on its way to the owning worker.
pub(crate) struct SignedTaskResponseDigest<R> {
    pub task_response: R,
    pub signature: BlsSignature,
    pub operator_id: OperatorId,
    /// Receives the verification verdict.
    pub reply: oneshot::Sender<Result<(), SignatureVerificationError>>,
}

pub(crate) type TaskSender<R> = mpsc::Sender<SignedTaskResponseDigest<R>>;

/// Routing table shared between the facade and the workers.
pub(crate) type TaskRoutes<R> = Arc<Mutex<HashMap<TaskIndex, TaskSender<R>>>>;

/// Removes a task's route when dropped, including when the worker panics.
pub(crate) struct TaskRouteGuard<R> {
    routes: TaskRoutes<R>,
    task_index: TaskIndex,
    outcome: &'static str,
}

impl<R> TaskRouteGuard<R> {
    pub(crate) fn new(routes: TaskRoutes<R>, task_index: TaskIndex) -> Self {
        Self {
            routes,
            task_index,
            outcome: "aborted",
        }
    }

    fn finish(mut self, outcome: &'static str) {
        self.outcome = outcome;
    }
}

impl<R> Drop for TaskRouteGuard<R> {
    fn drop(&mut self) {
        self.routes.lock().remove(&self.task_index);
        metrics::record_task_completed(self.outcome);
        debug!(task_index = self.task_index, "Task route removed");
    }
}

/// Owns one task from snapshot to response.
pub(crate) struct TaskWorker<P, H: TaskResponseHasher, V> {
    metadata: TaskMetadata,
    provider: Arc<P>,
    hasher: Arc<H>,
    verifier: Arc<V>,
    inbox: mpsc::Receiver<SignedTaskResponseDigest<H::Response>>,
}

impl<P, H, V> TaskWorker<P, H, V>
where
    P: QuorumStateProvider,
    H: TaskResponseHasher,
    V: SignatureVerifier,
{
    pub(crate) fn new(
        metadata: TaskMetadata,
        provider: Arc<P>,
        hasher: Arc<H>,
        verifier: Arc<V>,
        inbox: mpsc::Receiver<SignedTaskResponseDigest<H::Response>>,
    ) -> Self {
        Self {
            metadata,
            provider,
            hasher,
            verifier,
            inbox,
        }
    }

    /// Run to completion, deregister, then emit the task's response.
    pub(crate) async fn run(
        mut self,
        route: TaskRouteGuard<H::Response>,
        responses: mpsc::UnboundedSender<BlsAggregationServiceResponse<H::Response>>,
    ) {
        let task_index = self.metadata.task_index;
        let result = self.aggregate().await;

        // Queued submitters see their reply slot dropped.
        self.inbox.close();
        drop(self.inbox);

        let outcome = match &result {
            Ok(_) => "completed",
            Err(e) => e.outcome(),
        };
        route.finish(outcome);

        if responses.send(result).is_err() {
            debug!(task_index, "Response receiver dropped, discarding result");
        }
    }

    async fn aggregate(&mut self) -> BlsAggregationServiceResponse<H::Response> {
        let task_index = self.metadata.task_index;
        let window_duration = self.metadata.window_duration;

        let snapshot = self.fetch_snapshot().await?;
        debug!(
            task_index,
            operators = snapshot.operators.len(),
            "Fetched registry snapshot"
        );
        let mut state = TaskState::new(self.metadata.clone(), snapshot);

        let expiry = time::sleep(self.metadata.time_to_expiry);
        tokio::pin!(expiry);
        let window = time::sleep(window_duration);
        tokio::pin!(window);
        let mut window_open = false;

        loop {
            tokio::select! {
                biased;

                _ = &mut expiry => {
                    if state.has_winner() {
                        info!(task_index, "Task expired with thresholds met, finalizing");
                        break;
                    }
                    warn!(task_index, "Task expired before reaching quorum");
                    return Err(BlsAggregationError::TaskExpired { task_index });
                }

                _ = &mut window, if window_open => {
                    info!(task_index, "Window closed, finalizing");
                    break;
                }

                Some(message) = self.inbox.recv() => {
                    let SignedTaskResponseDigest {
                        task_response,
                        signature,
                        operator_id,
                        reply,
                    } = message;

                    let verdict = state.process_signature(
                        self.hasher.as_ref(),
                        self.verifier.as_ref(),
                        operator_id,
                        task_response,
                        signature,
                    );

                    let mut finalize_now = false;
                    match &verdict {
                        Ok(accepted) => {
                            metrics::record_signature_accepted();
                            debug!(task_index, %operator_id, "Signature accepted");

                            if accepted.thresholds_met && !window_open {
                                window_open = true;
                                if window_duration.is_zero() {
                                    info!(task_index, "Stake thresholds met");
                                    finalize_now = true;
                                } else {
                                    info!(
                                        task_index,
                                        window_ms = window_duration.as_millis() as u64,
                                        "Stake thresholds met, window opened"
                                    );
                                    window.as_mut().reset(Instant::now() + window_duration);
                                }
                            }
                        }
                        Err(e) => {
                            metrics::record_signature_rejected(e.reason());
                            debug!(task_index, %operator_id, error = %e, "Signature rejected");
                        }
                    }

                    if reply.send(verdict.map(|_| ())).is_err() {
                        debug!(task_index, %operator_id, "Submitter went away before the verdict");
                    }
                    if finalize_now {
                        break;
                    }
                }
            }
        }

        self.finalize(&state).await
    }

    async fn fetch_snapshot(&self) -> Result<TaskSnapshot, BlsAggregationError> {
        let task_index = self.metadata.task_index;
        let quorum_numbers = &self.metadata.quorum_numbers;
        let block_number = self.metadata.created_at_block;

        let operators = self
            .provider
            .get_operators_avs_state_at_block(quorum_numbers, block_number)
            .await
            .map_err(|e| {
                error!(task_index, block_number, error = %e, "Failed to fetch operator state");
                BlsAggregationError::OperatorsStateRetrieval {
                    task_index,
                    reason: e.to_string(),
                }
            })?;

        let quorums = self
            .provider
            .get_quorums_avs_state_at_block(quorum_numbers, block_number)
            .await
            .map_err(|e| {
                error!(task_index, block_number, error = %e, "Failed to fetch quorum state");
                BlsAggregationError::QuorumsStateRetrieval {
                    task_index,
                    reason: e.to_string(),
                }
            })?;

        TaskSnapshot::new(quorum_numbers, operators, &quorums).map_err(|missing| {
            error!(task_index, quorum = %missing, "Quorum state incomplete");
            BlsAggregationError::QuorumsStateRetrieval {
                task_index,
                reason: format!("no state returned for quorum {}", missing),
            }
        })
    }

    async fn finalize(
        &self,
        state: &TaskState<H::Response>,
    ) -> BlsAggregationServiceResponse<H::Response> {
        let task_index = self.metadata.task_index;
        let (non_signer_operator_ids, _) = state
            .winning_non_signers()
            .ok_or(BlsAggregationError::TaskExpired { task_index })?;

        let indices = self
            .provider
            .get_check_signatures_indices(
                self.metadata.created_at_block,
                &self.metadata.quorum_numbers,
                &non_signer_operator_ids,
            )
            .await
            .map_err(|e| {
                error!(task_index, error = %e, "Failed to fetch check-signature indices");
                BlsAggregationError::IndicesRetrieval {
                    task_index,
                    reason: e.to_string(),
                }
            })?;

        let response = state
            .build_response(indices)
            .ok_or(BlsAggregationError::TaskExpired { task_index })?;
        info!(
            task_index,
            non_signers = response.non_signer_operator_ids.len(),
            "Task aggregated"
        );
        Ok(response)
    }
}
