//! # BLS Aggregation Service
//!
//! Application service layer that implements the `BlsAggregationApi` trait.
//!
//! ## Architecture
//!
//! This is the hexagonal "application service" that:
//! - Implements the inbound port (`BlsAggregationApi`)
//! - Spawns one [`TaskWorker`] per task and routes signatures to it
//! - Hands the outbound ports (`QuorumStateProvider`, `TaskResponseHasher`,
//!   `SignatureVerifier`) to the workers
//!
//! The routing table is the only state shared between the facade and the
//! workers. Everything else a task touches lives inside its worker.

use crate::adapters::BlstSignatureVerifier;
use crate::config::{BlsAggregatorConfig, ConfigError};
use crate::domain::entities::{BlockNumber, BlsSignature, OperatorId, QuorumNum, TaskIndex, TaskMetadata};
use crate::domain::errors::{AggregationResult, BlsAggregationError};
use crate::metrics;
use crate::ports::inbound::{BlsAggregationApi, BlsAggregationServiceResponse, ResponseStream};
use crate::ports::outbound::{QuorumStateProvider, SignatureVerifier, TaskResponseHasher};
use crate::worker::{SignedTaskResponseDigest, TaskRouteGuard, TaskRoutes, TaskWorker};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

type ResponseReceiver<R> = mpsc::UnboundedReceiver<BlsAggregationServiceResponse<R>>;

/// Aggregation Service.
///
/// Generic over its registry provider, response hasher and verification
/// primitive. The verifier defaults to blst.
pub struct BlsAggregationService<P, H: TaskResponseHasher, V = BlstSignatureVerifier> {
    config: BlsAggregatorConfig,
    provider: Arc<P>,
    hasher: Arc<H>,
    verifier: Arc<V>,
    routes: TaskRoutes<H::Response>,
    response_tx: mpsc::UnboundedSender<BlsAggregationServiceResponse<H::Response>>,
    response_rx: Mutex<Option<ResponseReceiver<H::Response>>>,
}

impl<P, H> BlsAggregationService<P, H, BlstSignatureVerifier>
where
    P: QuorumStateProvider,
    H: TaskResponseHasher,
{
    /// Create a service that verifies signatures with blst.
    ///
    /// # Errors
    /// Returns `ConfigError` if `config` fails validation.
    pub fn new(
        config: BlsAggregatorConfig,
        provider: Arc<P>,
        hasher: H,
    ) -> Result<Self, ConfigError> {
        Self::with_verifier(config, provider, hasher, BlstSignatureVerifier)
    }
}

impl<P, H, V> BlsAggregationService<P, H, V>
where
    P: QuorumStateProvider,
    H: TaskResponseHasher,
    V: SignatureVerifier,
{
    /// Create a service with a custom verification primitive.
    pub fn with_verifier(
        config: BlsAggregatorConfig,
        provider: Arc<P>,
        hasher: H,
        verifier: V,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let (response_tx, response_rx) = mpsc::unbounded_channel();

        Ok(Self {
            config,
            provider,
            hasher: Arc::new(hasher),
            verifier: Arc::new(verifier),
            routes: Arc::new(Mutex::new(HashMap::new())),
            response_tx,
            response_rx: Mutex::new(Some(response_rx)),
        })
    }

    /// Whether a worker for `task_index` is still running.
    pub fn is_task_active(&self, task_index: TaskIndex) -> bool {
        self.routes.lock().contains_key(&task_index)
    }

    pub fn active_task_count(&self) -> usize {
        self.routes.lock().len()
    }

    fn start_task(&self, metadata: TaskMetadata) -> AggregationResult<()> {
        let task_index = metadata.task_index;

        metadata
            .validate()
            .map_err(|reason| BlsAggregationError::InvalidTaskParameters { task_index, reason })?;
        let runtime = Handle::try_current()
            .map_err(|_| BlsAggregationError::RuntimeUnavailable { task_index })?;

        let (sender, inbox) = mpsc::channel(self.config.signature_channel_capacity);
        {
            let mut routes = self.routes.lock();
            if routes.contains_key(&task_index) {
                return Err(BlsAggregationError::AlreadyInitialized { task_index });
            }
            if routes.len() >= self.config.max_active_tasks {
                return Err(BlsAggregationError::TooManyActiveTasks {
                    task_index,
                    limit: self.config.max_active_tasks,
                });
            }
            routes.insert(task_index, sender);
        }
        let route = TaskRouteGuard::new(Arc::clone(&self.routes), task_index);
        metrics::record_task_initialized();

        info!(
            task_index,
            created_at_block = metadata.created_at_block,
            quorums = ?metadata.quorum_numbers,
            expiry_ms = metadata.time_to_expiry.as_millis() as u64,
            window_ms = metadata.window_duration.as_millis() as u64,
            "Task initialized"
        );

        let worker = TaskWorker::new(
            metadata,
            Arc::clone(&self.provider),
            Arc::clone(&self.hasher),
            Arc::clone(&self.verifier),
            inbox,
        );
        runtime.spawn(worker.run(route, self.response_tx.clone()));
        Ok(())
    }
}

#[async_trait]
impl<P, H, V> BlsAggregationApi for BlsAggregationService<P, H, V>
where
    P: QuorumStateProvider,
    H: TaskResponseHasher,
    V: SignatureVerifier,
{
    type TaskResponse = H::Response;

    fn initialize_new_task(
        &self,
        task_index: TaskIndex,
        created_at_block: BlockNumber,
        quorum_numbers: Vec<QuorumNum>,
        quorum_threshold_percentages: Vec<u8>,
        time_to_expiry: Duration,
    ) -> AggregationResult<()> {
        self.start_task(TaskMetadata::new(
            task_index,
            created_at_block,
            quorum_numbers,
            quorum_threshold_percentages,
            time_to_expiry,
        ))
    }

    fn initialize_new_task_with_window(
        &self,
        task_index: TaskIndex,
        created_at_block: BlockNumber,
        quorum_numbers: Vec<QuorumNum>,
        quorum_threshold_percentages: Vec<u8>,
        time_to_expiry: Duration,
        window_duration: Duration,
    ) -> AggregationResult<()> {
        self.start_task(
            TaskMetadata::new(
                task_index,
                created_at_block,
                quorum_numbers,
                quorum_threshold_percentages,
                time_to_expiry,
            )
            .with_window(window_duration),
        )
    }

    async fn process_new_signature(
        &self,
        cancel: &CancellationToken,
        task_index: TaskIndex,
        task_response: Self::TaskResponse,
        signature: BlsSignature,
        operator_id: OperatorId,
    ) -> AggregationResult<()> {
        let sender = self
            .routes
            .lock()
            .get(&task_index)
            .cloned()
            .ok_or(BlsAggregationError::TaskNotFound { task_index })?;

        let (reply, verdict) = oneshot::channel();
        let message = SignedTaskResponseDigest {
            task_response,
            signature,
            operator_id,
            reply,
        };

        let submit = async move {
            sender
                .send(message)
                .await
                .map_err(|_| BlsAggregationError::TaskNotFound { task_index })?;
            verdict
                .await
                .map_err(|_| BlsAggregationError::TaskNotFound { task_index })?
                .map_err(|source| BlsAggregationError::Signature { task_index, source })
        };

        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                debug!(task_index, %operator_id, "Signature submission cancelled");
                Err(BlsAggregationError::Cancelled { task_index })
            }
            result = submit => result,
        }
    }

    fn response_channel(&self) -> Option<ResponseStream<Self::TaskResponse>> {
        self.response_rx
            .lock()
            .take()
            .map(UnboundedReceiverStream::new)
    }
}
