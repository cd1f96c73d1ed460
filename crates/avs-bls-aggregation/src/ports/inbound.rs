//! # Inbound Ports (Driving Ports / API)
//!
//! The public API of the aggregation service.

use crate::domain::entities::{
    AggregatedTaskResponse, BlockNumber, BlsSignature, OperatorId, QuorumNum, TaskIndex,
};
use crate::domain::errors::{AggregationResult, BlsAggregationError};
use async_trait::async_trait;
use std::time::Duration;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_util::sync::CancellationToken;

/// Terminal outcome of one task, delivered on the response stream.
pub type BlsAggregationServiceResponse<R> = Result<AggregatedTaskResponse<R>, BlsAggregationError>;

/// Stream of terminal task outcomes in the order workers finish.
pub type ResponseStream<R> = UnboundedReceiverStream<BlsAggregationServiceResponse<R>>;

/// Primary aggregation API.
///
/// Implementations must be thread-safe (`Send + Sync`). Task initialization
/// must happen inside a Tokio runtime since each task gets its own worker.
#[async_trait]
pub trait BlsAggregationApi: Send + Sync {
    /// Response value operators sign over.
    type TaskResponse: Send + 'static;

    /// Start a task that finalizes as soon as every quorum meets its threshold.
    ///
    /// `time_to_expiry` is measured from the moment the worker has fetched the
    /// operator and quorum snapshots at `created_at_block`, not from this call.
    /// A slow provider delays expiry by the time those fetches take.
    ///
    /// # Errors
    /// * `AlreadyInitialized` - a task with `task_index` is still running
    /// * `InvalidTaskParameters` - quorum numbers and thresholds do not line up
    fn initialize_new_task(
        &self,
        task_index: TaskIndex,
        created_at_block: BlockNumber,
        quorum_numbers: Vec<QuorumNum>,
        quorum_threshold_percentages: Vec<u8>,
        time_to_expiry: Duration,
    ) -> AggregationResult<()>;

    /// Start a task that, once thresholds are first met, keeps admitting
    /// signatures for `window_duration` before finalizing (or until expiry).
    ///
    /// Expiry is measured as for [`BlsAggregationApi::initialize_new_task`].
    fn initialize_new_task_with_window(
        &self,
        task_index: TaskIndex,
        created_at_block: BlockNumber,
        quorum_numbers: Vec<QuorumNum>,
        quorum_threshold_percentages: Vec<u8>,
        time_to_expiry: Duration,
        window_duration: Duration,
    ) -> AggregationResult<()>;

    /// Submit an operator's signature and wait for the worker's verdict.
    ///
    /// Returns `Cancelled` if `cancel` fires first. The worker may still have
    /// consumed the submission in that case.
    async fn process_new_signature(
        &self,
        cancel: &CancellationToken,
        task_index: TaskIndex,
        task_response: Self::TaskResponse,
        signature: BlsSignature,
        operator_id: OperatorId,
    ) -> AggregationResult<()>;

    /// Take the single stream of terminal task outcomes.
    ///
    /// Returns `None` once the stream has already been handed out.
    fn response_channel(&self) -> Option<ResponseStream<Self::TaskResponse>>;
}
