//! Task response hashers.
//!
//! [`Keccak256TaskResponseHasher`] covers any serde-serializable response.
//! [`TaskResponseHashFn`] adapts a closure when the digest must match an
//! externally defined encoding, such as a contract's ABI layout.

use crate::domain::entities::TaskResponseDigest;
use crate::domain::errors::HashError;
use crate::ports::outbound::TaskResponseHasher;
use serde::Serialize;
use sha3::{Digest, Keccak256};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// keccak256 over the bincode encoding of the response.
pub struct Keccak256TaskResponseHasher<R> {
    _response: PhantomData<fn() -> R>,
}

impl<R> Keccak256TaskResponseHasher<R> {
    pub fn new() -> Self {
        Self {
            _response: PhantomData,
        }
    }
}

impl<R> Default for Keccak256TaskResponseHasher<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> Clone for Keccak256TaskResponseHasher<R> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<R> fmt::Debug for Keccak256TaskResponseHasher<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keccak256TaskResponseHasher").finish()
    }
}

impl<R> TaskResponseHasher for Keccak256TaskResponseHasher<R>
where
    R: Serialize + Clone + fmt::Debug + Send + Sync + 'static,
{
    type Response = R;

    fn digest(&self, response: &R) -> Result<TaskResponseDigest, HashError> {
        let encoded =
            bincode::serialize(response).map_err(|e| HashError::Encoding(e.to_string()))?;
        Ok(keccak256(&encoded))
    }
}

/// Keccak256 hash function.
pub fn keccak256(data: &[u8]) -> TaskResponseDigest {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&result);
    hash
}

type HashFn<R> = dyn Fn(&R) -> Result<TaskResponseDigest, HashError> + Send + Sync;

/// Hasher backed by a caller-supplied function.
pub struct TaskResponseHashFn<R> {
    hash: Arc<HashFn<R>>,
}

impl<R> TaskResponseHashFn<R> {
    pub fn new<F>(hash: F) -> Self
    where
        F: Fn(&R) -> Result<TaskResponseDigest, HashError> + Send + Sync + 'static,
    {
        Self {
            hash: Arc::new(hash),
        }
    }
}

impl<R> Clone for TaskResponseHashFn<R> {
    fn clone(&self) -> Self {
        Self {
            hash: Arc::clone(&self.hash),
        }
    }
}

impl<R> fmt::Debug for TaskResponseHashFn<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskResponseHashFn").finish_non_exhaustive()
    }
}

impl<R> TaskResponseHasher for TaskResponseHashFn<R>
where
    R: Clone + fmt::Debug + Send + Sync + 'static,
{
    type Response = R;

    fn digest(&self, response: &R) -> Result<TaskResponseDigest, HashError> {
        (self.hash)(response)
    }
}
