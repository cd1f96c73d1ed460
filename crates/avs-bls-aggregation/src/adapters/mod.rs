//! # Adapters Module
//!
//! Infrastructure adapters implementing the outbound ports.

pub mod blst_verifier;
pub mod in_memory_provider;
pub mod keccak_hasher;

pub use blst_verifier::BlstSignatureVerifier;
pub use in_memory_provider::InMemoryQuorumStateProvider;
pub use keccak_hasher::{keccak256, Keccak256TaskResponseHasher, TaskResponseHashFn};
