//! # Ports Layer
//!
//! Trait definitions for the hexagonal architecture.
//! - **Inbound (Driving)**: API that external callers use
//! - **Outbound (Driven)**: Dependencies this service needs

pub mod inbound;
pub mod outbound;

pub use inbound::{BlsAggregationApi, BlsAggregationServiceResponse, ResponseStream};
pub use outbound::{ProviderError, QuorumStateProvider, SignatureVerifier, TaskResponseHasher};
