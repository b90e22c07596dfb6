//! Remote Module
//!
//! Client side of the remote statistics service: a one-shot transport, the
//! retrying client on top of it and the endpoint catalogue.

pub mod api;
pub mod client;
pub mod error;
pub mod transport;

pub use api::{Endpoint, StatsApi};
pub use client::{ResilientClient, RetryPolicy, RETRYABLE_STATUSES};
pub use error::{FetchError, TransientFailure};
pub use transport::{ApiResponse, HttpTransport, Method, Transport, TransportError, API_KEY_HEADER};
