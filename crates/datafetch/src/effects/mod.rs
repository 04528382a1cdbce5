//! The effectful layer: network transport, lifecycle hooks and the client
//! that ties them to the cache and the rate limiter.

mod client;
mod hooks;
mod transport;

pub use client::Client;
pub use hooks::{FetchHook, Hooks, TracingHook};
#[cfg(feature = "reqwest")]
pub use transport::ReqwestTransport;
pub use transport::{Transport, TransportRequest, TransportResponse};
