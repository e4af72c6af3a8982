//! Remote compression service
//!
//! The pipeline talks to the service only through the [`CompressionService`] trait,
//! so tests and embedders can swap in their own implementation.
//!
//! - [`HttpCompressionService`]: the service's HTTP API via `reqwest`

mod http;
mod traits;

pub use http::HttpCompressionService;
pub use traits::CompressionService;
