//! Common test utilities for squishfile integration tests

#[allow(dead_code)]
pub mod fixtures;
#[allow(dead_code)]
pub mod service_stub;

#[allow(unused_imports)]
pub use fixtures::*;
#[allow(unused_imports)]
pub use service_stub::*;
