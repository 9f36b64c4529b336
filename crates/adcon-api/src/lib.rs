// adcon-api: Async Rust client for the AD admin console backend (REST + SSE)

pub mod error;
pub mod rest;
pub mod sse;
pub mod transport;

pub use error::Error;
pub use rest::RestClient;
