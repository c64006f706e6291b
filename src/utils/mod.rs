pub mod error;
pub mod logging;
pub mod rate_limiter;
pub mod retry;
pub mod rpc;
