pub mod account;
pub mod metrics;
pub mod redis;
pub mod review_scheduler;
pub mod usage_limiter;

pub use account::*;
pub use metrics::*;
pub use redis::*;
pub use review_scheduler::*;
pub use usage_limiter::*;
