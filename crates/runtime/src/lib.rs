pub mod metrics;
pub mod poller;
pub mod store;

pub use metrics::*;
pub use poller::*;
pub use store::*;
