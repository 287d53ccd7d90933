//! Session orchestration module.

mod orchestrator;
mod stats;

pub use orchestrator::{Gateway, GatewayOptions};
pub use stats::GatewayStats;
