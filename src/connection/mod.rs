//! Feed receivers: one adapter per transport
//!
//! Each receiver owns a publish channel and at most one running session. A
//! session is the receive loop spawned by `start` and torn down by `stop`.

mod imagery;
mod telemetry;


pub use imagery::ImageryReceiver;
pub use telemetry::TelemetryReceiver;
