//! Periodic monitors.
//!
//! Both monitors talk to the state machine core through its serialized
//! entry points, so their corrections never interleave with each other or
//! with trigger-driven transitions.

pub mod health;
pub mod stuck;

pub use health::HealthMonitor;
pub use stuck::StuckMonitor;
