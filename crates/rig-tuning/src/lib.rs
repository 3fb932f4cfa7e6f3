//! Headless tuning harness for `vehicle-rig`.
//!
//! Drives the chase camera through a field of boxes and the lean stabilizer
//! against an inverted-pendulum motorcycle, writing CSV telemetry for each
//! step. The `rig-tuning` binary wraps these scenarios in a CLI.

pub mod bike;
pub mod presets;
pub mod scenario;
pub mod telemetry;
pub mod world;
