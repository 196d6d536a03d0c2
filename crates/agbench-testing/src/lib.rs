//! Testing infrastructure for agbench integration tests.
//!
//! - `drivers`: a recording wrapper and fault-injecting drivers
//! - `models`: scripted and slow model handlers
//! - `fixtures`: embedded sample scenarios and scenario file writers

pub mod drivers;
pub mod fixtures;
pub mod models;

pub use drivers::{DriverCall, FlakyDriver, RecordingDriver};
pub use models::{ScriptedModelHandler, SlowModelHandler};
