//! Motion-command supervisor for a hexapod robot.
//!
//! Many concurrent control requests (movement, height, pan/tilt, lighting
//! and sound effects, scripted presets) drive one shared set of actuators.
//! This crate keeps them from corrupting state or issuing conflicting
//! hardware calls:
//!
//! - [`state::ControlContext`] – the single lock-protected state store,
//!   constructed once at startup and injected into every component.
//! - [`gate::GatedActuator`] – the cooperative stop gate wrapping the real
//!   actuator; while engaged, every motion call is silently dropped.
//! - [`worker`] – the latest-wins command slot drained by one perpetual
//!   background task at a fixed tick.
//! - [`effects`] – supervised LED/buzzer sequencers that poll the stop
//!   gate between steps.
//! - [`presets`] – scripted timelines combining motion, pan/tilt, LED and
//!   buzzer actions.
//! - [`supervisor::Supervisor`] – the operation surface exposed to the
//!   request layer.

pub mod effects;
pub mod gate;
pub mod presets;
pub mod state;
pub mod supervisor;
pub mod worker;

pub use state::{ControlConfig, ControlContext};
pub use supervisor::{HardwareSet, Supervisor};
