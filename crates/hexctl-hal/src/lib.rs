//! Hardware abstraction layer for the hexapod controller.
//!
//! The rest of the stack only ever talks to the traits in this crate, so
//! real drivers (servo controller, gait engine, LED strip, buzzer, sensors)
//! can be swapped for the in-process [`sim`] stubs without touching the
//! supervisor or the sequencers.

pub mod actuator;
pub mod peripherals;
pub mod sensors;
pub mod sim;

pub use actuator::MotionActuator;
pub use peripherals::{BuzzerDevice, LedStrip};
pub use sensors::{BatteryMonitor, DistanceSensor};
pub use sim::{CallJournal, HardwareCall};
