//! Traits for the read-only sensors polled by the request layer.
//!
//! A failed read surfaces as a [`ControlError::Hardware`] from the driver;
//! the supervisor folds it into a per-field sensor report instead of
//! failing the whole request.

use hexctl_types::ControlError;

/// The ultrasonic ranger on the head module.
pub trait DistanceSensor: Send {
    /// Measure the distance to the nearest obstacle in centimeters.
    fn distance_cm(&mut self) -> Result<f32, ControlError>;
}

/// The battery voltage monitor behind the ADC.
pub trait BatteryMonitor: Send {
    /// Sample the pack voltage in volts.
    fn voltage(&mut self) -> Result<f32, ControlError>;
}
