//! In-process simulation drivers for headless testing without hardware.
//!
//! Every sim driver records the calls it receives into a shared
//! [`CallJournal`], so tests can assert exactly which hardware calls were
//! issued and in what order. Failure-injection variants return
//! [`ControlError::Hardware`] to exercise the fault-recovery paths.
//!
//! # Example
//!
//! ```
//! use hexctl_hal::sim::{CallJournal, SimMotion};
//! use hexctl_hal::{HardwareCall, MotionActuator};
//!
//! let journal = CallJournal::new();
//! let mut motion = SimMotion::new(&journal);
//! motion.move_to_pose(0, 0, 15).expect("sim move must succeed");
//! assert_eq!(
//!     journal.calls(),
//!     vec![HardwareCall::MoveToPose { x: 0, y: 0, z: 15 }]
//! );
//! ```

use std::sync::{Arc, Mutex, PoisonError};

use hexctl_types::{ControlError, GaitStep, Rgb};
use tracing::debug;

use crate::actuator::MotionActuator;
use crate::peripherals::{BuzzerDevice, LedStrip};
use crate::sensors::{BatteryMonitor, DistanceSensor};

/// One recorded hardware invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HardwareCall {
    GaitStep(GaitStep),
    MoveToPose { x: i32, y: i32, z: i32 },
    ServoAngle { port: u8, angle: u8 },
    Relax,
    ColorWipe(Rgb),
    Buzzer(bool),
}

/// Shared, clonable journal of every call the sim drivers received.
#[derive(Debug, Clone, Default)]
pub struct CallJournal(Arc<Mutex<Vec<HardwareCall>>>);

impl CallJournal {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, call: HardwareCall) {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }

    /// Snapshot of all recorded calls, oldest first.
    pub fn calls(&self) -> Vec<HardwareCall> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Drain the journal, returning everything recorded so far.
    pub fn take(&self) -> Vec<HardwareCall> {
        std::mem::take(&mut *self.0.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Number of recorded calls matching `pred`.
    pub fn count(&self, pred: impl Fn(&HardwareCall) -> bool) -> usize {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|c| pred(c))
            .count()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Motion
// ────────────────────────────────────────────────────────────────────────────

/// A simulated gait engine + servo driver. Always succeeds and records
/// every call.
pub struct SimMotion {
    journal: CallJournal,
}

impl SimMotion {
    pub fn new(journal: &CallJournal) -> Box<Self> {
        Box::new(Self {
            journal: journal.clone(),
        })
    }
}

impl MotionActuator for SimMotion {
    fn execute_gait_step(&mut self, step: &GaitStep) -> Result<(), ControlError> {
        self.journal.record(HardwareCall::GaitStep(*step));
        Ok(())
    }

    fn move_to_pose(&mut self, x: i32, y: i32, z: i32) -> Result<(), ControlError> {
        self.journal.record(HardwareCall::MoveToPose { x, y, z });
        Ok(())
    }

    fn set_servo_angle(&mut self, port: u8, angle: u8) -> Result<(), ControlError> {
        self.journal.record(HardwareCall::ServoAngle { port, angle });
        Ok(())
    }

    fn relax(&mut self) -> Result<(), ControlError> {
        self.journal.record(HardwareCall::Relax);
        Ok(())
    }
}

/// A motion driver that fails its first `failures` calls with a hardware
/// fault, then behaves like [`SimMotion`]. Used to verify that the worker
/// treats an actuator error as a skipped tick.
pub struct FlakyMotion {
    journal: CallJournal,
    failures: usize,
}

impl FlakyMotion {
    pub fn new(journal: &CallJournal, failures: usize) -> Box<Self> {
        Box::new(Self {
            journal: journal.clone(),
            failures,
        })
    }

    fn maybe_fail(&mut self) -> Result<(), ControlError> {
        if self.failures > 0 {
            self.failures -= 1;
            debug!(remaining = self.failures, "injecting motion fault");
            return Err(ControlError::Hardware {
                component: "sim-motion".to_string(),
                details: "injected fault".to_string(),
            });
        }
        Ok(())
    }
}

impl MotionActuator for FlakyMotion {
    fn execute_gait_step(&mut self, step: &GaitStep) -> Result<(), ControlError> {
        self.maybe_fail()?;
        self.journal.record(HardwareCall::GaitStep(*step));
        Ok(())
    }

    fn move_to_pose(&mut self, x: i32, y: i32, z: i32) -> Result<(), ControlError> {
        self.maybe_fail()?;
        self.journal.record(HardwareCall::MoveToPose { x, y, z });
        Ok(())
    }

    fn set_servo_angle(&mut self, port: u8, angle: u8) -> Result<(), ControlError> {
        self.maybe_fail()?;
        self.journal.record(HardwareCall::ServoAngle { port, angle });
        Ok(())
    }

    fn relax(&mut self) -> Result<(), ControlError> {
        // Relax is the safety action; the flaky sim never fails it.
        self.journal.record(HardwareCall::Relax);
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Peripherals
// ────────────────────────────────────────────────────────────────────────────

/// A simulated LED strip recording every wipe.
pub struct SimLed {
    journal: CallJournal,
}

impl SimLed {
    pub fn new(journal: &CallJournal) -> Box<Self> {
        Box::new(Self {
            journal: journal.clone(),
        })
    }
}

impl LedStrip for SimLed {
    fn color_wipe(&mut self, color: Rgb) -> Result<(), ControlError> {
        self.journal.record(HardwareCall::ColorWipe(color));
        Ok(())
    }
}

/// A simulated buzzer recording every state change.
pub struct SimBuzzer {
    journal: CallJournal,
}

impl SimBuzzer {
    pub fn new(journal: &CallJournal) -> Box<Self> {
        Box::new(Self {
            journal: journal.clone(),
        })
    }
}

impl BuzzerDevice for SimBuzzer {
    fn set_state(&mut self, on: bool) -> Result<(), ControlError> {
        self.journal.record(HardwareCall::Buzzer(on));
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Sensors
// ────────────────────────────────────────────────────────────────────────────

/// An ultrasonic ranger that always reports the configured distance.
pub struct SimUltrasonic {
    pub distance_cm: f32,
}

impl DistanceSensor for SimUltrasonic {
    fn distance_cm(&mut self) -> Result<f32, ControlError> {
        Ok(self.distance_cm)
    }
}

/// A battery monitor that always reports the configured voltage.
pub struct SimBattery {
    pub volts: f32,
}

impl BatteryMonitor for SimBattery {
    fn voltage(&mut self) -> Result<f32, ControlError> {
        Ok(self.volts)
    }
}

/// A distance sensor whose every read fails, for partial-failure tests.
pub struct FailingUltrasonic;

impl DistanceSensor for FailingUltrasonic {
    fn distance_cm(&mut self) -> Result<f32, ControlError> {
        Err(ControlError::Hardware {
            component: "ultrasonic".to_string(),
            details: "no echo within timeout".to_string(),
        })
    }
}

/// A battery monitor whose every read fails, for partial-failure tests.
pub struct FailingBattery;

impl BatteryMonitor for FailingBattery {
    fn voltage(&mut self) -> Result<f32, ControlError> {
        Err(ControlError::Hardware {
            component: "battery-adc".to_string(),
            details: "i2c read error".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sim_motion_records_in_order() {
        let journal = CallJournal::new();
        let mut motion = SimMotion::new(&journal);

        let step = GaitStep {
            direction: 35,
            lateral: 0,
            step_height: 10,
            turn_rate: 0,
        };
        motion.execute_gait_step(&step).unwrap();
        motion.set_servo_angle(24, 90).unwrap();
        motion.relax().unwrap();

        assert_eq!(
            journal.calls(),
            vec![
                HardwareCall::GaitStep(step),
                HardwareCall::ServoAngle { port: 24, angle: 90 },
                HardwareCall::Relax,
            ]
        );
    }

    #[test]
    fn journal_take_drains() {
        let journal = CallJournal::new();
        let mut led = SimLed::new(&journal);
        led.color_wipe(Rgb::new(1, 2, 3)).unwrap();

        assert_eq!(journal.take().len(), 1);
        assert!(journal.calls().is_empty());
    }

    #[test]
    fn flaky_motion_fails_then_recovers() {
        let journal = CallJournal::new();
        let mut motion = FlakyMotion::new(&journal, 1);

        assert!(motion.move_to_pose(0, 0, 10).is_err());
        assert!(motion.move_to_pose(0, 0, 10).is_ok());
        // Only the successful call is recorded.
        assert_eq!(journal.calls().len(), 1);
    }

    #[test]
    fn flaky_motion_never_fails_relax() {
        let journal = CallJournal::new();
        let mut motion = FlakyMotion::new(&journal, 5);
        assert!(motion.relax().is_ok());
        assert_eq!(journal.calls(), vec![HardwareCall::Relax]);
    }

    #[test]
    fn failing_sensors_report_hardware_faults() {
        assert!(matches!(
            FailingUltrasonic.distance_cm(),
            Err(ControlError::Hardware { .. })
        ));
        assert!(matches!(
            FailingBattery.voltage(),
            Err(ControlError::Hardware { .. })
        ));
    }

    #[test]
    fn sim_sensors_report_configured_values() {
        let mut ultra = SimUltrasonic { distance_cm: 42.5 };
        assert_eq!(ultra.distance_cm().unwrap(), 42.5);

        let mut bat = SimBattery { volts: 7.6 };
        assert_eq!(bat.voltage().unwrap(), 7.6);
    }
}
