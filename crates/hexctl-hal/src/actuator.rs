//! The `MotionActuator` trait: the narrow seam between the control core and
//! the external gait/kinematics engine plus the servo driver underneath it.
//!
//! Every operation is treated by the core as an atomic, possibly-failing
//! call. The core owns no knowledge of how a gait step or a pose move is
//! computed; it only schedules, gates, and serializes them.

use hexctl_types::{ControlError, GaitStep};

/// Abstraction over the gait engine and servo driver.
///
/// Implementations must be `Send`: the motion worker and the effect
/// sequencers invoke the actuator from different tasks (serialized through
/// a mutex held by the gate).
pub trait MotionActuator: Send {
    /// Execute one parameterized walking-cycle increment.
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::Hardware`] when the gait engine rejects the
    /// step or the underlying bus write fails.
    fn execute_gait_step(&mut self, step: &GaitStep) -> Result<(), ControlError>;

    /// Move the body to an absolute (x, y, z) pose.
    fn move_to_pose(&mut self, x: i32, y: i32, z: i32) -> Result<(), ControlError>;

    /// Drive a single servo to `angle` degrees (0..=180).
    fn set_servo_angle(&mut self, port: u8, angle: u8) -> Result<(), ControlError>;

    /// Cut PWM to every servo so the whole body goes limp.
    fn relax(&mut self) -> Result<(), ControlError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Minimal in-process actuator used only for this module's tests.
    struct MockActuator {
        last_pose: (i32, i32, i32),
        relaxed: bool,
    }

    impl MotionActuator for MockActuator {
        fn execute_gait_step(&mut self, _step: &GaitStep) -> Result<(), ControlError> {
            self.relaxed = false;
            Ok(())
        }

        fn move_to_pose(&mut self, x: i32, y: i32, z: i32) -> Result<(), ControlError> {
            self.last_pose = (x, y, z);
            self.relaxed = false;
            Ok(())
        }

        fn set_servo_angle(&mut self, _port: u8, _angle: u8) -> Result<(), ControlError> {
            self.relaxed = false;
            Ok(())
        }

        fn relax(&mut self) -> Result<(), ControlError> {
            self.relaxed = true;
            Ok(())
        }
    }

    #[test]
    fn mock_actuator_tracks_pose_and_relax() {
        let mut act = MockActuator {
            last_pose: (0, 0, 0),
            relaxed: false,
        };
        act.move_to_pose(0, 0, 15).unwrap();
        assert_eq!(act.last_pose, (0, 0, 15));

        act.relax().unwrap();
        assert!(act.relaxed);
    }
}
