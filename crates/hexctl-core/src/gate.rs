//! [`GatedActuator`] – single interception point between the control core
//! and the motion hardware.
//!
//! Every motion call (gait step, pose move, servo-angle write) passes
//! through the gate, which consults the lock-protected stop flag
//! immediately before delegating to the real [`MotionActuator`]. While the
//! stop is engaged the call is silently dropped, so a command observed
//! before `stop_all()` returned can no longer reach hardware afterwards.
//!
//! [`GatedActuator::relax`] is deliberately ungated: relaxing the servos is
//! the stop action itself.
//!
//! The gate is a decorator composed at construction; nothing patches the
//! underlying driver after the fact.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use hexctl_hal::MotionActuator;
use hexctl_types::{ControlError, GaitStep};
use tracing::debug;

use crate::state::ControlContext;

pub struct GatedActuator {
    ctx: Arc<ControlContext>,
    inner: Mutex<Box<dyn MotionActuator>>,
}

impl GatedActuator {
    pub fn new(ctx: Arc<ControlContext>, inner: Box<dyn MotionActuator>) -> Self {
        Self {
            ctx,
            inner: Mutex::new(inner),
        }
    }

    fn engaged(&self) -> bool {
        self.ctx.lock().stop_all
    }

    fn inner(&self) -> MutexGuard<'_, Box<dyn MotionActuator>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Execute one gait step unless the stop gate is engaged.
    pub fn execute_gait_step(&self, step: &GaitStep) -> Result<(), ControlError> {
        if self.engaged() {
            debug!(?step, "stop engaged; gait step dropped");
            return Ok(());
        }
        self.inner().execute_gait_step(step)
    }

    /// Move the body to an absolute pose unless the stop gate is engaged.
    pub fn move_to_pose(&self, x: i32, y: i32, z: i32) -> Result<(), ControlError> {
        if self.engaged() {
            debug!(x, y, z, "stop engaged; pose move dropped");
            return Ok(());
        }
        self.inner().move_to_pose(x, y, z)
    }

    /// Write one servo angle unless the stop gate is engaged.
    pub fn set_servo_angle(&self, port: u8, angle: u8) -> Result<(), ControlError> {
        if self.engaged() {
            debug!(port, angle, "stop engaged; servo write dropped");
            return Ok(());
        }
        self.inner().set_servo_angle(port, angle)
    }

    /// Cut PWM to every servo. Always forwarded.
    pub fn relax(&self) -> Result<(), ControlError> {
        self.inner().relax()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ControlConfig;
    use hexctl_hal::HardwareCall;
    use hexctl_hal::sim::{CallJournal, SimMotion};

    fn gated() -> (Arc<ControlContext>, GatedActuator, CallJournal) {
        let ctx = Arc::new(ControlContext::new(ControlConfig::default()));
        let journal = CallJournal::new();
        let gate = GatedActuator::new(ctx.clone(), SimMotion::new(&journal));
        (ctx, gate, journal)
    }

    #[test]
    fn forwards_while_clear() {
        let (_ctx, gate, journal) = gated();
        gate.set_servo_angle(24, 90).unwrap();
        gate.move_to_pose(0, 0, 15).unwrap();
        assert_eq!(journal.calls().len(), 2);
    }

    #[test]
    fn drops_motion_while_engaged() {
        let (ctx, gate, journal) = gated();
        ctx.lock().stop_all = true;

        gate.set_servo_angle(24, 90).unwrap();
        gate.move_to_pose(0, 0, 15).unwrap();
        gate.execute_gait_step(&GaitStep {
            direction: 35,
            lateral: 0,
            step_height: 10,
            turn_rate: 0,
        })
        .unwrap();
        assert!(journal.calls().is_empty());
    }

    #[test]
    fn relax_passes_while_engaged() {
        let (ctx, gate, journal) = gated();
        ctx.lock().stop_all = true;

        gate.relax().unwrap();
        assert_eq!(journal.calls(), vec![HardwareCall::Relax]);
    }

    #[test]
    fn reopens_after_flag_clears() {
        let (ctx, gate, journal) = gated();
        ctx.lock().stop_all = true;
        gate.set_servo_angle(6, 45).unwrap();
        assert!(journal.calls().is_empty());

        ctx.lock().stop_all = false;
        gate.set_servo_angle(6, 45).unwrap();
        assert_eq!(
            journal.calls(),
            vec![HardwareCall::ServoAngle { port: 6, angle: 45 }]
        );
    }
}
