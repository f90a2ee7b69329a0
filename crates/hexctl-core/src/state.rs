//! The shared state store: every mutable fact about the robot lives in one
//! [`SharedState`] behind one mutex, owned by a process-scoped
//! [`ControlContext`] that is built once at startup and injected into every
//! component explicitly.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use hexctl_types::{
    CENTER_ANGLE, HeightLimits, MotionCommand, PanTiltLimits, PresetName, Rgb, ServoOffsets,
    StateSnapshot,
};

/// Default motion worker tick period.
pub const DEFAULT_TICK: Duration = Duration::from_millis(10);

/// A command occupying the slot, tagged with a sequence number so the
/// worker can tell whether the slot still holds the instance it executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueuedCommand {
    pub seq: u64,
    pub cmd: MotionCommand,
}

/// Everything protected by the single control lock.
#[derive(Debug)]
pub struct SharedState {
    pub body_z: i32,
    pub phone_pan: i32,
    pub phone_tilt: i32,
    pub head_pan: i32,
    pub head_tilt: i32,
    /// The latest-wins command slot. Overwritten, never queued.
    pub current_cmd: Option<QueuedCommand>,
    next_seq: u64,
    /// The soft emergency stop. Cleared only by a new motion request.
    pub stop_all: bool,
    pub active_preset: Option<PresetName>,
    /// False once shutdown has begun; the worker loop exits on it.
    pub running: bool,
    pub led_last_color: Rgb,
}

impl SharedState {
    fn new(heights: &HeightLimits) -> Self {
        Self {
            body_z: heights.reset_z,
            phone_pan: CENTER_ANGLE,
            phone_tilt: CENTER_ANGLE,
            head_pan: CENTER_ANGLE,
            head_tilt: CENTER_ANGLE,
            current_cmd: None,
            next_seq: 0,
            stop_all: false,
            active_preset: None,
            running: true,
            led_last_color: Rgb::OFF,
        }
    }

    /// Overwrite the slot with `cmd`. Any unconsumed prior command is
    /// discarded.
    pub fn queue(&mut self, cmd: MotionCommand) -> QueuedCommand {
        self.next_seq += 1;
        let queued = QueuedCommand {
            seq: self.next_seq,
            cmd,
        };
        self.current_cmd = Some(queued);
        queued
    }

    /// Clear the slot only if it still holds `executed`. A writer may have
    /// overwritten it mid-execution; the newer command must survive.
    pub fn clear_if_current(&mut self, executed: QueuedCommand) {
        if self.current_cmd == Some(executed) {
            self.current_cmd = None;
        }
    }

    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            body_z: self.body_z,
            phone_pan: self.phone_pan,
            phone_tilt: self.phone_tilt,
            head_pan: self.head_pan,
            head_tilt: self.head_tilt,
            stop_engaged: self.stop_all,
            active_preset: self.active_preset,
            pending_command: self.current_cmd.map(|q| q.cmd),
            led_last_color: self.led_last_color,
        }
    }
}

/// Static configuration handed to the core by the configuration layer.
/// The core never parses files; it receives already-validated values.
#[derive(Debug, Clone, Default)]
pub struct ControlConfig {
    pub heights: HeightLimits,
    pub limits: PanTiltLimits,
    pub offsets: ServoOffsets,
    pub tick: Option<Duration>,
}

/// Process-scoped context: configuration plus the lock-protected state.
#[derive(Debug)]
pub struct ControlContext {
    pub heights: HeightLimits,
    pub limits: PanTiltLimits,
    pub offsets: ServoOffsets,
    pub tick: Duration,
    state: Mutex<SharedState>,
}

impl ControlContext {
    pub fn new(config: ControlConfig) -> Self {
        let state = SharedState::new(&config.heights);
        Self {
            heights: config.heights,
            limits: config.limits,
            offsets: config.offsets,
            tick: config.tick.unwrap_or(DEFAULT_TICK),
            state: Mutex::new(state),
        }
    }

    /// Acquire the control lock. A poisoned lock is recovered rather than
    /// propagated: the worker and the sequencers must outlive a panicked
    /// writer.
    pub fn lock(&self) -> MutexGuard<'_, SharedState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reset_pose() {
        let ctx = ControlContext::new(ControlConfig::default());
        let st = ctx.lock();
        assert_eq!(st.body_z, 15);
        assert_eq!(st.phone_pan, 90);
        assert_eq!(st.head_tilt, 90);
        assert!(!st.stop_all);
        assert!(st.running);
        assert!(st.current_cmd.is_none());
    }

    #[test]
    fn queue_overwrites_and_bumps_seq() {
        let ctx = ControlContext::new(ControlConfig::default());
        let mut st = ctx.lock();

        let first = st.queue(MotionCommand::Forward);
        let second = st.queue(MotionCommand::StrafeLeft);
        assert_ne!(first.seq, second.seq);
        assert_eq!(st.current_cmd, Some(second));
    }

    #[test]
    fn clear_if_current_ignores_overwritten_command() {
        let ctx = ControlContext::new(ControlConfig::default());
        let mut st = ctx.lock();

        let executed = st.queue(MotionCommand::Forward);
        // A writer overwrites mid-execution; the newer command must survive.
        let newer = st.queue(MotionCommand::TurnLeft);
        st.clear_if_current(executed);
        assert_eq!(st.current_cmd, Some(newer));

        st.clear_if_current(newer);
        assert!(st.current_cmd.is_none());
    }

    #[test]
    fn snapshot_reflects_state() {
        let ctx = ControlContext::new(ControlConfig::default());
        {
            let mut st = ctx.lock();
            st.queue(MotionCommand::Raise);
            st.stop_all = true;
            st.active_preset = Some(PresetName::Demo1);
        }
        let snap = ctx.lock().snapshot();
        assert!(snap.stop_engaged);
        assert_eq!(snap.pending_command, Some(MotionCommand::Raise));
        assert_eq!(snap.active_preset, Some(PresetName::Demo1));
    }
}
