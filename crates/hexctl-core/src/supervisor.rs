//! [`Supervisor`] – the operation surface the request layer talks to.
//!
//! Every operation is synchronous and bounded: state reads and writes
//! under the single lock, plus at most one gated actuator call before
//! returning. Anything longer-lived (walking, LED patterns, presets) is
//! handed to the motion worker or an effect sequencer.
//!
//! Locking discipline: clamp, validate, and update state under the lock,
//! release it, then perform the hardware call. The stop gate re-checks the
//! flag immediately before every delegation, so the `stop_all` ordering
//! guarantee does not depend on holding the lock across hardware I/O.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use hexctl_hal::{BatteryMonitor, BuzzerDevice, DistanceSensor, LedStrip, MotionActuator};
use hexctl_types::{
    BatteryReading, BuzzerMode, ControlError, ControlReply, DEFAULT_STEP, DistanceReading,
    LedMode, MotionCommand, PanTiltAction, PresetName, Rgb, Rig, SensorReport, StateSnapshot,
};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::effects::{EffectDeps, EffectKind, EffectRegistry, LedAction, buzz, spawn_buzzer_pulse,
    spawn_led_effect, wipe};
use crate::gate::GatedActuator;
use crate::presets::{self, PresetDeps};
use crate::state::{ControlConfig, ControlContext};
use crate::worker;

/// Duration of the standard buzzer pulse.
const PULSE: Duration = Duration::from_millis(200);

/// The full set of hardware drivers the supervisor owns. Real drivers on
/// the robot, sim drivers everywhere else.
pub struct HardwareSet {
    pub motion: Box<dyn MotionActuator>,
    pub led: Box<dyn LedStrip>,
    pub buzzer: Box<dyn BuzzerDevice>,
    pub ultrasonic: Box<dyn DistanceSensor>,
    pub battery: Box<dyn BatteryMonitor>,
}

pub struct Supervisor {
    ctx: Arc<ControlContext>,
    actuator: Arc<GatedActuator>,
    led: Arc<Mutex<Box<dyn LedStrip>>>,
    buzzer: Arc<Mutex<Box<dyn BuzzerDevice>>>,
    ultrasonic: Mutex<Box<dyn DistanceSensor>>,
    battery: Mutex<Box<dyn BatteryMonitor>>,
    registry: Arc<EffectRegistry>,
}

impl Supervisor {
    /// Build the supervisor and drive the robot to its startup posture:
    /// reset-pose body height and centered pan/tilt rigs. Startup actuator
    /// faults are logged, not fatal.
    pub fn new(hardware: HardwareSet, config: ControlConfig) -> Self {
        let ctx = Arc::new(ControlContext::new(config));
        let actuator = Arc::new(GatedActuator::new(ctx.clone(), hardware.motion));

        let startup = {
            let st = ctx.lock();
            (st.body_z, [
                (Rig::Phone.pan_port(), st.phone_pan),
                (Rig::Phone.tilt_port(), st.phone_tilt),
                (Rig::Head.pan_port(), st.head_pan),
                (Rig::Head.tilt_port(), st.head_tilt),
            ])
        };
        if let Err(e) = actuator.move_to_pose(0, 0, startup.0) {
            warn!(error = %e, "startup pose move failed");
        }
        for (port, angle) in startup.1 {
            let trimmed = ctx.offsets.apply(port, angle);
            if let Err(e) = actuator.set_servo_angle(port, trimmed) {
                warn!(port, error = %e, "startup centering failed");
            }
        }

        Self {
            ctx,
            actuator,
            led: Arc::new(Mutex::new(hardware.led)),
            buzzer: Arc::new(Mutex::new(hardware.buzzer)),
            ultrasonic: Mutex::new(hardware.ultrasonic),
            battery: Mutex::new(hardware.battery),
            registry: Arc::new(EffectRegistry::new()),
        }
    }

    /// Spawn the motion worker onto the current runtime.
    pub fn start(&self) -> JoinHandle<()> {
        worker::spawn(self.ctx.clone(), self.actuator.clone())
    }

    pub fn snapshot(&self) -> StateSnapshot {
        self.ctx.lock().snapshot()
    }

    fn reply(&self, status: impl Into<String>) -> ControlReply {
        ControlReply {
            status: status.into(),
            snapshot: self.snapshot(),
        }
    }

    fn effect_deps(&self) -> EffectDeps {
        EffectDeps {
            ctx: self.ctx.clone(),
            led: self.led.clone(),
            buzzer: self.buzzer.clone(),
            registry: self.registry.clone(),
        }
    }

    // ────────────────────────────────────────────────────────────────────
    // Movement
    // ────────────────────────────────────────────────────────────────────

    /// Overwrite the command slot. Issuing motion is an implicit resume:
    /// the stop flag is cleared before the command lands.
    pub fn set_command(&self, cmd: MotionCommand) -> ControlReply {
        {
            let mut st = self.ctx.lock();
            st.stop_all = false;
            st.queue(cmd);
        }
        let status = match cmd {
            MotionCommand::Forward => "Forward",
            MotionCommand::Backward => "Backward",
            MotionCommand::StrafeLeft => "Strafe left",
            MotionCommand::StrafeRight => "Strafe right",
            MotionCommand::TurnLeft => "Turn left",
            MotionCommand::TurnRight => "Turn right",
            MotionCommand::Raise => "Raise body",
            MotionCommand::Lower => "Lower body",
            MotionCommand::TabletopPose => "Tabletop pose",
            MotionCommand::ResetPose => "Reset pose",
        };
        self.reply(status)
    }

    /// Parse-and-queue entry point for the request layer. Unknown names
    /// are rejected with no state mutated.
    pub fn set_command_by_name(&self, name: &str) -> Result<ControlReply, ControlError> {
        Ok(self.set_command(name.parse()?))
    }

    /// Set the body height to an absolute z, clamped into the configured
    /// envelope, and issue one pose move in the request path.
    pub fn set_height_absolute(&self, z: i32) -> ControlReply {
        self.apply_height(|_| z)
    }

    /// Adjust the body height by a delta, clamped into the configured
    /// envelope.
    pub fn set_height_relative(&self, dz: i32) -> ControlReply {
        self.apply_height(|current| current + dz)
    }

    fn apply_height(&self, target: impl FnOnce(i32) -> i32) -> ControlReply {
        let z = {
            let mut st = self.ctx.lock();
            st.stop_all = false;
            st.body_z = self.ctx.heights.clamp(target(st.body_z));
            st.body_z
        };
        if let Err(e) = self.actuator.move_to_pose(0, 0, z) {
            warn!(z, error = %e, "height move failed");
        }
        self.reply(format!("Body height z={z}"))
    }

    // ────────────────────────────────────────────────────────────────────
    // Stop gate
    // ────────────────────────────────────────────────────────────────────

    /// Engage the soft emergency stop. After this returns, no previously
    /// queued command can still reach hardware: the flag is set, the slot
    /// and the active preset are cleared in one critical section, and the
    /// servos are relaxed before returning. Idempotent.
    pub fn stop_all(&self) -> ControlReply {
        {
            let mut st = self.ctx.lock();
            st.stop_all = true;
            st.current_cmd = None;
            st.active_preset = None;
        }
        if let Err(e) = self.actuator.relax() {
            warn!(error = %e, "relax failed during stop");
        }
        info!("stop engaged; all servos relaxed");
        self.reply("All servos relaxed (legs + pan/tilt)")
    }

    // ────────────────────────────────────────────────────────────────────
    // Pan/tilt
    // ────────────────────────────────────────────────────────────────────

    /// Aim or relax a pan/tilt rig. Angles clamp into the configured
    /// bounds; the head rig has no relax action.
    pub fn pan_tilt(
        &self,
        rig: Rig,
        action: PanTiltAction,
        step: Option<i32>,
    ) -> Result<ControlReply, ControlError> {
        if action == PanTiltAction::Relax {
            if rig == Rig::Head {
                return Err(ControlError::UnsupportedAction { rig, action });
            }
            // Phone relax: PWM off everywhere, tracked angles kept.
            if let Err(e) = self.actuator.relax() {
                warn!(error = %e, "relax failed");
            }
            return Ok(self.reply("Pan/tilt relaxed (PWM off)"));
        }

        let step = step.unwrap_or(DEFAULT_STEP);
        let (pan, tilt) = {
            let mut guard = self.ctx.lock();
            guard.stop_all = false;
            let st = &mut *guard;
            let (pan, tilt) = match rig {
                Rig::Phone => (&mut st.phone_pan, &mut st.phone_tilt),
                Rig::Head => (&mut st.head_pan, &mut st.head_tilt),
            };
            match action {
                PanTiltAction::Center => {
                    *pan = 90;
                    *tilt = 90;
                }
                PanTiltAction::PanLeft => *pan = self.ctx.limits.clamp_pan(*pan - step),
                PanTiltAction::PanRight => *pan = self.ctx.limits.clamp_pan(*pan + step),
                PanTiltAction::TiltUp => *tilt = self.ctx.limits.clamp_tilt(*tilt - step),
                PanTiltAction::TiltDown => *tilt = self.ctx.limits.clamp_tilt(*tilt + step),
                PanTiltAction::Relax => unreachable!("handled above"),
            }
            (*pan, *tilt)
        };

        for (port, angle) in [(rig.pan_port(), pan), (rig.tilt_port(), tilt)] {
            let trimmed = self.ctx.offsets.apply(port, angle);
            if let Err(e) = self.actuator.set_servo_angle(port, trimmed) {
                warn!(port, error = %e, "pan/tilt write failed");
            }
        }
        Ok(self.reply(format!("{rig} pan={pan} tilt={tilt}")))
    }

    // ────────────────────────────────────────────────────────────────────
    // Effects
    // ────────────────────────────────────────────────────────────────────

    /// Trigger an LED mode. Off/solid apply immediately; the animated
    /// modes run as supervised sequencers with the stock timings.
    pub fn trigger_led(&self, mode: LedMode, color: Rgb) -> ControlReply {
        let action = match mode {
            LedMode::Off => LedAction::Off,
            LedMode::Solid => LedAction::Solid(color),
            LedMode::Blink => LedAction::Blink(color),
            LedMode::Breathe => LedAction::Breathe { color, cycles: 2 },
            LedMode::Police => LedAction::Police,
            LedMode::Rainbow => LedAction::Rainbow,
        };
        spawn_led_effect(&self.effect_deps(), action);
        let status = match mode {
            LedMode::Off => "LEDs off".to_string(),
            LedMode::Solid => format!("LED solid ({},{},{})", color.r, color.g, color.b),
            LedMode::Blink => format!("LED blink ({},{},{})", color.r, color.g, color.b),
            LedMode::Breathe => format!("LED breathe ({},{},{})", color.r, color.g, color.b),
            LedMode::Police => "LED police pattern".to_string(),
            LedMode::Rainbow => "LED rainbow".to_string(),
        };
        self.reply(status)
    }

    /// Trigger the buzzer: a spawned pulse, or a direct on/off write.
    pub fn trigger_buzzer(&self, mode: BuzzerMode) -> ControlReply {
        match mode {
            BuzzerMode::Pulse => {
                spawn_buzzer_pulse(&self.effect_deps(), PULSE);
                self.reply("Beep pulse triggered")
            }
            BuzzerMode::On => {
                buzz(&self.effect_deps(), true);
                self.reply("Buzzer on")
            }
            BuzzerMode::Off => {
                buzz(&self.effect_deps(), false);
                self.reply("Buzzer off")
            }
        }
    }

    /// Start a preset timeline. The active preset id is published before
    /// the runner task starts, and starting a preset lifts the stop gate
    /// so it is allowed to move.
    pub fn trigger_preset(&self, name: PresetName) -> ControlReply {
        let (run, token) = self.registry.begin(EffectKind::Preset);
        {
            let mut st = self.ctx.lock();
            st.active_preset = Some(name);
            st.stop_all = false;
        }
        let deps = PresetDeps {
            effects: self.effect_deps(),
            actuator: self.actuator.clone(),
        };
        info!(preset = %name, run = %run, "preset triggered");
        tokio::spawn(presets::run(deps, name, token));
        self.reply(format!("Running {name}"))
    }

    // ────────────────────────────────────────────────────────────────────
    // Sensors
    // ────────────────────────────────────────────────────────────────────

    /// Poll every sensor. One failing sensor never hides the others; each
    /// field carries its own value or error message.
    pub fn read_sensors(&self) -> SensorReport {
        let battery = self
            .battery
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .voltage()
            .map(BatteryReading::classify)
            .map_err(|e| e.to_string());
        let distance = self
            .ultrasonic
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .distance_cm()
            .map(DistanceReading::classify)
            .map_err(|e| e.to_string());
        if let Err(e) = &battery {
            warn!(error = %e, "battery read failed");
        }
        if let Err(e) = &distance {
            warn!(error = %e, "ultrasonic read failed");
        }
        SensorReport { battery, distance }
    }

    // ────────────────────────────────────────────────────────────────────
    // Shutdown
    // ────────────────────────────────────────────────────────────────────

    /// Tear down: stop the worker loop, force the stop gate, relax the
    /// servos, silence the buzzer and darken the strip. In-flight effect
    /// sequencers are fire-and-forget and not joined.
    pub fn shutdown(&self) {
        {
            let mut st = self.ctx.lock();
            st.running = false;
            st.stop_all = true;
            st.current_cmd = None;
            st.active_preset = None;
        }
        if let Err(e) = self.actuator.relax() {
            warn!(error = %e, "relax failed during shutdown");
        }
        let deps = self.effect_deps();
        buzz(&deps, false);
        wipe(&deps, Rgb::OFF);
        info!("controller shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hexctl_hal::HardwareCall;
    use hexctl_hal::sim::{
        CallJournal, FailingUltrasonic, SimBattery, SimBuzzer, SimLed, SimMotion, SimUltrasonic,
    };
    use hexctl_types::{BatteryStatus, GaitStep, HeightLimits, PanTiltLimits, ServoOffsets};

    fn sim_hardware(journal: &CallJournal) -> HardwareSet {
        HardwareSet {
            motion: SimMotion::new(journal),
            led: SimLed::new(journal),
            buzzer: SimBuzzer::new(journal),
            ultrasonic: Box::new(SimUltrasonic { distance_cm: 42.0 }),
            battery: Box::new(SimBattery { volts: 7.6 }),
        }
    }

    fn rig() -> (Supervisor, CallJournal) {
        let journal = CallJournal::new();
        let sup = Supervisor::new(sim_hardware(&journal), ControlConfig::default());
        journal.take();
        (sup, journal)
    }

    fn gait_of(cmd: MotionCommand) -> GaitStep {
        cmd.gait_step().unwrap()
    }

    async fn settle(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    #[test]
    fn startup_drives_reset_pose_and_centering() {
        let journal = CallJournal::new();
        let _sup = Supervisor::new(sim_hardware(&journal), ControlConfig::default());
        let calls = journal.calls();
        assert_eq!(calls[0], HardwareCall::MoveToPose { x: 0, y: 0, z: 15 });
        // Both rigs centered at 90.
        for port in [24u8, 25, 6, 7] {
            assert!(calls.contains(&HardwareCall::ServoAngle { port, angle: 90 }));
        }
    }

    #[test]
    fn five_relative_height_steps_each_issue_one_pose_move() {
        let (sup, journal) = rig();
        for _ in 0..5 {
            sup.set_height_relative(2);
        }
        assert_eq!(sup.snapshot().body_z, 25);
        let z_values: Vec<i32> = journal
            .calls()
            .iter()
            .filter_map(|c| match c {
                HardwareCall::MoveToPose { z, .. } => Some(*z),
                _ => None,
            })
            .collect();
        assert_eq!(z_values, vec![17, 19, 21, 23, 25]);
    }

    #[test]
    fn relative_height_clamps_at_max() {
        let (sup, journal) = rig();
        let reply = sup.set_height_relative(1000);
        assert_eq!(reply.snapshot.body_z, 45);
        assert_eq!(
            journal.calls(),
            vec![HardwareCall::MoveToPose { x: 0, y: 0, z: 45 }]
        );
    }

    #[test]
    fn absolute_height_clamps_at_min() {
        let (sup, _journal) = rig();
        let reply = sup.set_height_absolute(-1000);
        assert_eq!(reply.snapshot.body_z, -30);
    }

    #[test]
    fn pan_floors_at_configured_minimum() {
        let (sup, journal) = rig();
        sup.pan_tilt(Rig::Phone, PanTiltAction::PanLeft, Some(88))
            .unwrap();
        assert_eq!(sup.snapshot().phone_pan, 2);

        sup.pan_tilt(Rig::Phone, PanTiltAction::PanLeft, Some(5))
            .unwrap();
        assert_eq!(sup.snapshot().phone_pan, 0);

        // Further pan-left calls stay floored.
        sup.pan_tilt(Rig::Phone, PanTiltAction::PanLeft, Some(5))
            .unwrap();
        assert_eq!(sup.snapshot().phone_pan, 0);
        assert!(
            journal
                .calls()
                .contains(&HardwareCall::ServoAngle { port: 24, angle: 0 })
        );
    }

    #[test]
    fn head_and_phone_angles_are_independent() {
        let (sup, _journal) = rig();
        sup.pan_tilt(Rig::Head, PanTiltAction::TiltDown, Some(10))
            .unwrap();
        let snap = sup.snapshot();
        assert_eq!(snap.head_tilt, 100);
        assert_eq!(snap.phone_tilt, 90);
    }

    #[test]
    fn head_relax_is_rejected_without_mutation() {
        let (sup, journal) = rig();
        let before = sup.snapshot();
        let err = sup
            .pan_tilt(Rig::Head, PanTiltAction::Relax, None)
            .unwrap_err();
        assert!(matches!(err, ControlError::UnsupportedAction { .. }));
        assert_eq!(sup.snapshot(), before);
        assert!(journal.calls().is_empty());
    }

    #[test]
    fn phone_relax_keeps_tracked_angles() {
        let (sup, journal) = rig();
        sup.pan_tilt(Rig::Phone, PanTiltAction::PanRight, Some(10))
            .unwrap();
        journal.take();

        sup.pan_tilt(Rig::Phone, PanTiltAction::Relax, None).unwrap();
        assert_eq!(sup.snapshot().phone_pan, 100);
        assert_eq!(journal.calls(), vec![HardwareCall::Relax]);
    }

    #[test]
    fn servo_offsets_are_applied_to_writes() {
        let journal = CallJournal::new();
        let mut table = std::collections::HashMap::new();
        table.insert(24u8, -5);
        let config = ControlConfig {
            heights: HeightLimits::default(),
            limits: PanTiltLimits::default(),
            offsets: ServoOffsets::new(table),
            tick: None,
        };
        let sup = Supervisor::new(sim_hardware(&journal), config);
        journal.take();

        sup.pan_tilt(Rig::Phone, PanTiltAction::Center, None).unwrap();
        assert!(
            journal
                .calls()
                .contains(&HardwareCall::ServoAngle { port: 24, angle: 85 })
        );
    }

    #[test]
    fn unknown_command_is_rejected_without_mutation() {
        let (sup, journal) = rig();
        let before = sup.snapshot();
        assert!(matches!(
            sup.set_command_by_name("moonwalk"),
            Err(ControlError::UnknownCommand(_))
        ));
        assert_eq!(sup.snapshot(), before);
        assert!(journal.calls().is_empty());
    }

    #[test]
    fn stop_all_is_idempotent() {
        let (sup, _journal) = rig();
        sup.set_command(MotionCommand::Forward);

        let first = sup.stop_all().snapshot;
        let second = sup.stop_all().snapshot;
        assert_eq!(first, second);
        assert!(second.stop_engaged);
        assert!(second.pending_command.is_none());
        assert!(second.active_preset.is_none());
    }

    #[test]
    fn stop_then_command_clears_flag() {
        let (sup, _journal) = rig();
        sup.stop_all();
        assert!(sup.snapshot().stop_engaged);

        let reply = sup.set_command(MotionCommand::Forward);
        assert!(!reply.snapshot.stop_engaged);
        assert_eq!(reply.snapshot.pending_command, Some(MotionCommand::Forward));
    }

    #[test]
    fn sensor_report_survives_one_failing_sensor() {
        let journal = CallJournal::new();
        let mut hardware = sim_hardware(&journal);
        hardware.ultrasonic = Box::new(FailingUltrasonic);
        let sup = Supervisor::new(hardware, ControlConfig::default());

        let report = sup.read_sensors();
        assert!(!report.all_ok());
        let battery = report.battery.unwrap();
        assert_eq!(battery.status, BatteryStatus::Full);
        assert!(report.distance.unwrap_err().contains("ultrasonic"));
    }

    #[tokio::test(start_paused = true)]
    async fn stop_before_tick_beats_queued_command() {
        let (sup, journal) = rig();
        sup.set_command(MotionCommand::Forward);
        sup.stop_all();
        let worker = sup.start();
        settle(30).await;

        assert_eq!(journal.count(|c| matches!(c, HardwareCall::GaitStep(_))), 0);
        assert!(journal.count(|c| matches!(c, HardwareCall::Relax)) >= 1);
        worker.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn stop_then_forward_resumes_on_next_tick() {
        let (sup, journal) = rig();
        sup.stop_all();
        let worker = sup.start();
        settle(30).await;
        journal.take();

        sup.set_command(MotionCommand::Forward);
        settle(30).await;

        assert_eq!(
            journal.count(
                |c| matches!(c, HardwareCall::GaitStep(s) if *s == gait_of(MotionCommand::Forward))
            ),
            1
        );
        worker.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn preset_abort_stops_all_preset_output() {
        let (sup, journal) = rig();
        let worker = sup.start();
        sup.trigger_preset(PresetName::Demo1);
        // Let the preset get moving: beep, cyan, raise, first forward leg.
        settle(1500).await;
        assert_eq!(sup.snapshot().active_preset, Some(PresetName::Demo1));

        sup.stop_all();
        assert!(sup.snapshot().active_preset.is_none());
        // One polling interval for the sequencer to notice, then silence.
        settle(250).await;
        journal.take();
        settle(3000).await;

        // Only the worker's stop-branch relax (and a possibly in-flight
        // buzzer release) may appear after the abort settles.
        let late = journal.take();
        assert!(
            late.iter()
                .all(|c| matches!(c, HardwareCall::Relax | HardwareCall::Buzzer(false))),
            "unexpected post-stop calls: {late:?}"
        );
        worker.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn preset_runs_to_completion_and_clears_itself() {
        let (sup, journal) = rig();
        let worker = sup.start();
        sup.trigger_preset(PresetName::Demo1);
        settle(10_000).await;

        assert!(sup.snapshot().active_preset.is_none());
        // Four patrol legs, one forward gait step each.
        assert_eq!(
            journal.count(
                |c| matches!(c, HardwareCall::GaitStep(s) if *s == gait_of(MotionCommand::Forward))
            ),
            4
        );
        worker.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn second_preset_supersedes_first() {
        let (sup, journal) = rig();
        let worker = sup.start();
        sup.trigger_preset(PresetName::Demo1);
        settle(300).await;
        sup.trigger_preset(PresetName::Demo2);
        settle(15_000).await;

        assert!(sup.snapshot().active_preset.is_none());
        // Demo2's three guard turns all ran.
        assert_eq!(
            journal.count(
                |c| matches!(c, HardwareCall::GaitStep(s) if *s == gait_of(MotionCommand::TurnLeft))
            ),
            3
        );
        worker.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_worker_and_relaxes() {
        let (sup, journal) = rig();
        let worker = sup.start();
        settle(20).await;

        sup.shutdown();
        settle(30).await;

        assert!(worker.is_finished());
        assert!(journal.count(|c| matches!(c, HardwareCall::Relax)) >= 1);
        assert!(journal.calls().contains(&HardwareCall::Buzzer(false)));
        let snap = sup.snapshot();
        assert!(snap.stop_engaged);
    }

    #[tokio::test(start_paused = true)]
    async fn led_trigger_tracks_last_solid_color() {
        let (sup, _journal) = rig();
        sup.trigger_led(LedMode::Solid, Rgb::new(0, 200, 255));
        assert_eq!(sup.snapshot().led_last_color, Rgb::new(0, 200, 255));

        sup.trigger_led(LedMode::Off, Rgb::OFF);
        assert_eq!(sup.snapshot().led_last_color, Rgb::OFF);
    }

    #[tokio::test(start_paused = true)]
    async fn buzzer_pulse_releases_after_stop() {
        let (sup, journal) = rig();
        sup.trigger_buzzer(BuzzerMode::Pulse);
        settle(50).await;
        sup.stop_all();
        settle(500).await;

        // The release write still lands even though the stop came mid-pulse.
        assert_eq!(journal.count(|c| matches!(c, HardwareCall::Buzzer(true))), 1);
        assert_eq!(
            journal.count(|c| matches!(c, HardwareCall::Buzzer(false))),
            1
        );
    }
}
