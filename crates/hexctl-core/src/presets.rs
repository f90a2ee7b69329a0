//! Scripted presets: ordered timelines combining motion commands, pan/tilt
//! targets, LED sub-effects, buzzer pulses, and sleeps.
//!
//! A preset runs as one sequencer task. It owns its timeline for its
//! lifetime; the shared state only carries the active preset's name for
//! cancellation and observability. Motion steps enqueue through the slot
//! like any other command, but without clearing the stop flag: a stopped
//! preset must not resume itself.

use std::sync::Arc;
use std::time::Duration;

use hexctl_types::{MotionCommand, PHONE_PAN_PORT, PHONE_TILT_PORT, PresetName, Rgb};
use tracing::{info, warn};

use crate::effects::{Abort, CancelToken, EffectDeps, LedAction, spawn_buzzer_pulse,
    spawn_led_effect, step_gate, wipe};
use crate::gate::GatedActuator;

const CYAN: Rgb = Rgb::new(0, 200, 255);
const GUARD_RED: Rgb = Rgb::new(255, 50, 50);

/// One entry on a preset timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresetStep {
    /// Enqueue a movement or pose command for the motion worker.
    Motion(MotionCommand),
    /// Aim the phone rig. `None` leaves that axis untouched.
    PanTilt { pan: Option<i32>, tilt: Option<i32> },
    /// Trigger an LED sub-effect.
    Led(LedAction),
    /// Trigger a buzzer pulse of the given length.
    BuzzerPulse(Duration),
    /// Wait before the next step.
    Sleep(Duration),
}

use PresetStep::{BuzzerPulse, Led, Motion, PanTilt, Sleep};

fn ms(v: u64) -> Duration {
    Duration::from_millis(v)
}

/// The timeline for a registry preset.
pub fn script(name: PresetName) -> Vec<PresetStep> {
    let mut steps = vec![BuzzerPulse(ms(150)), Sleep(ms(100))];
    match name {
        // Patrol: walk forward with a scanning pan, cyan LEDs, little beeps.
        PresetName::Demo1 => {
            steps.push(Led(LedAction::Solid(CYAN)));
            steps.push(Motion(MotionCommand::Raise));
            steps.push(Sleep(ms(600)));
            for leg in 0..4 {
                steps.push(Motion(MotionCommand::Forward));
                steps.push(Sleep(ms(600)));
                steps.push(PanTilt {
                    pan: Some(60),
                    tilt: None,
                });
                steps.push(Sleep(ms(300)));
                steps.push(PanTilt {
                    pan: Some(120),
                    tilt: None,
                });
                steps.push(Sleep(ms(300)));
                if leg == 1 || leg == 3 {
                    steps.push(BuzzerPulse(ms(100)));
                }
            }
            steps.push(PanTilt {
                pan: Some(90),
                tilt: Some(90),
            });
            steps.push(Motion(MotionCommand::ResetPose));
            steps.push(Sleep(ms(800)));
            steps.push(Led(LedAction::Breathe {
                color: CYAN,
                cycles: 1,
            }));
        }

        // Guard scan: tabletop pose, slow left turns, red LEDs.
        PresetName::Demo2 => {
            steps.push(Led(LedAction::Solid(GUARD_RED)));
            steps.push(Motion(MotionCommand::TabletopPose));
            steps.push(Sleep(ms(1000)));
            for _ in 0..3 {
                steps.push(Motion(MotionCommand::TurnLeft));
                steps.push(Sleep(ms(700)));
                for pan in [60, 120, 90] {
                    steps.push(PanTilt {
                        pan: Some(pan),
                        tilt: None,
                    });
                    steps.push(Sleep(ms(300)));
                }
                steps.push(BuzzerPulse(ms(80)));
            }
            steps.push(Motion(MotionCommand::ResetPose));
            steps.push(Sleep(ms(800)));
            steps.push(Led(LedAction::Breathe {
                color: GUARD_RED,
                cycles: 1,
            }));
        }

        // Party: rainbow LEDs, alternating movement, some beeps.
        PresetName::Demo3 => {
            steps.push(Led(LedAction::Rainbow));
            steps.push(Motion(MotionCommand::Raise));
            steps.push(Sleep(ms(600)));
            for cmd in [
                MotionCommand::Forward,
                MotionCommand::StrafeRight,
                MotionCommand::Backward,
                MotionCommand::StrafeLeft,
                MotionCommand::TurnLeft,
                MotionCommand::TurnRight,
            ] {
                steps.push(Motion(cmd));
                steps.push(Sleep(ms(700)));
            }
            for _ in 0..3 {
                steps.push(BuzzerPulse(ms(70)));
                steps.push(Sleep(ms(150)));
            }
            steps.push(Motion(MotionCommand::ResetPose));
            steps.push(Sleep(ms(800)));
            steps.push(Led(LedAction::Off));
        }
    }
    steps
}

/// Everything the preset runner needs besides its timeline.
#[derive(Clone)]
pub(crate) struct PresetDeps {
    pub effects: EffectDeps,
    pub actuator: Arc<GatedActuator>,
}

/// Run a preset timeline to completion or abort.
///
/// The caller has already set `active_preset` and registered the run with
/// the effect registry. On normal completion the preset clears
/// `active_preset` if it still owns it; on a stop abort the field was
/// already cleared by `stop_all()`, and on supersession the newer preset
/// owns it.
pub(crate) async fn run(deps: PresetDeps, name: PresetName, token: CancelToken) {
    info!(preset = %name, "preset started");
    for step in script(name) {
        match step_gate(&deps.effects.ctx, &token) {
            Some(Abort::Superseded) => {
                info!(preset = %name, "preset superseded");
                return;
            }
            Some(Abort::Stop) => {
                wipe(&deps.effects, Rgb::OFF);
                info!(preset = %name, "preset aborted by stop");
                return;
            }
            None => {}
        }
        match step {
            Motion(cmd) => {
                deps.effects.ctx.lock().queue(cmd);
            }
            PanTilt { pan, tilt } => aim_phone_rig(&deps, pan, tilt),
            Led(action) => {
                spawn_led_effect(&deps.effects, action);
            }
            BuzzerPulse(duration) => {
                spawn_buzzer_pulse(&deps.effects, duration);
            }
            Sleep(duration) => tokio::time::sleep(duration).await,
        }
    }

    let mut st = deps.effects.ctx.lock();
    if !token.is_cancelled() && st.active_preset == Some(name) {
        st.active_preset = None;
    }
    drop(st);
    info!(preset = %name, "preset finished");
}

/// Clamp and store the phone-rig target under the lock, then write both
/// servo angles through the gate.
fn aim_phone_rig(deps: &PresetDeps, pan: Option<i32>, tilt: Option<i32>) {
    let ctx = &deps.effects.ctx;
    let (pan_now, tilt_now) = {
        let mut st = ctx.lock();
        if let Some(pan) = pan {
            st.phone_pan = ctx.limits.clamp_pan(pan);
        }
        if let Some(tilt) = tilt {
            st.phone_tilt = ctx.limits.clamp_tilt(tilt);
        }
        (st.phone_pan, st.phone_tilt)
    };
    for (port, angle) in [(PHONE_PAN_PORT, pan_now), (PHONE_TILT_PORT, tilt_now)] {
        let trimmed = ctx.offsets.apply(port, angle);
        if let Err(e) = deps.actuator.set_servo_angle(port, trimmed) {
            warn!(port, error = %e, "pan/tilt write failed");
        }
    }
}
