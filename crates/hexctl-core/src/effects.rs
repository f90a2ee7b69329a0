//! Effect sequencers: short-lived, time-paced tasks driving the LED strip
//! and the buzzer concurrently with the motion worker.
//!
//! Every step of a multi-step sequence checks the stop gate and the
//! effect's own cancel token before proceeding; an aborted LED sequence
//! drives the strip off on its way out.
//!
//! Triggered effects are supervised by an [`EffectRegistry`] keyed by
//! [`EffectKind`]: starting a new effect cancels the prior same-kind run
//! instead of racing with it over the hardware. The superseded task
//! notices its stale token at its next step boundary.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use hexctl_hal::{BuzzerDevice, LedStrip};
use hexctl_types::Rgb;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::state::ControlContext;

/// The kinds of effect that may run concurrently. At most one live run
/// per kind is supervised at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EffectKind {
    Led,
    Buzzer,
    Preset,
}

/// Cooperative cancellation flag handed to each sequencer run.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

struct ActiveEffect {
    id: Uuid,
    token: CancelToken,
}

/// Supervised registry of in-flight effects, keyed by kind.
#[derive(Default)]
pub struct EffectRegistry {
    slots: Mutex<HashMap<EffectKind, ActiveEffect>>,
}

impl EffectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new run of `kind`, cancelling any prior same-kind run.
    /// Returns the run identity and its cancel token.
    pub fn begin(&self, kind: EffectKind) -> (Uuid, CancelToken) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(prev) = slots.get(&kind) {
            prev.token.cancel();
            debug!(kind = ?kind, superseded = %prev.id, "previous effect cancelled");
        }
        let id = Uuid::new_v4();
        let token = CancelToken::new();
        slots.insert(
            kind,
            ActiveEffect {
                id,
                token: token.clone(),
            },
        );
        (id, token)
    }
}

/// Handles a sequencer needs: the shared context plus the two effect
/// peripherals and the registry itself.
#[derive(Clone)]
pub struct EffectDeps {
    pub ctx: Arc<ControlContext>,
    pub led: Arc<Mutex<Box<dyn LedStrip>>>,
    pub buzzer: Arc<Mutex<Box<dyn BuzzerDevice>>>,
    pub registry: Arc<EffectRegistry>,
}

/// A resolved LED request: mode plus the parameters its sequencer needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedAction {
    Off,
    Solid(Rgb),
    Blink(Rgb),
    Breathe { color: Rgb, cycles: u32 },
    Police,
    Rainbow,
}

/// Why a sequence must not proceed to its next step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Abort {
    /// The stop gate is engaged: drive the LEDs off on the way out.
    Stop,
    /// A newer same-kind effect owns the hardware: exit silently.
    Superseded,
}

/// Step-boundary check run before every step of a multi-step sequence.
pub(crate) fn step_gate(ctx: &ControlContext, token: &CancelToken) -> Option<Abort> {
    if token.is_cancelled() {
        Some(Abort::Superseded)
    } else if ctx.lock().stop_all {
        Some(Abort::Stop)
    } else {
        None
    }
}

/// Paint the whole strip, tracking the last color on success. LED writes
/// are not gated; only sequencing is stop-aware.
pub(crate) fn wipe(deps: &EffectDeps, color: Rgb) {
    let result = deps
        .led
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .color_wipe(color);
    match result {
        Ok(()) => deps.ctx.lock().led_last_color = color,
        Err(e) => warn!(error = %e, "led write failed"),
    }
}

pub(crate) fn buzz(deps: &EffectDeps, on: bool) {
    let result = deps
        .buzzer
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .set_state(on);
    if let Err(e) = result {
        warn!(error = %e, on, "buzzer write failed");
    }
}

/// Dispatch an LED request. `Off` and `Solid` apply immediately (still
/// superseding any running LED sequence); the animated modes spawn a
/// sequencer task.
pub fn spawn_led_effect(deps: &EffectDeps, action: LedAction) -> Uuid {
    let (id, token) = deps.registry.begin(EffectKind::Led);
    match action {
        LedAction::Off => wipe(deps, Rgb::OFF),
        LedAction::Solid(color) => wipe(deps, color),
        LedAction::Blink(color) => {
            let deps = deps.clone();
            tokio::spawn(async move { run_blink(deps, color, token).await });
        }
        LedAction::Breathe { color, cycles } => {
            let deps = deps.clone();
            tokio::spawn(async move { run_breathe(deps, color, cycles, token).await });
        }
        LedAction::Police => {
            let deps = deps.clone();
            tokio::spawn(async move { run_police(deps, token).await });
        }
        LedAction::Rainbow => {
            let deps = deps.clone();
            tokio::spawn(async move { run_rainbow(deps, token).await });
        }
    }
    info!(run = %id, ?action, "led effect triggered");
    id
}

/// Spawn one short beep of the given length.
pub fn spawn_buzzer_pulse(deps: &EffectDeps, duration: Duration) -> Uuid {
    let (id, token) = deps.registry.begin(EffectKind::Buzzer);
    let deps = deps.clone();
    tokio::spawn(async move {
        if step_gate(&deps.ctx, &token).is_some() {
            return;
        }
        buzz(&deps, true);
        tokio::time::sleep(duration).await;
        // The release write always happens, even mid-stop.
        buzz(&deps, false);
    });
    id
}

// ────────────────────────────────────────────────────────────────────────────
// LED sequencers (timings from the stock effect set)
// ────────────────────────────────────────────────────────────────────────────

/// Play a list of (color, hold) frames, re-checking the gate before every
/// frame. Returns false when the sequence was cut short.
async fn play_frames(
    deps: &EffectDeps,
    token: &CancelToken,
    frames: impl IntoIterator<Item = (Rgb, Duration)>,
) -> bool {
    for (color, hold) in frames {
        match step_gate(&deps.ctx, token) {
            Some(Abort::Superseded) => return false,
            Some(Abort::Stop) => {
                wipe(deps, Rgb::OFF);
                return false;
            }
            None => {}
        }
        wipe(deps, color);
        tokio::time::sleep(hold).await;
    }
    true
}

async fn run_blink(deps: EffectDeps, color: Rgb, token: CancelToken) {
    let frames = (0..3).flat_map(|_| {
        [
            (color, Duration::from_millis(200)),
            (Rgb::OFF, Duration::from_millis(150)),
        ]
    });
    play_frames(&deps, &token, frames).await;
}

async fn run_breathe(deps: EffectDeps, color: Rgb, cycles: u32, token: CancelToken) {
    let frames = (0..cycles).flat_map(|_| {
        (0..=20)
            .chain((0..=20).rev())
            .map(move |level| (color.scaled(level, 20), Duration::from_millis(60)))
    });
    if play_frames(&deps, &token, frames).await && !token.is_cancelled() {
        wipe(&deps, Rgb::OFF);
    }
}

async fn run_police(deps: EffectDeps, token: CancelToken) {
    let frames = (0..6).flat_map(|_| {
        [
            (Rgb::new(255, 0, 0), Duration::from_millis(120)),
            (Rgb::OFF, Duration::from_millis(50)),
            (Rgb::new(0, 0, 255), Duration::from_millis(120)),
            (Rgb::OFF, Duration::from_millis(50)),
        ]
    });
    play_frames(&deps, &token, frames).await;
}

async fn run_rainbow(deps: EffectDeps, token: CancelToken) {
    let frames = (0..60).map(|k| (hsv_wheel(k as f32 / 60.0), Duration::from_millis(50)));
    if play_frames(&deps, &token, frames).await && !token.is_cancelled() {
        wipe(&deps, Rgb::OFF);
    }
}

/// Map a hue in [0, 1) around the color wheel at full saturation.
fn hsv_wheel(h: f32) -> Rgb {
    let h = h * 6.0;
    let i = h.floor() as i32;
    let f = h - i as f32;
    let q = (255.0 * (1.0 - f)) as u8;
    let t = (255.0 * f) as u8;
    match i {
        0 => Rgb::new(255, t, 0),
        1 => Rgb::new(q, 255, 0),
        2 => Rgb::new(0, 255, t),
        3 => Rgb::new(0, q, 255),
        4 => Rgb::new(t, 0, 255),
        _ => Rgb::new(255, 0, q),
    }
}
