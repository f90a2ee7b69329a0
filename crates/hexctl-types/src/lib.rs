use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Servo port of the phone-rig pan servo.
pub const PHONE_PAN_PORT: u8 = 24;
/// Servo port of the phone-rig tilt servo.
pub const PHONE_TILT_PORT: u8 = 25;
/// Servo port of the built-in head pan servo.
pub const HEAD_PAN_PORT: u8 = 6;
/// Servo port of the built-in head tilt servo.
pub const HEAD_TILT_PORT: u8 = 7;

/// Neutral angle for a freshly initialised pan/tilt servo.
pub const CENTER_ANGLE: i32 = 90;

/// Default pan/tilt step in degrees when the request does not carry one.
pub const DEFAULT_STEP: i32 = 3;

/// Body-height envelope and named poses, in the gait engine's z units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeightLimits {
    pub min_z: i32,
    pub max_z: i32,
    /// Fully raised tabletop pose.
    pub tabletop_z: i32,
    /// Normal walking pose, also the startup height.
    pub reset_z: i32,
}

impl Default for HeightLimits {
    fn default() -> Self {
        Self {
            min_z: -30,
            max_z: 45,
            tabletop_z: 40,
            reset_z: 15,
        }
    }
}

impl HeightLimits {
    /// Clamp `z` into `[min_z, max_z]`. Out-of-range values are never an
    /// error, always clamped.
    pub fn clamp(&self, z: i32) -> i32 {
        z.clamp(self.min_z, self.max_z)
    }
}

/// Configured pan/tilt angle bounds, shared by both rigs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanTiltLimits {
    pub pan_min: i32,
    pub pan_max: i32,
    pub tilt_min: i32,
    pub tilt_max: i32,
}

impl Default for PanTiltLimits {
    fn default() -> Self {
        Self {
            pan_min: 0,
            pan_max: 180,
            tilt_min: 0,
            tilt_max: 180,
        }
    }
}

impl PanTiltLimits {
    pub fn clamp_pan(&self, angle: i32) -> i32 {
        angle.clamp(self.pan_min, self.pan_max)
    }

    pub fn clamp_tilt(&self, angle: i32) -> i32 {
        angle.clamp(self.tilt_min, self.tilt_max)
    }
}

/// Per-port mechanical trim applied to every servo-angle write.
///
/// The table is produced by the configuration layer; the core never parses
/// offset files itself. The offset result is clamped into the servo's
/// physical 0..=180 range.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServoOffsets(HashMap<u8, i32>);

impl ServoOffsets {
    pub fn new(table: HashMap<u8, i32>) -> Self {
        Self(table)
    }

    /// Apply the port's offset to `angle` and clamp into 0..=180.
    pub fn apply(&self, port: u8, angle: i32) -> u8 {
        let trimmed = angle + self.0.get(&port).copied().unwrap_or(0);
        trimmed.clamp(0, 180) as u8
    }
}

/// One parameterized walking-cycle increment handed to the external gait
/// engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GaitStep {
    /// Forward/backward stride length.
    pub direction: i32,
    /// Sideways stride length.
    pub lateral: i32,
    /// Foot lift height.
    pub step_height: i32,
    /// In-place rotation rate.
    pub turn_rate: i32,
}

/// An enumerated, parameterized movement or pose command. Immutable once
/// constructed; exactly one instance lives in the command slot at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MotionCommand {
    Forward,
    Backward,
    StrafeLeft,
    StrafeRight,
    TurnLeft,
    TurnRight,
    Raise,
    Lower,
    TabletopPose,
    ResetPose,
}

impl MotionCommand {
    /// The gait parameters for walking commands, `None` for height and pose
    /// commands (those recompute `body_z` and issue a pose move instead).
    pub fn gait_step(&self) -> Option<GaitStep> {
        let step = match self {
            MotionCommand::Forward => GaitStep {
                direction: 35,
                lateral: 0,
                step_height: 10,
                turn_rate: 0,
            },
            MotionCommand::Backward => GaitStep {
                direction: -35,
                lateral: 0,
                step_height: 10,
                turn_rate: 10,
            },
            MotionCommand::StrafeRight => GaitStep {
                direction: 0,
                lateral: 35,
                step_height: 10,
                turn_rate: 0,
            },
            MotionCommand::StrafeLeft => GaitStep {
                direction: 0,
                lateral: -35,
                step_height: 10,
                turn_rate: 0,
            },
            MotionCommand::TurnLeft => GaitStep {
                direction: 0,
                lateral: 0,
                step_height: 10,
                turn_rate: 20,
            },
            MotionCommand::TurnRight => GaitStep {
                direction: 0,
                lateral: 0,
                step_height: 10,
                turn_rate: -20,
            },
            _ => return None,
        };
        Some(step)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MotionCommand::Forward => "forward",
            MotionCommand::Backward => "backward",
            MotionCommand::StrafeLeft => "strafe-left",
            MotionCommand::StrafeRight => "strafe-right",
            MotionCommand::TurnLeft => "turn-left",
            MotionCommand::TurnRight => "turn-right",
            MotionCommand::Raise => "raise",
            MotionCommand::Lower => "lower",
            MotionCommand::TabletopPose => "tabletop-pose",
            MotionCommand::ResetPose => "reset-pose",
        }
    }
}

impl fmt::Display for MotionCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MotionCommand {
    type Err = ControlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "forward" => Ok(MotionCommand::Forward),
            "backward" => Ok(MotionCommand::Backward),
            "strafe-left" => Ok(MotionCommand::StrafeLeft),
            "strafe-right" => Ok(MotionCommand::StrafeRight),
            "turn-left" => Ok(MotionCommand::TurnLeft),
            "turn-right" => Ok(MotionCommand::TurnRight),
            "raise" => Ok(MotionCommand::Raise),
            "lower" => Ok(MotionCommand::Lower),
            "tabletop-pose" => Ok(MotionCommand::TabletopPose),
            "reset-pose" => Ok(MotionCommand::ResetPose),
            other => Err(ControlError::UnknownCommand(other.to_string())),
        }
    }
}

/// A named pan/tilt servo pair with independently tracked angle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rig {
    /// Auxiliary phone-mount rig on ports 24/25.
    Phone,
    /// Built-in head on ports 6/7.
    Head,
}

impl Rig {
    pub fn pan_port(&self) -> u8 {
        match self {
            Rig::Phone => PHONE_PAN_PORT,
            Rig::Head => HEAD_PAN_PORT,
        }
    }

    pub fn tilt_port(&self) -> u8 {
        match self {
            Rig::Phone => PHONE_TILT_PORT,
            Rig::Head => HEAD_TILT_PORT,
        }
    }
}

impl fmt::Display for Rig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rig::Phone => f.write_str("phone"),
            Rig::Head => f.write_str("head"),
        }
    }
}

impl FromStr for Rig {
    type Err = ControlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "phone" => Ok(Rig::Phone),
            "head" => Ok(Rig::Head),
            other => Err(ControlError::UnknownRig(other.to_string())),
        }
    }
}

/// A single aiming adjustment for a pan/tilt rig.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PanTiltAction {
    PanLeft,
    PanRight,
    TiltUp,
    TiltDown,
    Center,
    /// Cut PWM to all servos. Only the phone rig supports this.
    Relax,
}

impl fmt::Display for PanTiltAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PanTiltAction::PanLeft => "pan-left",
            PanTiltAction::PanRight => "pan-right",
            PanTiltAction::TiltUp => "tilt-up",
            PanTiltAction::TiltDown => "tilt-down",
            PanTiltAction::Center => "center",
            PanTiltAction::Relax => "relax",
        };
        f.write_str(s)
    }
}

impl FromStr for PanTiltAction {
    type Err = ControlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pan-left" => Ok(PanTiltAction::PanLeft),
            "pan-right" => Ok(PanTiltAction::PanRight),
            "tilt-up" => Ok(PanTiltAction::TiltUp),
            "tilt-down" => Ok(PanTiltAction::TiltDown),
            "center" => Ok(PanTiltAction::Center),
            "relax" => Ok(PanTiltAction::Relax),
            other => Err(ControlError::UnknownAction(other.to_string())),
        }
    }
}

/// A 24-bit LED strip color.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const OFF: Rgb = Rgb { r: 0, g: 0, b: 0 };

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Scale every channel by `level / full`, used by the breathe effect.
    pub fn scaled(&self, level: u32, full: u32) -> Rgb {
        let scale = |c: u8| ((c as u32 * level) / full.max(1)) as u8;
        Rgb {
            r: scale(self.r),
            g: scale(self.g),
            b: scale(self.b),
        }
    }
}

/// Requested LED behavior. `Off` and `Solid` apply immediately; the rest
/// spawn a time-paced sequencer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedMode {
    Off,
    Solid,
    Blink,
    Breathe,
    Police,
    Rainbow,
}

impl FromStr for LedMode {
    type Err = ControlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "off" => Ok(LedMode::Off),
            "solid" => Ok(LedMode::Solid),
            "blink" => Ok(LedMode::Blink),
            "breathe" => Ok(LedMode::Breathe),
            "police" => Ok(LedMode::Police),
            "rainbow" => Ok(LedMode::Rainbow),
            other => Err(ControlError::UnknownLedMode(other.to_string())),
        }
    }
}

/// Requested buzzer behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuzzerMode {
    /// One short beep, run as a background sequencer.
    Pulse,
    On,
    Off,
}

impl FromStr for BuzzerMode {
    type Err = ControlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pulse" => Ok(BuzzerMode::Pulse),
            "on" => Ok(BuzzerMode::On),
            "off" => Ok(BuzzerMode::Off),
            other => Err(ControlError::UnknownBuzzerMode(other.to_string())),
        }
    }
}

/// Identity of a scripted preset in the known registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresetName {
    /// Patrol forward with a scanning pan, cyan LEDs, little beeps.
    Demo1,
    /// Guard scan: tabletop pose, slow turns, red LEDs.
    Demo2,
    /// Party: rainbow LEDs and alternating movement.
    Demo3,
}

impl fmt::Display for PresetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PresetName::Demo1 => f.write_str("demo1"),
            PresetName::Demo2 => f.write_str("demo2"),
            PresetName::Demo3 => f.write_str("demo3"),
        }
    }
}

impl FromStr for PresetName {
    type Err = ControlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "demo1" => Ok(PresetName::Demo1),
            "demo2" => Ok(PresetName::Demo2),
            "demo3" => Ok(PresetName::Demo3),
            other => Err(ControlError::UnknownPreset(other.to_string())),
        }
    }
}

/// Global error type spanning request validation and hardware faults.
///
/// Unknown names are rejected synchronously with no state mutated.
/// Hardware faults are recovered at the call site and never crash the
/// worker or a sequencer.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlError {
    #[error("unknown movement command '{0}'")]
    UnknownCommand(String),

    #[error("unknown pan/tilt rig '{0}'")]
    UnknownRig(String),

    #[error("unknown pan/tilt action '{0}'")]
    UnknownAction(String),

    #[error("action '{action}' is not supported on the {rig} rig")]
    UnsupportedAction { rig: Rig, action: PanTiltAction },

    #[error("unknown LED mode '{0}'")]
    UnknownLedMode(String),

    #[error("unknown buzzer mode '{0}'")]
    UnknownBuzzerMode(String),

    #[error("unknown preset '{0}'")]
    UnknownPreset(String),

    #[error("hardware fault on {component}: {details}")]
    Hardware { component: String, details: String },
}

/// Point-in-time view of the shared control state, returned with every
/// request reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub body_z: i32,
    pub phone_pan: i32,
    pub phone_tilt: i32,
    pub head_pan: i32,
    pub head_tilt: i32,
    /// True while the soft emergency stop is engaged.
    pub stop_engaged: bool,
    pub active_preset: Option<PresetName>,
    /// Command currently waiting in the slot, if the worker has not drained
    /// it yet.
    pub pending_command: Option<MotionCommand>,
    pub led_last_color: Rgb,
}

/// What every inbound operation returns: a human-readable status line plus
/// a snapshot of the state after the operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlReply {
    pub status: String,
    pub snapshot: StateSnapshot,
}

// ────────────────────────────────────────────────────────────────────────────
// Sensor readings
// ────────────────────────────────────────────────────────────────────────────

/// Battery condition bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatteryStatus {
    NoReading,
    Low,
    Ok,
    Full,
}

/// Proximity bands for the ultrasonic ranger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProximityStatus {
    NoEcho,
    VeryClose,
    Close,
    Clear,
}

/// A successful battery sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BatteryReading {
    pub volts: f32,
    pub status: BatteryStatus,
}

impl BatteryReading {
    pub fn classify(volts: f32) -> Self {
        let status = if volts <= 0.0 {
            BatteryStatus::NoReading
        } else if volts < 6.5 {
            BatteryStatus::Low
        } else if volts < 7.4 {
            BatteryStatus::Ok
        } else {
            BatteryStatus::Full
        };
        Self { volts, status }
    }
}

/// A successful ultrasonic sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DistanceReading {
    pub centimeters: f32,
    pub status: ProximityStatus,
}

impl DistanceReading {
    pub fn classify(centimeters: f32) -> Self {
        let status = if centimeters <= 0.0 {
            ProximityStatus::NoEcho
        } else if centimeters < 10.0 {
            ProximityStatus::VeryClose
        } else if centimeters < 25.0 {
            ProximityStatus::Close
        } else {
            ProximityStatus::Clear
        };
        Self {
            centimeters,
            status,
        }
    }
}

/// Result of polling all sensors in one request. A failure of one sensor
/// never hides the readings of the others; each field carries either its
/// value or the error message from its driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReport {
    pub battery: Result<BatteryReading, String>,
    pub distance: Result<DistanceReading, String>,
}

impl SensorReport {
    /// True when every sensor produced a reading.
    pub fn all_ok(&self) -> bool {
        self.battery.is_ok() && self.distance.is_ok()
    }
}
