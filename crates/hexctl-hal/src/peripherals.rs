//! Traits for the discrete effect peripherals: the LED strip and the buzzer.

use hexctl_types::{ControlError, Rgb};

/// An addressable RGB strip driven as one solid color at a time.
pub trait LedStrip: Send {
    /// Paint every pixel with `color`.
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::Hardware`] if the strip write fails.
    fn color_wipe(&mut self, color: Rgb) -> Result<(), ControlError>;
}

/// A discrete on/off buzzer.
pub trait BuzzerDevice: Send {
    /// Drive the buzzer (`true` = sounding).
    fn set_state(&mut self, on: bool) -> Result<(), ControlError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MockStrip {
        current: Rgb,
    }

    impl LedStrip for MockStrip {
        fn color_wipe(&mut self, color: Rgb) -> Result<(), ControlError> {
            self.current = color;
            Ok(())
        }
    }

    #[test]
    fn mock_strip_holds_last_color() {
        let mut strip = MockStrip { current: Rgb::OFF };
        strip.color_wipe(Rgb::new(255, 0, 0)).unwrap();
        assert_eq!(strip.current, Rgb::new(255, 0, 0));
    }
}
