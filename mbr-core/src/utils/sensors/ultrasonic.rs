//! Ultrasonic range finder.
//!
//! A short high pulse on the trigger line starts a ping; the echo line then
//! stays high for the round-trip time of the sound. The wait is bounded by the
//! time sound needs for 255 cm, and no echo within that bound reads as
//! [`DistanceReading::NO_ECHO`].

use embedded_hal::{
    delay::DelayNs,
    digital::{OutputPin, PinState},
};
use serde::Serialize;

/// Largest reportable distance; also the no-echo sentinel.
pub const MAX_RANGE_CM: u8 = 255;
/// Speed of sound at room temperature (343 m/s).
pub const SPEED_OF_SOUND_CM_PER_US: f32 = 0.0343;
/// `255 / 34300 * 1_000_000`, truncated.
pub const ECHO_TIMEOUT_US: u32 = (MAX_RANGE_CM as u32 * 1_000_000) / 34_300;
/// Width of the trigger pulse.
pub const TRIGGER_PULSE_US: u32 = 10;
/// Calibration offset subtracted from every measurement.
const CALIBRATION_CM: f32 = 1.0;

/// Blocking pulse-width timer on the echo line.
pub trait PulseTimer {
    /// Wait for the line to reach `level`, then time how long it stays there.
    ///
    /// Returns `None` if no complete pulse was seen within `timeout_us`.
    fn pulse_width_us(
        &mut self,
        level: PinState,
        timeout_us: u32,
    ) -> Option<u32>;
}

/// Distance in centimeters, 255 meaning "no echo / out of range".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct DistanceReading(u8);

impl DistanceReading {
    pub const NO_ECHO: DistanceReading = DistanceReading(MAX_RANGE_CM);

    /// Convert an echo pulse width: half the round trip at the speed of
    /// sound, minus the calibration offset, floored into `0..=254`.
    pub fn from_echo_us(echo_us: u32) -> Self {
        let cm = (echo_us as f32 / 2.0) * SPEED_OF_SOUND_CM_PER_US - CALIBRATION_CM;
        let cm = libm::floorf(cm).clamp(0.0, (MAX_RANGE_CM - 1) as f32);
        DistanceReading(cm as u8)
    }

    /// Raw value including the sentinel.
    pub fn raw(self) -> u8 {
        self.0
    }

    /// Measured distance, `None` for the sentinel.
    pub fn cm(self) -> Option<u8> {
        (!self.is_no_echo()).then_some(self.0)
    }

    pub fn is_no_echo(self) -> bool {
        self.0 == MAX_RANGE_CM
    }
}

pub struct DistanceSensor<Trig, Echo, D> {
    trigger: Trig,
    echo: Echo,
    delay: D,
}

impl<Trig, Echo, D> DistanceSensor<Trig, Echo, D>
where
    Trig: OutputPin,
    Echo: PulseTimer,
    D: DelayNs,
{
    pub fn new(
        trigger: Trig,
        echo: Echo,
        delay: D,
    ) -> Self {
        Self {
            trigger,
            echo,
            delay,
        }
    }

    /// Run one ping/echo cycle. Blocks for at most [`ECHO_TIMEOUT_US`] after
    /// the trigger pulse.
    ///
    /// A trigger line that cannot be driven reads as no echo.
    pub fn measure_cm(&mut self) -> DistanceReading {
        if let Err(e) = self.pulse_trigger() {
            tracing::warn!("ultrasonic trigger failed: {:?}", e);
            return DistanceReading::NO_ECHO;
        }
        match self.echo.pulse_width_us(PinState::High, ECHO_TIMEOUT_US) {
            Some(echo_us) => {
                let reading = DistanceReading::from_echo_us(echo_us);
                tracing::trace!(echo_us, cm = reading.raw(), "echo");
                reading
            }
            None => DistanceReading::NO_ECHO,
        }
    }

    fn pulse_trigger(&mut self) -> Result<(), Trig::Error> {
        self.trigger.set_high()?;
        self.delay.delay_us(TRIGGER_PULSE_US);
        self.trigger.set_low()
    }
}
