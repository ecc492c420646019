//! Buzzer tones and the combined light/sound alarm.
//!
//! Tone playback is delegated to a [`TonePlayer`], which plays in the
//! background. The visual part of the alarm blinks the front LEDs and the RGB
//! strip synchronously, so [`AlarmController::sound_alarm`] blocks for
//! `cycles * (on + off)`.

use embassy_time::Duration;
use embedded_hal::{delay::DelayNs, i2c::I2c};
use serde::{Deserialize, Serialize};
use smart_leds_trait::{SmartLedsWrite, RGB8};

use super::leds::LightingController;
use crate::utils::{config::RobotConfig, error::DeviceError};

const RED: RGB8 = RGB8 { r: 255, g: 0, b: 0 };

/// A single tone of a melody.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Note {
    pub frequency_hz: u32,
    pub duration_ms: u32,
}

impl Note {
    pub const fn new(
        frequency_hz: u32,
        duration_ms: u32,
    ) -> Self {
        Self {
            frequency_hz,
            duration_ms,
        }
    }
}

/// Two-tone siren (B5 / G5).
pub const ALARM_MELODY: &[Note] = &[
    Note::new(988, 150),
    Note::new(784, 150),
    Note::new(988, 150),
    Note::new(784, 150),
];

/// Background tone generator on the buzzer pin.
///
/// None of these calls may block.
pub trait TonePlayer {
    /// Start `melody`; with `repeat` it loops until [`TonePlayer::stop`].
    fn play(
        &mut self,
        melody: &'static [Note],
        repeat: bool,
    );

    /// Play a single tone for `duration_ms`.
    fn pitch(
        &mut self,
        frequency_hz: u32,
        duration_ms: u32,
    );

    fn stop(&mut self);
}

/// Alarm command variants.
///
/// Serialized as JSON with tag `"ac"`.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(tag = "ac", rename_all = "snake_case")]
pub enum AlarmCommand {
    /// Melody plus blinking lights, blocks until the blinking ends.
    Sound,
    /// Short beep at frequency `f` (Hz).
    Beep { f: u32 },
    /// Loop the alarm melody in the background, or stop it.
    Siren { on: bool },
}

/// Blink pattern of a sounded alarm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlarmTiming {
    pub cycles: u8,
    pub on: Duration,
    pub off: Duration,
}

impl Default for AlarmTiming {
    fn default() -> Self {
        RobotConfig::default().alarm_timing()
    }
}

impl AlarmTiming {
    /// How long `sound_alarm` blocks.
    pub fn total(&self) -> Duration {
        (self.on + self.off) * u32::from(self.cycles)
    }
}

pub struct AlarmController<T, D> {
    tone: T,
    delay: D,
    timing: AlarmTiming,
    beep_ms: u32,
}

impl<T, D> AlarmController<T, D>
where
    T: TonePlayer,
    D: DelayNs,
{
    pub fn new(
        tone: T,
        delay: D,
        config: &RobotConfig,
    ) -> Self {
        Self {
            tone,
            delay,
            timing: config.alarm_timing(),
            beep_ms: config.beep_ms,
        }
    }

    pub fn timing(&self) -> AlarmTiming {
        self.timing
    }

    /// Non-blocking single tone.
    pub fn beep(
        &mut self,
        frequency_hz: u32,
    ) {
        self.tone.pitch(frequency_hz, self.beep_ms);
    }

    pub fn set_siren(
        &mut self,
        on: bool,
    ) {
        if on {
            self.tone.play(ALARM_MELODY, true);
        } else {
            self.tone.stop();
        }
    }

    /// Start the alarm melody and blink the front LEDs and the whole strip red.
    ///
    /// Lights end up off. A failed light write aborts the blinking and is
    /// returned after every light has been switched off once more; the melody
    /// keeps playing to its end.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn sound_alarm<I2C, E, Driver, SE>(
        &mut self,
        lights: &mut LightingController<I2C, Driver>,
    ) -> Result<(), DeviceError<E, SE>>
    where
        I2C: I2c<Error = E>,
        E: core::fmt::Debug,
        Driver: SmartLedsWrite<Color = RGB8, Error = SE>,
        SE: core::fmt::Debug,
    {
        self.tone.play(ALARM_MELODY, false);
        let blinked = self.blink(lights);
        if blinked.is_err() {
            // Every light separately, even after one of them fails.
            let cleared = [
                lights.set_left_led(false),
                lights.set_right_led(false),
                lights.clear_all(),
            ];
            for result in cleared {
                if let Err(e) = result {
                    tracing::warn!("alarm light left on: {}", e);
                }
            }
        }
        blinked
    }

    fn blink<I2C, E, Driver, SE>(
        &mut self,
        lights: &mut LightingController<I2C, Driver>,
    ) -> Result<(), DeviceError<E, SE>>
    where
        I2C: I2c<Error = E>,
        E: core::fmt::Debug,
        Driver: SmartLedsWrite<Color = RGB8, Error = SE>,
        SE: core::fmt::Debug,
    {
        for _ in 0..self.timing.cycles {
            lights.set_both_leds(true)?;
            lights.set_all(RED)?;
            self.pause(self.timing.on);
            lights.set_both_leds(false)?;
            lights.clear_all()?;
            self.pause(self.timing.off);
        }
        Ok(())
    }

    /// Execute an incoming `AlarmCommand`.
    pub fn execute<I2C, E, Driver, SE>(
        &mut self,
        cmd: AlarmCommand,
        lights: &mut LightingController<I2C, Driver>,
    ) -> Result<(), DeviceError<E, SE>>
    where
        I2C: I2c<Error = E>,
        E: core::fmt::Debug,
        Driver: SmartLedsWrite<Color = RGB8, Error = SE>,
        SE: core::fmt::Debug,
    {
        match cmd {
            AlarmCommand::Sound => self.sound_alarm(lights),
            AlarmCommand::Beep { f } => {
                self.beep(f);
                Ok(())
            }
            AlarmCommand::Siren { on } => {
                self.set_siren(on);
                Ok(())
            }
        }
    }

    fn pause(
        &mut self,
        duration: Duration,
    ) {
        let ms = u32::try_from(duration.as_millis()).unwrap_or(u32::MAX);
        self.delay.delay_ms(ms);
    }
}
