//! Module Exports
//!
//! This file exports the actuator controllers of the mbRobot and the
//! `SystemController` that dispatches queued commands to them.
//!
//! - `i2c`: frame encoding for the motor board
//! - `motion`: speed state and differential-drive motion
//! - `leds`: front LEDs and RGB strip
//! - `alarm`: buzzer tones and the light/sound alarm
//! - `display`: level bar on the LED matrix

pub mod alarm;
pub mod display;
/// Module for the motor board bus frames.
pub mod i2c;
pub mod leds;
pub mod motion;

use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, channel::Channel};
use embedded_hal::{delay::DelayNs, digital::OutputPin, i2c::I2c};
use serde::{Deserialize, Serialize};
use smart_leds_trait::{SmartLedsWrite, RGB8};

pub use alarm::{AlarmCommand, AlarmController, TonePlayer};
pub use i2c::MotorBoard;
pub use leds::{LightCommand, LightingController};
pub use motion::{MotionCommand, MotionController};

use crate::utils::{
    error::DeviceError,
    sensors::{DistanceReading, DistanceSensor, PulseTimer, ReflectanceArray, ReflectanceSample},
};

/// Queue feeding [`SystemController::command_ch`]. One consumer owns the bus,
/// so queued commands never interleave on the wire.
pub static COMMAND_CHANNEL: Channel<CriticalSectionRawMutex, SystemCommand, 16> = Channel::new();

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
#[serde(tag = "ct", rename_all = "snake_case")] // ct = command type
pub enum SystemCommand {
    M(MotionCommand),
    L(LightCommand),
    A(AlarmCommand),
    S(SensorCommand),
}

impl SystemCommand {
    /// Parse a JSON command such as `{"ct":"m","mc":"arc_left","r":0.2}`.
    pub fn from_json(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

/// Sensor read requests.
///
/// Serialized as JSON with tag `"sc"`.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(tag = "sc", rename_all = "snake_case")]
pub enum SensorCommand {
    Distance,
    Reflectance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SensorReading {
    Distance(DistanceReading),
    Reflectance(ReflectanceSample),
}

/// Every actuator and sensor of the robot behind one command entry point.
///
/// Bus failures are logged and returned; the command loop keeps going.
pub struct SystemController<I2C, Strip, Tone, D, Trig, Echo> {
    pub motion: MotionController<I2C>,
    pub lights: LightingController<I2C, Strip>,
    pub alarm: AlarmController<Tone, D>,
    pub distance: DistanceSensor<Trig, Echo, D>,
    pub line: ReflectanceArray<I2C>,
}

impl<I2C, E, Strip, SE, Tone, D, Trig, Echo> SystemController<I2C, Strip, Tone, D, Trig, Echo>
where
    I2C: I2c<Error = E>,
    E: core::fmt::Debug,
    Strip: SmartLedsWrite<Color = RGB8, Error = SE>,
    SE: core::fmt::Debug,
    Tone: TonePlayer,
    D: DelayNs,
    Trig: OutputPin,
    Echo: PulseTimer,
{
    pub fn new(
        motion: MotionController<I2C>,
        lights: LightingController<I2C, Strip>,
        alarm: AlarmController<Tone, D>,
        distance: DistanceSensor<Trig, Echo, D>,
        line: ReflectanceArray<I2C>,
    ) -> Self {
        SystemController {
            motion,
            lights,
            alarm,
            distance,
            line,
        }
    }

    /// Stop the wheels, then switch off both LEDs and the RGB strip.
    pub fn reset_outputs(&mut self) -> Result<(), DeviceError<E, SE>> {
        self.motion.stop().map_err(DeviceError::widen::<SE>)?;
        self.lights.clear_leds()?;
        self.lights.clear_all()
    }

    /// Execute one `SystemCommand`.
    ///
    /// Returns the reading for sensor commands and `None` otherwise.
    pub fn execute(
        &mut self,
        command: SystemCommand,
    ) -> Result<Option<SensorReading>, DeviceError<E, SE>> {
        match command {
            SystemCommand::M(cmd) => {
                self.motion.execute(cmd).map_err(DeviceError::widen::<SE>)?;
                Ok(None)
            }
            SystemCommand::L(cmd) => {
                self.lights.execute(cmd)?;
                Ok(None)
            }
            SystemCommand::A(cmd) => {
                self.alarm.execute(cmd, &mut self.lights)?;
                Ok(None)
            }
            SystemCommand::S(SensorCommand::Distance) => {
                Ok(Some(SensorReading::Distance(self.distance.measure_cm())))
            }
            SystemCommand::S(SensorCommand::Reflectance) => {
                let sample = self.line.read().map_err(DeviceError::widen::<SE>)?;
                Ok(Some(SensorReading::Reflectance(sample)))
            }
        }
    }

    /// Drain [`COMMAND_CHANNEL`] forever.
    pub async fn command_ch(&mut self) -> ! {
        loop {
            let command = COMMAND_CHANNEL.receiver().receive().await;
            tracing::info!("Received command: {:?}", command);
            match self.execute(command) {
                Ok(Some(reading)) => tracing::info!(?reading, "Sensor read"),
                Ok(None) => tracing::debug!("command executed"),
                Err(e) => tracing::error!("command {:?} failed: {}", command, e),
            }
        }
    }
}
