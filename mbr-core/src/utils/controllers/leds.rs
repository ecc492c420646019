//! LED control module for the mbRobot.
//!
//! Two kinds of lights live on the chassis:
//!
//! - the red front LEDs, switched through actuator registers of the motor board;
//! - a 4-pixel addressable RGB strip underneath, driven via `SmartLedsWrite`.
//!
//! The strip driver only accepts whole-strip writes, so the controller keeps
//! the last written colors and refreshes all four pixels on every change.

use embedded_hal::i2c::I2c;
use serde::{Deserialize, Serialize};
use smart_leds_trait::{SmartLedsWrite, RGB8};

use super::i2c::{register, MotorBoard};
use crate::utils::error::DeviceError;

/// Number of pixels on the underbody strip.
pub const STRIP_LEN: usize = 4;

const OFF: RGB8 = RGB8 { r: 0, g: 0, b: 0 };

/// Pixel positions on the strip, in chain order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StripPosition {
    FrontLeft,
    BackLeft,
    BackRight,
    FrontRight,
}

impl StripPosition {
    pub fn index(self) -> usize {
        match self {
            StripPosition::FrontLeft => 0,
            StripPosition::BackLeft => 1,
            StripPosition::BackRight => 2,
            StripPosition::FrontRight => 3,
        }
    }
}

/// Which front LED(s) a command addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedSide {
    Left,
    Right,
    Both,
}

/// Light command variants.
///
/// Serialized as JSON with tag `"lc"`.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(tag = "lc", rename_all = "snake_case")]
pub enum LightCommand {
    /// Switch front LED(s) on or off.
    Led { side: LedSide, on: bool },
    ClearLeds,
    /// Paint the whole strip.
    Rgb { r: u8, g: u8, b: u8 },
    /// Paint a single strip pixel.
    Pixel {
        p: StripPosition,
        r: u8,
        g: u8,
        b: u8,
    },
    ClearRgb,
}

/// Front LEDs plus RGB strip.
pub struct LightingController<I2C, Driver> {
    board: MotorBoard<I2C>,
    driver: Driver,
    pixels: [RGB8; STRIP_LEN],
}

impl<I2C, E, Driver, SE> LightingController<I2C, Driver>
where
    I2C: I2c<Error = E>,
    E: core::fmt::Debug,
    Driver: SmartLedsWrite<Color = RGB8, Error = SE>,
    SE: core::fmt::Debug,
{
    /// The strip is assumed dark until the first write.
    pub fn new(
        board: MotorBoard<I2C>,
        driver: Driver,
    ) -> Self {
        Self {
            board,
            driver,
            pixels: [OFF; STRIP_LEN],
        }
    }

    /// Colors last written to the strip.
    pub fn pixels(&self) -> &[RGB8; STRIP_LEN] {
        &self.pixels
    }

    pub fn set_left_led(
        &mut self,
        on: bool,
    ) -> Result<(), DeviceError<E, SE>> {
        self.write_led(register::LED_LEFT, on)
    }

    pub fn set_right_led(
        &mut self,
        on: bool,
    ) -> Result<(), DeviceError<E, SE>> {
        self.write_led(register::LED_RIGHT, on)
    }

    /// Left register first, then right.
    pub fn set_both_leds(
        &mut self,
        on: bool,
    ) -> Result<(), DeviceError<E, SE>> {
        self.set_left_led(on)?;
        self.set_right_led(on)
    }

    pub fn set_led(
        &mut self,
        side: LedSide,
        on: bool,
    ) -> Result<(), DeviceError<E, SE>> {
        match side {
            LedSide::Left => self.set_left_led(on),
            LedSide::Right => self.set_right_led(on),
            LedSide::Both => self.set_both_leds(on),
        }
    }

    pub fn clear_leds(&mut self) -> Result<(), DeviceError<E, SE>> {
        self.set_both_leds(false)
    }

    /// Paint all four pixels.
    pub fn set_all(
        &mut self,
        color: RGB8,
    ) -> Result<(), DeviceError<E, SE>> {
        self.pixels = [color; STRIP_LEN];
        self.show()
    }

    pub fn set_pixel(
        &mut self,
        position: StripPosition,
        color: RGB8,
    ) -> Result<(), DeviceError<E, SE>> {
        self.pixels[position.index()] = color;
        self.show()
    }

    pub fn set_front_left(
        &mut self,
        color: RGB8,
    ) -> Result<(), DeviceError<E, SE>> {
        self.set_pixel(StripPosition::FrontLeft, color)
    }

    pub fn set_back_left(
        &mut self,
        color: RGB8,
    ) -> Result<(), DeviceError<E, SE>> {
        self.set_pixel(StripPosition::BackLeft, color)
    }

    pub fn set_back_right(
        &mut self,
        color: RGB8,
    ) -> Result<(), DeviceError<E, SE>> {
        self.set_pixel(StripPosition::BackRight, color)
    }

    pub fn set_front_right(
        &mut self,
        color: RGB8,
    ) -> Result<(), DeviceError<E, SE>> {
        self.set_pixel(StripPosition::FrontRight, color)
    }

    pub fn clear_all(&mut self) -> Result<(), DeviceError<E, SE>> {
        self.set_all(OFF)
    }

    /// Execute an incoming `LightCommand`.
    pub fn execute(
        &mut self,
        cmd: LightCommand,
    ) -> Result<(), DeviceError<E, SE>> {
        match cmd {
            LightCommand::Led { side, on } => self.set_led(side, on),
            LightCommand::ClearLeds => self.clear_leds(),
            LightCommand::Rgb { r, g, b } => self.set_all(RGB8 { r, g, b }),
            LightCommand::Pixel { p, r, g, b } => self.set_pixel(p, RGB8 { r, g, b }),
            LightCommand::ClearRgb => self.clear_all(),
        }
    }

    fn write_led(
        &mut self,
        register: u8,
        on: bool,
    ) -> Result<(), DeviceError<E, SE>> {
        self.board
            .send_actuator_byte(register, u8::from(on))
            .map_err(DeviceError::widen)
    }

    /// Push the whole shadow buffer to the strip.
    fn show(&mut self) -> Result<(), DeviceError<E, SE>> {
        self.driver.write(self.pixels).map_err(|e| {
            tracing::error!("RGB strip refresh failed: {:?}", e);
            DeviceError::StripUnavailable(e)
        })
    }
}
