//! I2C frame encoding for the mbRobot motor board.
//!
//! The motor board sits at a fixed address on the shared I2C bus and owns the
//! two wheel motors, the two discrete front LEDs and the line sensor status
//! register. Every command is one atomic bus write with a fixed layout:
//!
//! - motor pair: `[0x00, left_dir, left_speed, right_dir, right_speed]`
//! - single motor: `[2 * wheel, dir, speed]`
//! - actuator register: `[register, value]`

use embedded_hal::i2c::I2c;
use serde::{Deserialize, Serialize};

use crate::utils::{
    error::DeviceError,
    math::kinematics::{WheelCommand, WheelDrive},
};

/// Default I2C address of the motor board.
pub const MOTOR_BOARD_ADDRESS: u8 = 0x10;

/// Register map of the motor board.
pub mod register {
    /// First byte of the motor pair frame.
    pub const MOTORS: u8 = 0x00;
    pub const LED_LEFT: u8 = 0x0B;
    pub const LED_RIGHT: u8 = 0x0C;
    /// Active-low line sensor status byte.
    pub const LINE_STATUS: u8 = 0x1D;
}

/// One of the two driven wheels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Wheel {
    Left,
    Right,
}

impl Wheel {
    /// Register of the single-motor frame (motor id times two).
    pub fn register(self) -> u8 {
        match self {
            Wheel::Left => 0x00,
            Wheel::Right => 0x02,
        }
    }
}

/// Serialize a wheel pair into the 5-byte motor frame.
pub fn encode_motion_frame(cmd: &WheelCommand) -> [u8; 5] {
    [
        register::MOTORS,
        cmd.left.direction.wire(),
        cmd.left.speed,
        cmd.right.direction.wire(),
        cmd.right.speed,
    ]
}

/// Serialize a single-motor command into its 3-byte frame.
pub fn encode_wheel_frame(
    wheel: Wheel,
    drive: WheelDrive,
) -> [u8; 3] {
    [wheel.register(), drive.direction.wire(), drive.speed]
}

/// Frame encoder in front of the motor board.
///
/// Owns its I2C handle; share one physical bus between several boards with
/// `embedded_hal_bus::i2c::RefCellDevice`. Failed writes are logged and
/// returned as [`DeviceError::BusUnavailable`], never retried.
pub struct MotorBoard<I2C> {
    i2c: I2C,
    address: u8,
}

impl<I2C, E> MotorBoard<I2C>
where
    I2C: I2c<Error = E>,
    E: core::fmt::Debug,
{
    /// Create an encoder for the board at the default address.
    pub fn new(i2c: I2C) -> Self {
        Self::with_address(i2c, MOTOR_BOARD_ADDRESS)
    }

    pub fn with_address(
        i2c: I2C,
        address: u8,
    ) -> Self {
        Self { i2c, address }
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    /// Send both wheel directions and speeds in one write.
    pub fn send_motion_frame(
        &mut self,
        cmd: WheelCommand,
    ) -> Result<(), DeviceError<E>> {
        let frame = encode_motion_frame(&cmd);
        tracing::debug!(?frame, "motion frame");
        self.write(&frame)
    }

    /// Drive one motor without touching the other.
    pub fn send_wheel_frame(
        &mut self,
        wheel: Wheel,
        drive: WheelDrive,
    ) -> Result<(), DeviceError<E>> {
        let frame = encode_wheel_frame(wheel, drive);
        tracing::debug!(?wheel, ?frame, "wheel frame");
        self.write(&frame)
    }

    /// Write one value into an actuator register (LEDs).
    pub fn send_actuator_byte(
        &mut self,
        register: u8,
        value: u8,
    ) -> Result<(), DeviceError<E>> {
        self.write(&[register, value])
    }

    /// Select `register`, then read one byte back in a separate transaction.
    pub fn read_register(
        &mut self,
        register: u8,
    ) -> Result<u8, DeviceError<E>> {
        self.write(&[register])?;
        let mut buf = [0u8; 1];
        self.i2c.read(self.address, &mut buf).map_err(|e| {
            tracing::error!("I2C read from 0x{:02X} failed: {:?}", self.address, e);
            DeviceError::BusUnavailable(e)
        })?;
        Ok(buf[0])
    }

    /// Check whether the board acknowledges its address.
    pub fn probe(&mut self) -> bool {
        let present = self.i2c.write(self.address, &[]).is_ok();
        if !present {
            tracing::warn!("no motor board at 0x{:02X}, is the robot switched on?", self.address);
        }
        present
    }

    /// Hand back the underlying I2C handle.
    pub fn release(self) -> I2C {
        self.i2c
    }

    fn write(
        &mut self,
        bytes: &[u8],
    ) -> Result<(), DeviceError<E>> {
        self.i2c.write(self.address, bytes).map_err(|e| {
            tracing::error!("I2C write to 0x{:02X} failed: {:?}", self.address, e);
            DeviceError::BusUnavailable(e)
        })
    }
}
