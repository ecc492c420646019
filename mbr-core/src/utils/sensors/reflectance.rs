//! 5-channel reflectance (line) sensor.
//!
//! The motor board exposes the sensors as one active-low status byte. A read
//! selects the status register, reads the byte back and inverts it, so a set
//! bit means the channel sees the line.

use embedded_hal::i2c::I2c;
use serde::{Deserialize, Serialize};

use crate::utils::{
    controllers::i2c::{register, MotorBoard},
    error::DeviceError,
};

/// Sensor positions, right to left across the chassis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IrChannel {
    OuterRight,
    InnerRight,
    Middle,
    InnerLeft,
    OuterLeft,
}

impl IrChannel {
    pub const ALL: [IrChannel; 5] = [
        IrChannel::OuterRight,
        IrChannel::InnerRight,
        IrChannel::Middle,
        IrChannel::InnerLeft,
        IrChannel::OuterLeft,
    ];

    /// Bit of this channel in the inverted status byte.
    pub fn mask(self) -> u8 {
        match self {
            IrChannel::OuterRight => 0x01,
            IrChannel::InnerRight => 0x02,
            IrChannel::Middle => 0x04,
            IrChannel::InnerLeft => 0x08,
            IrChannel::OuterLeft => 0x10,
        }
    }
}

/// One decoded status byte. Never cached between reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReflectanceSample {
    bits: u8,
}

impl ReflectanceSample {
    const ALL_CHANNELS: u8 = 0x1F;

    /// Decode the raw (active-low) status byte.
    pub fn from_raw(raw: u8) -> Self {
        Self {
            bits: !raw & Self::ALL_CHANNELS,
        }
    }

    pub fn is_active(
        &self,
        channel: IrChannel,
    ) -> bool {
        self.bits & channel.mask() != 0
    }

    pub fn outer_right(&self) -> bool {
        self.is_active(IrChannel::OuterRight)
    }

    pub fn inner_right(&self) -> bool {
        self.is_active(IrChannel::InnerRight)
    }

    pub fn middle(&self) -> bool {
        self.is_active(IrChannel::Middle)
    }

    pub fn inner_left(&self) -> bool {
        self.is_active(IrChannel::InnerLeft)
    }

    pub fn outer_left(&self) -> bool {
        self.is_active(IrChannel::OuterLeft)
    }

    /// Channels in [`IrChannel::ALL`] order.
    pub fn channels(&self) -> [bool; 5] {
        IrChannel::ALL.map(|c| self.is_active(c))
    }
}

/// Line sensor behind the motor board.
pub struct ReflectanceArray<I2C> {
    board: MotorBoard<I2C>,
}

impl<I2C, E> ReflectanceArray<I2C>
where
    I2C: I2c<Error = E>,
    E: core::fmt::Debug,
{
    pub fn new(board: MotorBoard<I2C>) -> Self {
        Self { board }
    }

    /// Fresh bus exchange: select the status register and decode the reply.
    pub fn read(&mut self) -> Result<ReflectanceSample, DeviceError<E>> {
        let raw = self.board.read_register(register::LINE_STATUS)?;
        let sample = ReflectanceSample::from_raw(raw);
        tracing::trace!(raw, ?sample, "line sensor");
        Ok(sample)
    }

    /// Read a single channel; still a full bus exchange.
    pub fn read_channel(
        &mut self,
        channel: IrChannel,
    ) -> Result<bool, DeviceError<E>> {
        Ok(self.read()?.is_active(channel))
    }
}
