//! Kinematics utilities for the two-wheeled differential-drive chassis.
//!
//! `DifferentialKinematics` maps a signed commanded speed plus a motion intent
//! (straight, spin in place, arc of a given radius) onto a pair of per-wheel
//! direction/magnitude values. Nothing here touches the bus.
//!
//! # Example
//! ```rust
//! use mbr_core::utils::math::kinematics::{DifferentialKinematics, Turn};
//! let kin = DifferentialKinematics::default();
//! let cmd = kin.arc(50, 0.2, Turn::Left).unwrap();
//! assert_eq!((cmd.left.speed, cmd.right.speed), (20, 50));
//! ```
use libm;
use serde::{Deserialize, Serialize};

use crate::utils::error::ParameterError;

/// Half of the wheel-to-wheel distance of the stock chassis (m).
pub const HALF_AXLE_M: f32 = 0.082;
/// Divisor of the empirical `v²` slip term applied to the inner wheel.
pub const SLIP_COEFFICIENT: f32 = 200_000.0;
/// Largest magnitude the motor board accepts.
pub const MAX_WHEEL_SPEED: u8 = 255;

/// Wheel rotation direction as encoded on the wire (0 = forward, 1 = backward).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Direction {
    Forward = 0,
    Backward = 1,
}

impl Direction {
    /// Direction implied by a signed speed; zero counts as forward.
    pub fn from_signed(speed: i32) -> Self {
        if speed < 0 {
            Direction::Backward
        } else {
            Direction::Forward
        }
    }

    pub fn wire(self) -> u8 {
        self as u8
    }
}

/// Direction and magnitude for a single wheel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WheelDrive {
    pub direction: Direction,
    pub speed: u8,
}

impl WheelDrive {
    pub const STOPPED: WheelDrive = WheelDrive::forward(0);

    pub const fn forward(speed: u8) -> Self {
        Self {
            direction: Direction::Forward,
            speed,
        }
    }

    pub const fn backward(speed: u8) -> Self {
        Self {
            direction: Direction::Backward,
            speed,
        }
    }

    /// Split a signed speed into direction and clamped magnitude.
    pub fn from_signed(speed: i32) -> Self {
        Self {
            direction: Direction::from_signed(speed),
            speed: magnitude(speed),
        }
    }
}

/// Left/right wheel pair produced fresh for every motion call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WheelCommand {
    pub left: WheelDrive,
    pub right: WheelDrive,
}

impl WheelCommand {
    pub const STOP: WheelCommand = WheelCommand {
        left: WheelDrive::STOPPED,
        right: WheelDrive::STOPPED,
    };

    pub const fn new(
        left: WheelDrive,
        right: WheelDrive,
    ) -> Self {
        Self { left, right }
    }
}

/// Side the robot turns towards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Turn {
    Left,
    Right,
}

/// Axle geometry used by the arc kinematics. Always strictly positive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxleGeometry {
    half_axle_m: f32,
}

impl AxleGeometry {
    pub const DEFAULT: AxleGeometry = AxleGeometry {
        half_axle_m: HALF_AXLE_M,
    };

    /// Returns `None` unless `half_axle_m` is finite and positive.
    pub fn new(half_axle_m: f32) -> Option<Self> {
        (half_axle_m.is_finite() && half_axle_m > 0.0).then_some(Self { half_axle_m })
    }

    pub fn half_axle_m(&self) -> f32 {
        self.half_axle_m
    }
}

impl Default for AxleGeometry {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Clamp a signed speed to the board's magnitude range.
pub fn magnitude(speed: i32) -> u8 {
    speed.unsigned_abs().min(MAX_WHEEL_SPEED as u32) as u8
}

/// Open-loop differential-drive kinematics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DifferentialKinematics {
    axle: AxleGeometry,
    slip_coefficient: f32,
}

impl Default for DifferentialKinematics {
    fn default() -> Self {
        Self::new(AxleGeometry::DEFAULT, SLIP_COEFFICIENT)
    }
}

impl DifferentialKinematics {
    pub fn new(
        axle: AxleGeometry,
        slip_coefficient: f32,
    ) -> Self {
        Self {
            axle,
            slip_coefficient,
        }
    }

    pub fn axle(&self) -> AxleGeometry {
        self.axle
    }

    /// Both wheels in `direction` at the magnitude of `speed`.
    pub fn straight(
        speed: i16,
        direction: Direction,
    ) -> WheelCommand {
        let drive = WheelDrive {
            direction,
            speed: magnitude(speed.into()),
        };
        WheelCommand::new(drive, drive)
    }

    /// Spin in place. Turning left runs the right wheel forward and the left
    /// wheel backward; turning right is the mirror.
    pub fn rotate(
        speed: i16,
        turn: Turn,
    ) -> WheelCommand {
        let v = magnitude(speed.into());
        match turn {
            Turn::Left => WheelCommand::new(WheelDrive::backward(v), WheelDrive::forward(v)),
            Turn::Right => WheelCommand::new(WheelDrive::forward(v), WheelDrive::backward(v)),
        }
    }

    /// Magnitude of the inner wheel when the outer wheel runs at `speed`.
    ///
    /// Radii tighter than the half axle give 0. Otherwise the geometric ratio
    /// `(r - a) / (r + a)` is scaled down by `1 - v² / slip_coefficient` and the
    /// product with `v` is floored.
    pub fn inner_wheel_speed(
        &self,
        speed: u8,
        radius: f32,
    ) -> Result<u8, ParameterError> {
        if !radius.is_finite() || radius <= 0.0 {
            return Err(ParameterError::ArcRadius(radius));
        }
        let a = self.axle.half_axle_m;
        if radius < a {
            return Ok(0);
        }
        let v = speed as f32;
        let ratio = (radius - a) / (radius + a) * (1.0 - v * v / self.slip_coefficient);
        let inner = libm::floorf(ratio * v);
        if inner.is_nan() {
            return Ok(0);
        }
        Ok(inner.clamp(0.0, v) as u8)
    }

    /// Drive an arc of `radius` meters towards `turn`.
    ///
    /// The outer wheel keeps the full commanded magnitude. Both wheels follow
    /// the sign of `speed`, and the inner wheel is always on the turn side, so
    /// reversing on a left arc still slows the left wheel.
    pub fn arc(
        &self,
        speed: i16,
        radius: f32,
        turn: Turn,
    ) -> Result<WheelCommand, ParameterError> {
        let v = magnitude(speed.into());
        let v1 = self.inner_wheel_speed(v, radius)?;
        let direction = Direction::from_signed(speed.into());
        let outer = WheelDrive { direction, speed: v };
        let inner = WheelDrive {
            direction,
            speed: v1,
        };
        Ok(match turn {
            Turn::Left => WheelCommand::new(inner, outer),
            Turn::Right => WheelCommand::new(outer, inner),
        })
    }
}
