//! Open-loop motion control for the mbRobot.
//!
//! `MotionController` owns the commanded speed (`RobotState`) and turns each
//! motion intent into a wheel pair that is written to the motor board
//! immediately. Every command is fire-and-forget: the wheels keep turning until
//! the next motion call.

use embedded_hal::i2c::I2c;
use serde::{Deserialize, Serialize};

use super::i2c::{MotorBoard, Wheel};
use crate::utils::{
    config::{RobotConfig, DEFAULT_SPEED},
    error::DeviceError,
    math::kinematics::{Direction, DifferentialKinematics, Turn, WheelCommand, WheelDrive},
};

/// Largest speed magnitude that can be commanded.
pub const MAX_SPEED: i16 = 255;

/// Motion command variants.
///
/// Serialized as JSON with tag `"mc"`.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
#[serde(tag = "mc", rename_all = "snake_case")]
pub enum MotionCommand {
    /// Set the commanded speed, clamped to ±255.
    SetSpeed { s: i32 },
    ResetSpeed,
    Stop,
    Forward,
    Backward,
    /// Spin counter-clockwise in place.
    Left,
    /// Spin clockwise in place.
    Right,
    /// Arc to the left with radius `r` in meters.
    ArcLeft { r: f32 },
    ArcRight { r: f32 },
    /// Drive a single wheel at signed speed `s`.
    Wheel { w: Wheel, s: i32 },
}

/// Commanded speed shared by all motion operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RobotState {
    speed: i16,
    default_speed: i16,
}

impl Default for RobotState {
    fn default() -> Self {
        Self::new(DEFAULT_SPEED)
    }
}

impl RobotState {
    pub fn new(default_speed: i16) -> Self {
        let default_speed = default_speed.clamp(-MAX_SPEED, MAX_SPEED);
        Self {
            speed: default_speed,
            default_speed,
        }
    }

    pub fn speed(&self) -> i16 {
        self.speed
    }

    /// Store `speed`, silently clamped to `[-255, 255]`.
    pub fn set_speed(
        &mut self,
        speed: i32,
    ) -> i16 {
        self.speed = speed.clamp(-(MAX_SPEED as i32), MAX_SPEED as i32) as i16;
        self.speed
    }

    pub fn reset(&mut self) {
        self.speed = self.default_speed;
    }
}

/// Differential-drive motion on top of the motor board.
pub struct MotionController<I2C> {
    board: MotorBoard<I2C>,
    state: RobotState,
    kinematics: DifferentialKinematics,
}

impl<I2C, E> MotionController<I2C>
where
    I2C: I2c<Error = E>,
    E: core::fmt::Debug,
{
    pub fn new(
        board: MotorBoard<I2C>,
        config: &RobotConfig,
    ) -> Self {
        Self {
            board,
            state: RobotState::new(config.default_speed),
            kinematics: config.kinematics(),
        }
    }

    pub fn speed(&self) -> i16 {
        self.state.speed()
    }

    pub fn state(&self) -> &RobotState {
        &self.state
    }

    pub fn set_speed(
        &mut self,
        speed: i32,
    ) {
        let stored = self.state.set_speed(speed);
        if i32::from(stored) != speed {
            tracing::debug!(requested = speed, stored, "speed clamped");
        }
    }

    pub fn reset_speed(&mut self) {
        self.state.reset();
    }

    /// Stop both wheels, whatever the stored speed.
    pub fn stop(&mut self) -> Result<(), DeviceError<E>> {
        self.board.send_motion_frame(WheelCommand::STOP)
    }

    pub fn forward(&mut self) -> Result<(), DeviceError<E>> {
        self.drive(DifferentialKinematics::straight(
            self.state.speed(),
            Direction::Forward,
        ))
    }

    pub fn backward(&mut self) -> Result<(), DeviceError<E>> {
        self.drive(DifferentialKinematics::straight(
            self.state.speed(),
            Direction::Backward,
        ))
    }

    /// Right wheel forward, left wheel backward.
    pub fn rotate_left(&mut self) -> Result<(), DeviceError<E>> {
        self.drive(DifferentialKinematics::rotate(self.state.speed(), Turn::Left))
    }

    /// Left wheel forward, right wheel backward.
    pub fn rotate_right(&mut self) -> Result<(), DeviceError<E>> {
        self.drive(DifferentialKinematics::rotate(
            self.state.speed(),
            Turn::Right,
        ))
    }

    /// Drive a left arc of `radius` meters; the right wheel is the outer one.
    ///
    /// A radius that is not strictly positive is rejected before anything is
    /// written to the bus.
    pub fn arc_left(
        &mut self,
        radius: f32,
    ) -> Result<(), DeviceError<E>> {
        self.arc(radius, Turn::Left)
    }

    /// Drive a right arc of `radius` meters; the left wheel is the outer one.
    pub fn arc_right(
        &mut self,
        radius: f32,
    ) -> Result<(), DeviceError<E>> {
        self.arc(radius, Turn::Right)
    }

    /// Drive one wheel alone. Does not touch the stored speed.
    pub fn rotate_wheel(
        &mut self,
        wheel: Wheel,
        speed: i32,
    ) -> Result<(), DeviceError<E>> {
        self.board
            .send_wheel_frame(wheel, WheelDrive::from_signed(speed))
    }

    /// Execute a high-level `MotionCommand`.
    pub fn execute(
        &mut self,
        command: MotionCommand,
    ) -> Result<(), DeviceError<E>> {
        match command {
            MotionCommand::SetSpeed { s } => {
                self.set_speed(s);
                Ok(())
            }
            MotionCommand::ResetSpeed => {
                self.reset_speed();
                Ok(())
            }
            MotionCommand::Stop => self.stop(),
            MotionCommand::Forward => self.forward(),
            MotionCommand::Backward => self.backward(),
            MotionCommand::Left => self.rotate_left(),
            MotionCommand::Right => self.rotate_right(),
            MotionCommand::ArcLeft { r } => self.arc_left(r),
            MotionCommand::ArcRight { r } => self.arc_right(r),
            MotionCommand::Wheel { w, s } => self.rotate_wheel(w, s),
        }
    }

    pub fn release(self) -> MotorBoard<I2C> {
        self.board
    }

    fn arc(
        &mut self,
        radius: f32,
        turn: Turn,
    ) -> Result<(), DeviceError<E>> {
        match self.kinematics.arc(self.state.speed(), radius, turn) {
            Ok(cmd) => self.drive(cmd),
            Err(e) => {
                tracing::warn!("rejected arc: {}", e);
                Err(DeviceError::InvalidParameter(e))
            }
        }
    }

    fn drive(
        &mut self,
        cmd: WheelCommand,
    ) -> Result<(), DeviceError<E>> {
        self.board.send_motion_frame(cmd)
    }
}
