//! Tunable robot parameters.
//!
//! Defaults match the stock chassis; a host application may deserialize a
//! partial JSON object over them, missing keys keep their default.

use embassy_time::Duration;
use serde::Deserialize;

use crate::utils::{
    controllers::{alarm::AlarmTiming, i2c::MOTOR_BOARD_ADDRESS},
    math::kinematics::{AxleGeometry, DifferentialKinematics, SLIP_COEFFICIENT},
};

/// Speed restored by a speed reset, in board units.
pub const DEFAULT_SPEED: i16 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct RobotConfig {
    /// I2C address of the motor board.
    pub motor_address: u8,
    /// Half the distance between the wheels (m).
    pub half_axle_m: f32,
    /// Divisor of the quadratic slip term in arc kinematics.
    pub slip_coefficient: f32,
    pub default_speed: i16,
    /// Blink cycles of a sounded alarm.
    pub alarm_cycles: u8,
    pub alarm_on_ms: u32,
    pub alarm_off_ms: u32,
    /// Length of a single buzzer beep.
    pub beep_ms: u32,
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self {
            motor_address: MOTOR_BOARD_ADDRESS,
            half_axle_m: AxleGeometry::DEFAULT.half_axle_m(),
            slip_coefficient: SLIP_COEFFICIENT,
            default_speed: DEFAULT_SPEED,
            alarm_cycles: 10,
            alarm_on_ms: 100,
            alarm_off_ms: 100,
            beep_ms: 100,
        }
    }
}

impl RobotConfig {
    /// Kinematics for the configured axle. A non-positive axle falls back to
    /// the stock geometry.
    pub fn kinematics(&self) -> DifferentialKinematics {
        let axle = AxleGeometry::new(self.half_axle_m).unwrap_or_else(|| {
            tracing::warn!(
                "half_axle_m {} is not positive, using {}",
                self.half_axle_m,
                AxleGeometry::DEFAULT.half_axle_m()
            );
            AxleGeometry::DEFAULT
        });
        DifferentialKinematics::new(axle, self.slip_coefficient)
    }

    pub fn alarm_timing(&self) -> AlarmTiming {
        AlarmTiming {
            cycles: self.alarm_cycles,
            on: Duration::from_millis(u64::from(self.alarm_on_ms)),
            off: Duration::from_millis(u64::from(self.alarm_off_ms)),
        }
    }
}
