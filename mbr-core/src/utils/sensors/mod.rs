//! Sensor decoding for the mbRobot.
//!
//! - `ultrasonic`: ping/echo range finder at the front
//! - `reflectance`: 5-channel line sensor read through the motor board

pub mod reflectance;
pub mod ultrasonic;

pub use reflectance::{IrChannel, ReflectanceArray, ReflectanceSample};
pub use ultrasonic::{DistanceReading, DistanceSensor, PulseTimer};
