//! Error types shared by the bus-facing controllers.
//!
//! Every operation that touches the motor board returns a [`DeviceError`]. The
//! controllers log the failure before handing it back; nothing is retried and
//! nothing halts. Sensor timeouts are not errors and never show up here.

use core::{convert::Infallible, fmt};

/// Input values that cannot be clamped into something safe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParameterError {
    /// Arc radius was zero, negative or not a finite number (meters).
    ArcRadius(f32),
    /// Level bar maximum was zero, negative or not a finite number.
    LevelMaximum(f32),
}

/// Errors that can occur when driving the motor board, the RGB strip or when
/// validating a motion request.
///
/// `E` is the bus error of the I2C transport, `S` the error of the strip
/// driver. Components that never touch the strip leave `S` as `Infallible`.
#[derive(Debug)]
pub enum DeviceError<E, S = Infallible> {
    /// The motor board did not acknowledge (absent or unpowered).
    BusUnavailable(E),
    /// The addressable strip driver rejected a refresh.
    StripUnavailable(S),
    InvalidParameter(ParameterError),
}

impl<E> DeviceError<E, Infallible> {
    /// Lift a strip-less error into one carrying a strip error type.
    pub fn widen<S>(self) -> DeviceError<E, S> {
        match self {
            DeviceError::BusUnavailable(e) => DeviceError::BusUnavailable(e),
            DeviceError::InvalidParameter(p) => DeviceError::InvalidParameter(p),
            DeviceError::StripUnavailable(never) => match never {},
        }
    }
}

impl<E, S> From<ParameterError> for DeviceError<E, S> {
    fn from(value: ParameterError) -> Self {
        DeviceError::InvalidParameter(value)
    }
}

impl fmt::Display for ParameterError {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            ParameterError::ArcRadius(r) => write!(f, "arc radius must be positive, got {r} m"),
            ParameterError::LevelMaximum(m) => {
                write!(f, "level maximum must be positive, got {m}")
            }
        }
    }
}

impl<E: fmt::Debug, S: fmt::Debug> fmt::Display for DeviceError<E, S> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            DeviceError::BusUnavailable(e) => write!(f, "motor board unavailable: {e:?}"),
            DeviceError::StripUnavailable(e) => write!(f, "RGB strip unavailable: {e:?}"),
            DeviceError::InvalidParameter(p) => write!(f, "invalid parameter: {p}"),
        }
    }
}
