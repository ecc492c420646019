//! Utility re-exports and helper macros for the mbRobot.
//!
//! - `controllers`: motor board frames, motion, lights, alarm and the command loop
//! - `sensors`: ultrasonic range finder and reflectance array
//! - `math`: differential-drive kinematics
//! - `config`: tunable robot parameters
//! - `error`: bus and parameter errors
//!
//! The `mk_static!` macro simplifies static initialization in no-std contexts.

pub mod config;
pub mod controllers;
pub mod error;
pub mod math;
pub mod sensors;

pub use config::RobotConfig;
pub use controllers::{SystemCommand, SystemController, COMMAND_CHANNEL};
pub use embassy_time::*;
pub use error::{DeviceError, ParameterError};

#[doc(hidden)]
pub use static_cell as __static_cell;

#[macro_export]
/// Initialize a no-std static cell and write the given value into it.
///
/// This macro creates a `static_cell::StaticCell` for type `$t` and initializes
/// it with `$val`, returning a mutable reference to the stored value.
macro_rules! mk_static {
    ($t:ty, $val:expr) => {{
        static STATIC_CELL: $crate::utils::__static_cell::StaticCell<$t> =
            $crate::utils::__static_cell::StaticCell::new();
        STATIC_CELL.uninit().write($val)
    }};
}
