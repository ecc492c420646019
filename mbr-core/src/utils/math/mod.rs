//! Math utilities for the mbRobot.
//!
//! This module provides open-loop kinematics for the two-wheeled differential-drive chassis.

pub mod kinematics;
