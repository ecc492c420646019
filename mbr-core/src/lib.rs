//! Core drivers and utilities for the mbRobot differential-drive chassis on
//! no-std embedded platforms.
//!
//! For a host-side run against a simulated motor board, see `mbr-app/mock-mcu`.
#![no_std]

pub mod utils;
