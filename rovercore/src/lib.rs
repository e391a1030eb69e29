#![cfg_attr(not(test), no_std)]

pub mod command;
pub mod config;
pub mod error;
pub mod geometry;
pub mod hal;
pub mod objects;
pub mod pose;
pub mod rover;
pub mod safety;
pub mod scan;

/// Number of entries the object table holds on the reference unit.
pub const TABLE_CAPACITY: usize = 30;

pub use error::Error;
pub use rover::Rover;
