#![cfg_attr(not(test), no_std)]

pub mod echo;
pub mod infrared;
pub mod ping;
pub mod servo;
