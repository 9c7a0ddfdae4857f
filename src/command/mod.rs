//! Outbound command construction: mode table and MAVLink frame builders.

pub mod encoder;
pub mod modes;
