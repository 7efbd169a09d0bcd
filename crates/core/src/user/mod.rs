//! Account authentication boundary

pub mod ports;
