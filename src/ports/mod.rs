//! Ports (interfaces) defining the boundaries of the SDK
//!
//! - **RadarHal**: how the domain reaches the sensor (SPI + GPIO, mock)

pub mod radar_hal;

pub use radar_hal::{HalError, IntegrationStatus, PinLevel, RadarHal, Register};
