//! Adapters - concrete implementations of ports
//!
//! # Available Adapters
//!
//! - **embedded_hal**: sensor over any embedded-hal 1.0 SPI device and GPIO pins

pub mod embedded_hal;

pub use self::embedded_hal::EmbeddedHalIntegration;
