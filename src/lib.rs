//! Radar sensor SDK core
//!
//! Frame processing, calibration caching and the assembly self-test for a
//! pulsed coherent radar sensor, laid out as a hexagonal architecture so the
//! same logic runs on a microcontroller and in host tests.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     Domain Layer                                │
//! │  - AcquisitionConfig / AcquisitionMetadata                      │
//! │  - FrameProcessor: raw buffer -> ProcessedResult                │
//! │  - CalibrationStore / CalibrationCache                          │
//! │  - AssemblyTest: bring-up state machines                        │
//! └─────────────────────────────────────────────────────────────────┘
//!                               │
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     Ports (Traits)                              │
//! │  - RadarHal: enable pin, interrupt wait, register access        │
//! └─────────────────────────────────────────────────────────────────┘
//!                               │
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     Adapters                                    │
//! │  - EmbeddedHalIntegration: SPI + GPIO + delay (embedded-hal 1.0)│
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! let mut processor = FrameProcessor::new(AcquisitionConfig::default())?;
//! let mut calibration = CalibrationStore::new();
//!
//! let tag = processor.next_trigger();
//! // ... start a measurement carrying `tag`, read it into `raw` ...
//! let result = processor.execute(&raw, &mut calibration)?;
//! if result.calibration_needed {
//!     // recalibrate before the next frame
//! }
//! ```

#![cfg_attr(not(any(test, feature = "std")), no_std)]

extern crate alloc;

// Must come first so the log macros are visible in every module
mod fmt;

/// Domain layer - pure logic, no hardware access
pub mod domain;

/// Ports - traits defining boundaries
pub mod ports;

/// Adapters - concrete implementations
pub mod adapters;

#[cfg(test)]
mod testing;

pub use domain::{
    AcquisitionConfig, AcquisitionMetadata, AssemblyTest, AssemblyTestError, AssemblyTestId,
    AssemblyTestResult, CalibrationCache, CalibrationError, CalibrationInfo, CalibrationResult,
    CalibrationStore, ComplexSample, ConfigError, Frame, FrameProcessor, IdleState, Prf,
    ProcessedResult, ProcessingError, ProcessorOptions, Profile, SaturationPolicy, SubsweepConfig,
    TestState,
};

pub use ports::{HalError, IntegrationStatus, PinLevel, RadarHal, Register};

pub use adapters::EmbeddedHalIntegration;
