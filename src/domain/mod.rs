//! Domain layer - radar logic independent of the board
//!
//! Everything here is driven through plain values or the
//! [`RadarHal`](crate::ports::RadarHal) port, so it runs unchanged in host
//! tests.

pub mod calibration;
pub mod config;
pub mod frame;
pub mod processing;

pub use assembly_test::{
    AssemblyTest, AssemblyTestError, AssemblyTestId, AssemblyTestResult, TestState,
    ASSEMBLY_TEST_MIN_BUFFER_SIZE, DEFAULT_INTERRUPT_TIMEOUT_MS,
};
pub use calibration::{
    CalibrationCache, CalibrationEntry, CalibrationError, CalibrationInfo, CalibrationResult,
    CalibrationStore, CALIBRATION_RESULT_SIZE, DEFAULT_CACHE_SLOTS, DEFAULT_MAX_TEMPERATURE_DRIFT,
};
pub use config::{
    AcquisitionConfig, ConfigError, IdleState, Prf, Profile, SubsweepConfig, BASE_POINT_LENGTH_M,
    MAX_FRAME_DATA_LENGTH, MAX_SUBSWEEPS,
};
pub use frame::{
    AcquisitionMetadata, ComplexSample, Frame, ProcessedResult, amplitudes, argmax,
    coherent_mean_amplitude, interpolate_peak_position, noncoherent_mean_amplitude,
};
pub use processing::{
    FrameProcessor, MalformedReason, ProcessingError, ProcessorOptions, SaturationPolicy,
    RAW_HEADER_SIZE, RAW_SAMPLE_SIZE,
};
