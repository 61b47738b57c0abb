//! Frame processing domain service
//!
//! Turns one raw sweep buffer into one [`ProcessedResult`], flagging
//! saturation, delayed frames and the need for a new calibration.
//!
//! # Raw buffer layout
//!
//! Little-endian, a 12 byte header followed by `frame_data_length` I/Q pairs:
//!
//! ```text
//! offset  size  field
//!  0      2     frame_data_length (samples)
//!  2      2     sweeps_per_frame
//!  4      2     temperature (i16, degrees Celsius)
//!  6      2     reserved
//!  8      4     trigger tag (u32)
//! 12      4*n   samples: i16 real, i16 imag
//! ```

use alloc::vec::Vec;
use core::fmt;

use crate::domain::calibration::{CalibrationStore, DEFAULT_MAX_TEMPERATURE_DRIFT};
use crate::domain::config::{AcquisitionConfig, ConfigError, BASE_POINT_LENGTH_M};
use crate::domain::frame::{AcquisitionMetadata, ComplexSample, Frame, ProcessedResult};

/// Size of the raw buffer header in bytes
pub const RAW_HEADER_SIZE: usize = 12;

/// Size of one raw I/Q sample in bytes
pub const RAW_SAMPLE_SIZE: usize = 4;

/// Largest magnitude an ADC sample component can report
pub const ADC_FULL_SCALE: u16 = 32_768;

/// Why a raw buffer was rejected
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MalformedReason {
    /// Header declares a different frame length than the configuration
    FrameLength {
        /// Samples the configuration expects
        expected: u16,
        /// Samples the header declares
        declared: u16,
    },
    /// Header declares a different sweep count than the configuration
    SweepCount {
        /// Sweeps the configuration expects
        expected: u16,
        /// Sweeps the header declares
        declared: u16,
    },
    /// Trigger tag is newer than the last trigger issued
    FutureTrigger,
}

/// Errors from frame processing
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ProcessingError {
    /// Configuration rejected at construction
    InvalidConfiguration(ConfigError),
    /// Raw buffer shorter than [`FrameProcessor::required_buffer_size`]
    BufferTooSmall {
        /// Minimum size in bytes
        required: usize,
        /// Size supplied
        actual: usize,
    },
    /// Raw buffer shape does not match the configuration
    MalformedBuffer(MalformedReason),
}

impl fmt::Display for ProcessingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessingError::InvalidConfiguration(e) => write!(f, "invalid configuration: {e}"),
            ProcessingError::BufferTooSmall { required, actual } => {
                write!(f, "buffer is {actual} bytes, at least {required} required")
            }
            ProcessingError::MalformedBuffer(reason) => write!(f, "malformed buffer: {reason:?}"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ProcessingError {}

impl From<ConfigError> for ProcessingError {
    fn from(e: ConfigError) -> Self {
        ProcessingError::InvalidConfiguration(e)
    }
}

/// How saturation feeds into calibration trust
///
/// A sample counts as saturated when either component's magnitude is at or
/// above `threshold`. After `consecutive_frames` saturated frames in a row,
/// and if `invalidates_calibration` is set, the stored calibration is
/// dropped and `calibration_needed` is raised.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SaturationPolicy {
    /// Magnitude (ADC counts) at which a component is considered clipped
    pub threshold: u16,
    /// Saturated frames in a row before calibration is distrusted
    pub consecutive_frames: u8,
    /// Whether saturation invalidates the calibration at all
    pub invalidates_calibration: bool,
}

impl Default for SaturationPolicy {
    fn default() -> Self {
        Self {
            threshold: 32_000,
            consecutive_frames: 1,
            invalidates_calibration: true,
        }
    }
}

impl SaturationPolicy {
    /// Only clipped samples count, and saturation never touches calibration
    pub const fn report_only() -> Self {
        Self {
            threshold: ADC_FULL_SCALE - 1,
            consecutive_frames: 1,
            invalidates_calibration: false,
        }
    }
}

/// Processor tuning that is not part of the sensor configuration
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ProcessorOptions {
    /// Saturation handling
    pub saturation: SaturationPolicy,
    /// Temperature drift (degrees) a calibration stays valid for
    pub max_temperature_drift: u16,
}

impl Default for ProcessorOptions {
    fn default() -> Self {
        Self {
            saturation: SaturationPolicy::default(),
            max_temperature_drift: DEFAULT_MAX_TEMPERATURE_DRIFT,
        }
    }
}

/// Decoded raw buffer header
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct RawHeader {
    frame_data_length: u16,
    sweeps_per_frame: u16,
    temperature: i16,
    trigger_tag: u32,
}

impl RawHeader {
    fn parse(raw: &[u8]) -> Self {
        Self {
            frame_data_length: u16::from_le_bytes([raw[0], raw[1]]),
            sweeps_per_frame: u16::from_le_bytes([raw[2], raw[3]]),
            temperature: i16::from_le_bytes([raw[4], raw[5]]),
            trigger_tag: u32::from_le_bytes([raw[8], raw[9], raw[10], raw[11]]),
        }
    }
}

/// Processing engine bound to one acquisition configuration
///
/// Owns the decoded frame buffer; each [`execute`](Self::execute) overwrites
/// it. To change configuration, drop the processor and create a new one.
pub struct FrameProcessor {
    config: AcquisitionConfig,
    metadata: AcquisitionMetadata,
    options: ProcessorOptions,
    frame: Vec<ComplexSample>,
    issued_trigger: u32,
    saturated_streak: u8,
}

impl FrameProcessor {
    /// Create a processor with default options
    pub fn new(config: AcquisitionConfig) -> Result<Self, ProcessingError> {
        Self::with_options(config, ProcessorOptions::default())
    }

    /// Create a processor with custom saturation and drift handling
    pub fn with_options(
        config: AcquisitionConfig,
        options: ProcessorOptions,
    ) -> Result<Self, ProcessingError> {
        config.validate()?;
        let metadata = AcquisitionMetadata::from_config(&config);
        let frame = Vec::with_capacity(usize::from(metadata.frame_data_length));

        debug!(
            "processing: created, {} samples/frame, max sweep rate {} Hz",
            metadata.frame_data_length,
            metadata.max_sweep_rate
        );

        Ok(Self {
            config,
            metadata,
            options,
            frame,
            issued_trigger: 0,
            saturated_streak: 0,
        })
    }

    /// Frame layout derived from the configuration
    pub fn metadata(&self) -> &AcquisitionMetadata {
        &self.metadata
    }

    /// Configuration the processor was created with
    pub fn config(&self) -> &AcquisitionConfig {
        &self.config
    }

    /// Options in effect
    pub fn options(&self) -> &ProcessorOptions {
        &self.options
    }

    /// Minimum raw buffer size in bytes
    pub fn required_buffer_size(&self) -> usize {
        RAW_HEADER_SIZE + RAW_SAMPLE_SIZE * usize::from(self.metadata.frame_data_length)
    }

    /// Issue a new trigger and return the tag the next frame should carry
    pub fn next_trigger(&mut self) -> u32 {
        self.issued_trigger = self.issued_trigger.wrapping_add(1);
        self.issued_trigger
    }

    /// Tag of the last trigger issued
    pub fn issued_trigger(&self) -> u32 {
        self.issued_trigger
    }

    /// Decode one raw buffer
    ///
    /// Consults `calibration` for the frame's temperature and invalidates it
    /// when the saturation policy says the calibration can no longer be
    /// trusted. A failed call leaves the processor untouched.
    pub fn execute<'p>(
        &'p mut self,
        raw: &[u8],
        calibration: &mut CalibrationStore,
    ) -> Result<ProcessedResult<'p>, ProcessingError> {
        let required = self.required_buffer_size();
        if raw.len() < required {
            return Err(ProcessingError::BufferTooSmall {
                required,
                actual: raw.len(),
            });
        }

        let header = RawHeader::parse(raw);
        if header.frame_data_length != self.metadata.frame_data_length {
            return Err(ProcessingError::MalformedBuffer(MalformedReason::FrameLength {
                expected: self.metadata.frame_data_length,
                declared: header.frame_data_length,
            }));
        }
        if header.sweeps_per_frame != self.metadata.sweeps_per_frame {
            return Err(ProcessingError::MalformedBuffer(MalformedReason::SweepCount {
                expected: self.metadata.sweeps_per_frame,
                declared: header.sweeps_per_frame,
            }));
        }

        // Age of the frame in triggers; "negative" ages mean a tag from the future
        let age = self.issued_trigger.wrapping_sub(header.trigger_tag);
        if age > u32::MAX / 2 {
            return Err(ProcessingError::MalformedBuffer(MalformedReason::FutureTrigger));
        }
        let frame_delayed = age != 0;

        let threshold = self.options.saturation.threshold;
        let mut data_saturated = false;
        self.frame.clear();
        self.frame.extend(
            raw[RAW_HEADER_SIZE..required]
                .chunks_exact(RAW_SAMPLE_SIZE)
                .map(|b| {
                    let sample = ComplexSample::new(
                        i16::from_le_bytes([b[0], b[1]]),
                        i16::from_le_bytes([b[2], b[3]]),
                    );
                    data_saturated |= sample.peak_component() >= threshold;
                    sample
                }),
        );

        self.saturated_streak = if data_saturated {
            self.saturated_streak.saturating_add(1)
        } else {
            0
        };

        let policy = &self.options.saturation;
        let saturation_distrusts_calibration = data_saturated
            && policy.invalidates_calibration
            && self.saturated_streak >= policy.consecutive_frames;
        if saturation_distrusts_calibration {
            calibration.invalidate();
        }

        let calibration_needed = saturation_distrusts_calibration
            || !calibration.is_valid(header.temperature, self.options.max_temperature_drift);

        if data_saturated {
            warn!("processing: data saturated, lower the receiver gain");
        }
        if frame_delayed {
            warn!(
                "processing: frame delayed, tag {} issued {}",
                header.trigger_tag,
                self.issued_trigger
            );
        }
        if calibration_needed {
            debug!("processing: calibration needed at {} C", header.temperature);
        }

        Ok(ProcessedResult {
            frame: Frame::new(&self.frame, &self.metadata),
            temperature: header.temperature,
            data_saturated,
            calibration_needed,
            frame_delayed,
        })
    }

    /// Distance between two adjacent samples, meters
    pub fn step_size_m(&self) -> f32 {
        BASE_POINT_LENGTH_M * f32::from(self.config.effective_step_length())
    }

    /// Sample index nearest to `distance_m`
    pub fn meter_to_point(&self, distance_m: f32) -> i32 {
        libm::roundf(distance_m / self.step_size_m()) as i32
    }

    /// Distance of sample index `index`, meters
    pub fn point_to_meter(&self, index: i32) -> f32 {
        index as f32 * self.step_size_m()
    }

    /// Distance of sample `sample` within subsweep `subsweep`, meters
    pub fn sample_to_meter(&self, subsweep: usize, sample: u16) -> Option<f32> {
        let sub = self.config.subsweeps.get(subsweep)?;
        if sample >= sub.num_points {
            return None;
        }
        let point = i64::from(sub.start_point)
            + i64::from(sample) * i64::from(self.config.effective_step_length());
        Some(point as f32 * BASE_POINT_LENGTH_M)
    }
}
