//! Frame domain entities
//!
//! A frame is `sweeps_per_frame` sweeps laid out back to back; each sweep
//! holds its subsweeps back to back. Sample `p` of subsweep `s` in sweep
//! `n` lives at `n * sweep_data_length + subsweep_data_offset[s] + p`.

use heapless::Vec;

use crate::domain::config::{AcquisitionConfig, Profile, MAX_SUBSWEEPS};

/// Fixed time spent per subsweep on top of the sampling itself, seconds
const SUBSWEEP_OVERHEAD_S: f32 = 10e-6;

/// One I/Q sample as delivered by the sensor
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ComplexSample {
    /// In-phase component
    pub real: i16,
    /// Quadrature component
    pub imag: i16,
}

impl ComplexSample {
    /// Create a sample
    pub const fn new(real: i16, imag: i16) -> Self {
        Self { real, imag }
    }

    /// Magnitude `sqrt(real^2 + imag^2)`
    #[inline]
    pub fn amplitude(&self) -> f32 {
        let re = f32::from(self.real);
        let im = f32::from(self.imag);
        libm::sqrtf(re * re + im * im)
    }

    /// Phase in radians
    #[inline]
    pub fn phase(&self) -> f32 {
        libm::atan2f(f32::from(self.imag), f32::from(self.real))
    }

    /// Largest absolute component, as raw ADC counts
    #[inline]
    pub fn peak_component(&self) -> u16 {
        self.real.unsigned_abs().max(self.imag.unsigned_abs())
    }
}

/// Shape of one raw frame for a given configuration
///
/// Derived once when the processor is created; never changes afterwards.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AcquisitionMetadata {
    /// Samples in the whole frame
    pub frame_data_length: u16,
    /// Samples in one sweep
    pub sweep_data_length: u16,
    /// Sweeps in one frame
    pub sweeps_per_frame: u16,
    /// Start of each subsweep within a sweep
    pub subsweep_data_offset: Vec<u16, MAX_SUBSWEEPS>,
    /// Length of each subsweep
    pub subsweep_data_length: Vec<u16, MAX_SUBSWEEPS>,
    /// Highest sweep rate the configuration allows, Hz
    pub max_sweep_rate: f32,
    /// Whether the sensor can use its high speed acquisition mode
    pub high_speed_mode: bool,
}

impl AcquisitionMetadata {
    /// Derive the frame layout from a validated configuration
    pub(crate) fn from_config(config: &AcquisitionConfig) -> Self {
        let mut subsweep_data_offset = Vec::new();
        let mut subsweep_data_length = Vec::new();
        let mut offset = 0u16;
        let mut sweep_time_s = 0.0f32;
        let prf_hz = config.prf.frequency_hz();

        for subsweep in &config.subsweeps {
            // Capacities match the config's subsweep vector
            let _ = subsweep_data_offset.push(offset);
            let _ = subsweep_data_length.push(subsweep.num_points);
            offset += subsweep.num_points;
            sweep_time_s += f32::from(subsweep.num_points) * f32::from(config.hwaas) / prf_hz
                + SUBSWEEP_OVERHEAD_S;
        }

        Self {
            frame_data_length: offset * config.sweeps_per_frame,
            sweep_data_length: offset,
            sweeps_per_frame: config.sweeps_per_frame,
            subsweep_data_offset,
            subsweep_data_length,
            max_sweep_rate: 1.0 / sweep_time_s,
            high_speed_mode: config.subsweeps.len() == 1 && config.profile != Profile::P1,
        }
    }

    /// Number of subsweeps per sweep
    pub fn num_subsweeps(&self) -> usize {
        self.subsweep_data_length.len()
    }
}

/// Decoded frame, borrowed from the processor's buffer
#[derive(Clone, Copy, Debug)]
pub struct Frame<'a> {
    data: &'a [ComplexSample],
    metadata: &'a AcquisitionMetadata,
}

impl<'a> Frame<'a> {
    pub(crate) fn new(data: &'a [ComplexSample], metadata: &'a AcquisitionMetadata) -> Self {
        Self { data, metadata }
    }

    /// All samples, sweep after sweep
    pub fn data(&self) -> &'a [ComplexSample] {
        self.data
    }

    /// Frame layout
    pub fn metadata(&self) -> &'a AcquisitionMetadata {
        self.metadata
    }

    /// Number of sweeps in the frame
    pub fn num_sweeps(&self) -> usize {
        usize::from(self.metadata.sweeps_per_frame)
    }

    /// Samples of sweep `sweep`
    pub fn sweep(&self, sweep: usize) -> Option<&'a [ComplexSample]> {
        let len = usize::from(self.metadata.sweep_data_length);
        if sweep >= self.num_sweeps() {
            return None;
        }
        self.data.get(sweep * len..(sweep + 1) * len)
    }

    /// Samples of one subsweep within one sweep
    pub fn subsweep(&self, sweep: usize, subsweep: usize) -> Option<&'a [ComplexSample]> {
        let offset = usize::from(*self.metadata.subsweep_data_offset.get(subsweep)?);
        let len = usize::from(*self.metadata.subsweep_data_length.get(subsweep)?);
        self.sweep(sweep)?.get(offset..offset + len)
    }

    /// The same point across every sweep (slow-time vector)
    pub fn point_vector(&self, point: usize) -> impl Iterator<Item = ComplexSample> + 'a {
        let stride = usize::from(self.metadata.sweep_data_length);
        let data = self.data;
        let count = if point < stride { self.num_sweeps() } else { 0 };
        (0..count).map(move |n| data[n * stride + point])
    }
}

/// Amplitude of each sample
pub fn amplitudes(samples: &[ComplexSample]) -> impl Iterator<Item = f32> + '_ {
    samples.iter().map(ComplexSample::amplitude)
}

/// Amplitude of the complex mean; `None` for an empty slice
pub fn coherent_mean_amplitude(samples: &[ComplexSample]) -> Option<f32> {
    if samples.is_empty() {
        return None;
    }
    let (re, im) = samples.iter().fold((0.0f32, 0.0f32), |(re, im), s| {
        (re + f32::from(s.real), im + f32::from(s.imag))
    });
    let n = samples.len() as f32;
    Some(libm::sqrtf((re / n) * (re / n) + (im / n) * (im / n)))
}

/// Mean of the sample amplitudes; `None` for an empty slice
pub fn noncoherent_mean_amplitude(samples: &[ComplexSample]) -> Option<f32> {
    if samples.is_empty() {
        return None;
    }
    Some(amplitudes(samples).sum::<f32>() / samples.len() as f32)
}

/// Index of the largest value; the first one wins on ties
pub fn argmax(values: impl IntoIterator<Item = f32>) -> Option<usize> {
    values
        .into_iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f32)>, (i, v)| match best {
            Some((_, b)) if b >= v => best,
            _ => Some((i, v)),
        })
        .map(|(i, _)| i)
}

/// Sub-sample offset of a peak from three neighbouring amplitudes
///
/// Fits a parabola through `y1, y2, y3` (with `y2` the local maximum) and
/// returns the vertex position relative to `y2`, in samples.
pub fn interpolate_peak_position(y1: f32, y2: f32, y3: f32) -> f32 {
    (y1 - y3) / (2.0 * y1 - 4.0 * y2 + 2.0 * y3)
}

/// Output of one processing call
///
/// Borrows the processor's buffer and is invalidated by the next call.
#[derive(Clone, Copy, Debug)]
pub struct ProcessedResult<'a> {
    /// Decoded frame
    pub frame: Frame<'a>,
    /// Die temperature reported with the frame, degrees Celsius
    pub temperature: i16,
    /// Raw samples reached the ADC range; the frame is unreliable
    pub data_saturated: bool,
    /// The sensor must be recalibrated before the next acquisition
    pub calibration_needed: bool,
    /// The frame belongs to an earlier trigger than the last one issued
    pub frame_delayed: bool,
}
