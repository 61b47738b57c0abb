//! Acquisition configuration
//!
//! Describes what the sensor measures each frame: the distance windows
//! (subsweeps), the pulse profile and repetition frequency, and which power
//! state the sensor rests in between acquisitions.

use core::fmt;

use heapless::Vec;
use serde::{Deserialize, Serialize};

/// Distance between two adjacent points, meters
pub const BASE_POINT_LENGTH_M: f32 = 0.0025;

/// Maximum number of subsweeps in one sweep
pub const MAX_SUBSWEEPS: usize = 4;

/// Maximum number of samples in one frame
pub const MAX_FRAME_DATA_LENGTH: usize = 4095;

/// Pulse profile, trading distance resolution for SNR
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Profile {
    /// Shortest pulse, best resolution
    P1,
    /// Short pulse
    P2,
    /// Medium pulse
    P3,
    /// Long pulse
    P4,
    /// Longest pulse, best SNR
    P5,
}

impl Profile {
    /// Step length (in points) used when the configuration leaves it unset
    ///
    /// Longer pulses cover more distance per sample without losing
    /// information, so the default step grows with the profile.
    pub const fn default_step_length(self) -> u16 {
        match self {
            Profile::P1 => 1,
            Profile::P2 => 2,
            Profile::P3 => 3,
            Profile::P4 => 6,
            Profile::P5 => 12,
        }
    }
}

/// Pulse repetition frequency class
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Prf {
    /// 19.5 MHz
    Prf19_5MHz,
    /// 15.6 MHz
    Prf15_6MHz,
    /// 13.0 MHz
    Prf13_0MHz,
    /// 8.7 MHz
    Prf8_7MHz,
    /// 6.5 MHz
    Prf6_5MHz,
    /// 5.2 MHz
    Prf5_2MHz,
}

impl Prf {
    /// Repetition frequency in Hz
    pub const fn frequency_hz(self) -> f32 {
        match self {
            Prf::Prf19_5MHz => 19.5e6,
            Prf::Prf15_6MHz => 15.6e6,
            Prf::Prf13_0MHz => 13.0e6,
            Prf::Prf8_7MHz => 8.7e6,
            Prf::Prf6_5MHz => 6.5e6,
            Prf::Prf5_2MHz => 5.2e6,
        }
    }

    /// Maximum measurable distance in meters
    ///
    /// Echoes from further away fold into the next pulse period.
    pub const fn max_measurable_distance_m(self) -> f32 {
        match self {
            Prf::Prf19_5MHz => 3.1,
            Prf::Prf15_6MHz => 5.1,
            Prf::Prf13_0MHz => 7.0,
            Prf::Prf8_7MHz => 12.7,
            Prf::Prf6_5MHz => 18.5,
            Prf::Prf5_2MHz => 24.5,
        }
    }
}

/// Power state the sensor rests in between acquisitions
///
/// Ordered from deepest to lightest: deeper states draw less power but take
/// longer to wake.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IdleState {
    /// Lowest power, slowest wake
    DeepSleep,
    /// Intermediate
    Sleep,
    /// Fastest wake, highest power
    Ready,
}

/// One distance window of a sweep
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SubsweepConfig {
    /// First point, in units of [`BASE_POINT_LENGTH_M`]
    pub start_point: i32,
    /// Number of samples
    pub num_points: u16,
    /// Receiver gain index
    pub receiver_gain: u8,
}

impl SubsweepConfig {
    /// Create a subsweep starting at `start_point` with `num_points` samples
    pub const fn new(start_point: i32, num_points: u16) -> Self {
        Self {
            start_point,
            num_points,
            receiver_gain: 16,
        }
    }

    /// Set the receiver gain
    pub const fn with_receiver_gain(mut self, gain: u8) -> Self {
        self.receiver_gain = gain;
        self
    }

    /// Last point covered, given a step length
    fn end_point(&self, step_length: u16) -> i64 {
        i64::from(self.start_point)
            + (i64::from(self.num_points) - 1) * i64::from(step_length)
    }
}

/// Reasons a configuration is rejected
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// No subsweeps, or more than [`MAX_SUBSWEEPS`]
    SubsweepCount,
    /// A subsweep has zero points
    ZeroLength,
    /// `sweeps_per_frame` is zero
    ZeroSweeps,
    /// `hwaas` is zero
    ZeroHwaas,
    /// Step length is neither a divisor nor a multiple of 24
    StepLength,
    /// Two subsweeps cover overlapping distance windows
    OverlappingSubsweeps,
    /// A subsweep reaches beyond the PRF's maximum measurable distance,
    /// on either side of the sensor
    BeyondMeasurableDistance,
    /// Profile 1 cannot run at 5.2 MHz
    ProfilePrfMismatch,
    /// Inter-frame idle state is lighter than the inter-sweep idle state
    IdleStateOrder,
    /// Frame holds more than [`MAX_FRAME_DATA_LENGTH`] samples
    FrameTooLarge,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            ConfigError::SubsweepCount => "subsweep count out of range",
            ConfigError::ZeroLength => "subsweep has no points",
            ConfigError::ZeroSweeps => "sweeps per frame is zero",
            ConfigError::ZeroHwaas => "hwaas is zero",
            ConfigError::StepLength => "step length must divide or be a multiple of 24",
            ConfigError::OverlappingSubsweeps => "subsweep ranges overlap",
            ConfigError::BeyondMeasurableDistance => "range exceeds maximum measurable distance",
            ConfigError::ProfilePrfMismatch => "profile not supported at this PRF",
            ConfigError::IdleStateOrder => "inter-frame idle state lighter than inter-sweep",
            ConfigError::FrameTooLarge => "frame exceeds maximum data length",
        };
        f.write_str(msg)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ConfigError {}

/// Acquisition configuration
///
/// Built once, validated by [`FrameProcessor::new`](crate::domain::FrameProcessor::new).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AcquisitionConfig {
    /// Pulse profile
    pub profile: Profile,
    /// Pulse repetition frequency
    pub prf: Prf,
    /// Distance between samples in points; `None` uses the profile default
    pub step_length: Option<u16>,
    /// Hardware accelerated average samples per point
    pub hwaas: u16,
    /// Sweeps per frame
    pub sweeps_per_frame: u16,
    /// Power state between frames
    pub inter_frame_idle_state: IdleState,
    /// Power state between sweeps within a frame
    pub inter_sweep_idle_state: IdleState,
    /// Distance windows, measured in this order
    pub subsweeps: Vec<SubsweepConfig, MAX_SUBSWEEPS>,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        let mut subsweeps = Vec::new();
        let _ = subsweeps.push(SubsweepConfig::new(80, 160));
        Self {
            profile: Profile::P3,
            prf: Prf::Prf15_6MHz,
            step_length: None,
            hwaas: 8,
            sweeps_per_frame: 1,
            inter_frame_idle_state: IdleState::DeepSleep,
            inter_sweep_idle_state: IdleState::Ready,
            subsweeps,
        }
    }
}

impl AcquisitionConfig {
    /// Single subsweep configuration
    pub fn single(profile: Profile, start_point: i32, num_points: u16) -> Self {
        let mut subsweeps = Vec::new();
        let _ = subsweeps.push(SubsweepConfig::new(start_point, num_points));
        Self {
            profile,
            subsweeps,
            ..Self::default()
        }
    }

    /// Short range, fine resolution: profile 1 at the highest PRF
    pub fn close_range() -> Self {
        Self {
            prf: Prf::Prf19_5MHz,
            step_length: Some(1),
            hwaas: 16,
            ..Self::single(Profile::P1, 40, 200)
        }
    }

    /// Sparse, slow updates resting in deep sleep between frames
    pub fn low_power() -> Self {
        Self {
            hwaas: 4,
            inter_frame_idle_state: IdleState::DeepSleep,
            inter_sweep_idle_state: IdleState::Sleep,
            ..Self::single(Profile::P5, 200, 40)
        }
    }

    /// Set the number of sweeps per frame
    pub fn with_sweeps_per_frame(mut self, sweeps: u16) -> Self {
        self.sweeps_per_frame = sweeps;
        self
    }

    /// Set the step length
    pub fn with_step_length(mut self, step_length: u16) -> Self {
        self.step_length = Some(step_length);
        self
    }

    /// Set the pulse repetition frequency
    pub fn with_prf(mut self, prf: Prf) -> Self {
        self.prf = prf;
        self
    }

    /// Set both idle states
    pub fn with_idle_states(mut self, inter_frame: IdleState, inter_sweep: IdleState) -> Self {
        self.inter_frame_idle_state = inter_frame;
        self.inter_sweep_idle_state = inter_sweep;
        self
    }

    /// Append a subsweep
    pub fn with_subsweep(mut self, subsweep: SubsweepConfig) -> Result<Self, ConfigError> {
        self.subsweeps
            .push(subsweep)
            .map_err(|_| ConfigError::SubsweepCount)?;
        Ok(self)
    }

    /// Step length in effect
    pub fn effective_step_length(&self) -> u16 {
        self.step_length
            .unwrap_or_else(|| self.profile.default_step_length())
    }

    /// Samples in one sweep, summed over subsweeps
    pub fn sweep_data_length(&self) -> usize {
        self.subsweeps.iter().map(|s| usize::from(s.num_points)).sum()
    }

    /// Check every constraint the sensor places on a configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.subsweeps.is_empty() || self.subsweeps.len() > MAX_SUBSWEEPS {
            return Err(ConfigError::SubsweepCount);
        }
        if self.subsweeps.iter().any(|s| s.num_points == 0) {
            return Err(ConfigError::ZeroLength);
        }
        if self.sweeps_per_frame == 0 {
            return Err(ConfigError::ZeroSweeps);
        }
        if self.hwaas == 0 {
            return Err(ConfigError::ZeroHwaas);
        }

        let step = self.effective_step_length();
        if step == 0 || !(24 % step == 0 || step % 24 == 0) {
            return Err(ConfigError::StepLength);
        }

        if self.profile == Profile::P1 && self.prf == Prf::Prf5_2MHz {
            return Err(ConfigError::ProfilePrfMismatch);
        }
        if self.inter_frame_idle_state > self.inter_sweep_idle_state {
            return Err(ConfigError::IdleStateOrder);
        }

        self.check_ranges(step)?;

        let frame_len = self.sweep_data_length() * usize::from(self.sweeps_per_frame);
        if frame_len > MAX_FRAME_DATA_LENGTH {
            return Err(ConfigError::FrameTooLarge);
        }

        Ok(())
    }

    fn check_ranges(&self, step: u16) -> Result<(), ConfigError> {
        let max_point = self.prf.max_measurable_distance_m() / BASE_POINT_LENGTH_M;

        for (i, a) in self.subsweeps.iter().enumerate() {
            let start = i64::from(a.start_point);
            if (start as f32) < -max_point || a.end_point(step) as f32 > max_point {
                return Err(ConfigError::BeyondMeasurableDistance);
            }
            for b in self.subsweeps.iter().skip(i + 1) {
                let disjoint = a.end_point(step) < i64::from(b.start_point)
                    || b.end_point(step) < start;
                if !disjoint {
                    return Err(ConfigError::OverlappingSubsweeps);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert_eq!(AcquisitionConfig::default().validate(), Ok(()));
        assert_eq!(AcquisitionConfig::close_range().validate(), Ok(()));
        assert_eq!(AcquisitionConfig::low_power().validate(), Ok(()));
    }

    #[test]
    fn test_profile_default_step_length() {
        let config = AcquisitionConfig::single(Profile::P4, 0, 10);
        assert_eq!(config.effective_step_length(), 6);
        assert_eq!(config.with_step_length(24).effective_step_length(), 24);
    }

    #[test]
    fn test_rejects_zero_length() {
        let config = AcquisitionConfig::single(Profile::P1, 0, 0);
        assert_eq!(config.validate(), Err(ConfigError::ZeroLength));
    }

    #[test]
    fn test_rejects_no_subsweeps() {
        let mut config = AcquisitionConfig::default();
        config.subsweeps.clear();
        assert_eq!(config.validate(), Err(ConfigError::SubsweepCount));
    }

    #[test]
    fn test_rejects_fifth_subsweep() {
        let mut config = AcquisitionConfig::single(Profile::P1, 0, 10);
        for i in 1..MAX_SUBSWEEPS as i32 {
            config = config.with_subsweep(SubsweepConfig::new(i * 100, 10)).unwrap();
        }
        let err = config.with_subsweep(SubsweepConfig::new(900, 10)).unwrap_err();
        assert_eq!(err, ConfigError::SubsweepCount);
    }

    #[test]
    fn test_rejects_bad_step_length() {
        let config = AcquisitionConfig::default().with_step_length(5);
        assert_eq!(config.validate(), Err(ConfigError::StepLength));
        let config = AcquisitionConfig::single(Profile::P1, 0, 10).with_step_length(48);
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_rejects_overlapping_subsweeps() {
        let config = AcquisitionConfig::single(Profile::P1, 100, 50)
            .with_subsweep(SubsweepConfig::new(140, 20))
            .unwrap();
        assert_eq!(config.validate(), Err(ConfigError::OverlappingSubsweeps));

        let config = AcquisitionConfig::single(Profile::P1, 100, 50)
            .with_subsweep(SubsweepConfig::new(150, 20))
            .unwrap();
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_rejects_beyond_measurable_distance() {
        // 3.1 m at 19.5 MHz is 1240 points
        let config = AcquisitionConfig::single(Profile::P1, 1200, 50).with_prf(Prf::Prf19_5MHz);
        assert_eq!(config.validate(), Err(ConfigError::BeyondMeasurableDistance));

        let config = config.with_prf(Prf::Prf8_7MHz);
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_rejects_overflowing_range() {
        let config = AcquisitionConfig::single(Profile::P1, i32::MAX - 5, 100);
        assert_eq!(config.validate(), Err(ConfigError::BeyondMeasurableDistance));

        let config =
            AcquisitionConfig::single(Profile::P1, 0, 40_000).with_step_length(65_520);
        assert_eq!(config.validate(), Err(ConfigError::BeyondMeasurableDistance));

        let config = AcquisitionConfig::single(Profile::P1, i32::MIN, 10);
        assert_eq!(config.validate(), Err(ConfigError::BeyondMeasurableDistance));
    }

    #[test]
    fn test_start_point_lower_bound() {
        // 5.1 m at 15.6 MHz is about 2040 points on either side
        let config = AcquisitionConfig::single(Profile::P1, -2000, 10);
        assert_eq!(config.validate(), Ok(()));
        let config = AcquisitionConfig::single(Profile::P1, -2100, 10);
        assert_eq!(config.validate(), Err(ConfigError::BeyondMeasurableDistance));
    }

    #[test]
    fn test_rejects_profile1_at_lowest_prf() {
        let config = AcquisitionConfig::single(Profile::P1, 0, 10).with_prf(Prf::Prf5_2MHz);
        assert_eq!(config.validate(), Err(ConfigError::ProfilePrfMismatch));
    }

    #[test]
    fn test_idle_state_order() {
        let config =
            AcquisitionConfig::default().with_idle_states(IdleState::Ready, IdleState::Sleep);
        assert_eq!(config.validate(), Err(ConfigError::IdleStateOrder));

        let config =
            AcquisitionConfig::default().with_idle_states(IdleState::Sleep, IdleState::Sleep);
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_rejects_oversized_frame() {
        let config = AcquisitionConfig::single(Profile::P1, 0, 1000).with_sweeps_per_frame(5);
        assert_eq!(config.validate(), Err(ConfigError::FrameTooLarge));
    }
}
