//! Sensor calibration domain service
//!
//! A sensor calibration is expensive and needs exclusive access to the
//! sensor, but stays usable as long as the die temperature stays close to
//! the temperature it was captured at. This module decides when a cached
//! calibration may be reused and when it must be redone.

use core::fmt;

use heapless::Vec;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Size in bytes of a calibration result blob
pub const CALIBRATION_RESULT_SIZE: usize = 192;

/// Default maximum temperature drift (degrees) a calibration stays valid for
///
/// A calibration done at 25 degrees is valid from 10 to 40 degrees.
pub const DEFAULT_MAX_TEMPERATURE_DRIFT: u16 = 15;

/// Temperature span (degrees) the cache is dimensioned for, -40 to 85
const OPERATING_TEMPERATURE_SPAN: usize = 125;

/// Number of cache slots needed to cover the operating span when the
/// temperature is not controlled during caching
pub const DEFAULT_CACHE_SLOTS: usize =
    OPERATING_TEMPERATURE_SPAN / (DEFAULT_MAX_TEMPERATURE_DRIFT as usize + 1) + 1;

/// Errors from calibration handling
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CalibrationError {
    /// Blob does not have the device's calibration size
    InvalidSize {
        /// Required size
        expected: usize,
        /// Size supplied
        actual: usize,
    },
    /// Every cache slot is taken
    CacheFull,
    /// Cache could not be encoded or decoded
    Serialization,
}

impl fmt::Display for CalibrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CalibrationError::InvalidSize { expected, actual } => {
                write!(f, "calibration blob is {actual} bytes, expected {expected}")
            }
            CalibrationError::CacheFull => f.write_str("calibration cache is full"),
            CalibrationError::Serialization => f.write_str("calibration cache encoding failed"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for CalibrationError {}

/// Opaque calibration blob produced by the sensor
///
/// Immutable once captured; a recalibration produces a new value.
#[derive(Clone, PartialEq, Eq)]
pub struct CalibrationResult([u8; CALIBRATION_RESULT_SIZE]);

impl CalibrationResult {
    /// Wrap a blob read from the sensor
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CalibrationError> {
        let data: [u8; CALIBRATION_RESULT_SIZE] =
            bytes.try_into().map_err(|_| CalibrationError::InvalidSize {
                expected: CALIBRATION_RESULT_SIZE,
                actual: bytes.len(),
            })?;
        Ok(Self(data))
    }

    /// Raw blob
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; CALIBRATION_RESULT_SIZE]> for CalibrationResult {
    fn from(data: [u8; CALIBRATION_RESULT_SIZE]) -> Self {
        Self(data)
    }
}

impl fmt::Debug for CalibrationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CalibrationResult({} bytes)", CALIBRATION_RESULT_SIZE)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for CalibrationResult {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "CalibrationResult({=usize} bytes)", CALIBRATION_RESULT_SIZE)
    }
}

impl Serialize for CalibrationResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(&self.0)
    }
}

impl<'de> Deserialize<'de> for CalibrationResult {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct BlobVisitor;

        impl<'de> Visitor<'de> for BlobVisitor {
            type Value = CalibrationResult;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "{} bytes of calibration data", CALIBRATION_RESULT_SIZE)
            }

            fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<Self::Value, E> {
                CalibrationResult::from_bytes(v).map_err(|_| E::invalid_length(v.len(), &self))
            }
        }

        deserializer.deserialize_bytes(BlobVisitor)
    }
}

/// Conditions a calibration was captured under
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalibrationInfo {
    /// Die temperature at capture time, degrees Celsius
    pub temperature: i16,
}

impl CalibrationInfo {
    /// Whether a calibration captured under `self` is usable at `temperature`
    #[inline]
    pub fn covers(&self, temperature: i16, max_drift: u16) -> bool {
        self.drift(temperature) <= u32::from(max_drift)
    }

    #[inline]
    fn drift(&self, temperature: i16) -> u32 {
        (i32::from(temperature) - i32::from(self.temperature)).unsigned_abs()
    }
}

/// A calibration blob paired with its capture conditions
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalibrationEntry {
    /// Calibration blob
    pub result: CalibrationResult,
    /// Capture conditions
    pub info: CalibrationInfo,
}

/// Holds the calibration currently in use
///
/// The pair is replaced as a whole; a result is never visible without the
/// info it was captured with.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalibrationStore {
    current: Option<CalibrationEntry>,
}

impl CalibrationStore {
    /// Create an empty store
    pub const fn new() -> Self {
        Self { current: None }
    }

    /// Store a new calibration, replacing any previous one
    pub fn capture(&mut self, result: CalibrationResult, temperature: i16) {
        self.current = Some(CalibrationEntry {
            result,
            info: CalibrationInfo { temperature },
        });
    }

    /// Store a blob read straight from the sensor
    pub fn capture_bytes(&mut self, blob: &[u8], temperature: i16) -> Result<(), CalibrationError> {
        self.capture(CalibrationResult::from_bytes(blob)?, temperature);
        Ok(())
    }

    /// True iff a calibration is present and within `max_drift` of `temperature`
    pub fn is_valid(&self, temperature: i16, max_drift: u16) -> bool {
        self.current
            .as_ref()
            .is_some_and(|entry| entry.info.covers(temperature, max_drift))
    }

    /// Drop the stored calibration
    pub fn invalidate(&mut self) {
        self.current = None;
    }

    /// Current calibration blob
    pub fn result(&self) -> Option<&CalibrationResult> {
        self.current.as_ref().map(|entry| &entry.result)
    }

    /// Capture conditions of the current calibration
    pub fn info(&self) -> Option<CalibrationInfo> {
        self.current.as_ref().map(|entry| entry.info)
    }

    /// Current calibration as a pair
    pub fn entry(&self) -> Option<&CalibrationEntry> {
        self.current.as_ref()
    }

    /// Activate the cached calibration best suited for `temperature`
    ///
    /// Returns `false` and leaves the store untouched when no cache entry
    /// covers the temperature.
    pub fn load_from<const N: usize>(
        &mut self,
        cache: &CalibrationCache<N>,
        temperature: i16,
        max_drift: u16,
    ) -> bool {
        match cache.find(temperature, max_drift) {
            Some(entry) => {
                debug!("calibration: using cached result from {} C", entry.info.temperature);
                self.current = Some(entry.clone());
                true
            }
            None => false,
        }
    }
}

/// Calibrations captured at different temperatures
///
/// Lets a device that moves across the operating range switch between
/// earlier calibrations instead of recalibrating. The cache serializes
/// with postcard so it can be written to flash and survive a power cycle.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CalibrationCache<const N: usize = DEFAULT_CACHE_SLOTS> {
    entries: Vec<CalibrationEntry, N>,
}

impl<const N: usize> CalibrationCache<N> {
    /// Create an empty cache
    pub const fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Number of cached calibrations
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing is cached
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Cached calibrations in insertion order
    pub fn entries(&self) -> &[CalibrationEntry] {
        &self.entries
    }

    /// Entry covering `temperature` whose capture temperature is closest
    ///
    /// When several entries have overlapping ranges the one centered
    /// nearest `temperature` wins; ties go to the earlier entry.
    pub fn find(&self, temperature: i16, max_drift: u16) -> Option<&CalibrationEntry> {
        self.entries
            .iter()
            .filter(|entry| entry.info.covers(temperature, max_drift))
            .fold(None, |best: Option<&CalibrationEntry>, entry| match best {
                Some(b) if b.info.drift(temperature) <= entry.info.drift(temperature) => Some(b),
                _ => Some(entry),
            })
    }

    /// Add a calibration, returning its slot index
    pub fn insert(&mut self, entry: CalibrationEntry) -> Result<usize, CalibrationError> {
        self.entries
            .push(entry)
            .map_err(|_| CalibrationError::CacheFull)?;
        Ok(self.entries.len() - 1)
    }

    /// Add the calibration currently held by `store`
    pub fn insert_from(
        &mut self,
        store: &CalibrationStore,
    ) -> Result<Option<usize>, CalibrationError> {
        match store.entry() {
            Some(entry) => self.insert(entry.clone()).map(Some),
            None => Ok(None),
        }
    }

    /// Forget every cached calibration
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Encode the cache into `buf`, returning the used prefix
    pub fn serialize_into<'b>(&self, buf: &'b mut [u8]) -> Result<&'b mut [u8], CalibrationError> {
        postcard::to_slice(self, buf).map_err(|_| CalibrationError::Serialization)
    }

    /// Decode a cache previously written by [`serialize_into`](Self::serialize_into)
    pub fn deserialize(bytes: &[u8]) -> Result<Self, CalibrationError> {
        postcard::from_bytes(bytes).map_err(|_| CalibrationError::Serialization)
    }
}
