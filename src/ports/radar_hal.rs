//! Radar HAL port - abstraction over the sensor's board integration
//!
//! This trait lets the domain drive the radar sensor (enable pin, interrupt
//! line, register access, temperature) without knowing whether it sits on
//! an STM32 board, an RP2350, or a scripted mock.

/// Error type for HAL operations
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HalError {
    /// SPI/I2C transfer failed
    Bus,
    /// Enable or interrupt GPIO could not be driven or sampled
    Pin,
    /// The sensor answered with data of the wrong shape
    InvalidResponse,
}

impl core::fmt::Display for HalError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            HalError::Bus => f.write_str("register transfer failed"),
            HalError::Pin => f.write_str("GPIO access failed"),
            HalError::InvalidResponse => f.write_str("invalid response from sensor"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for HalError {}

/// Outcome of one interrupt wait
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IntegrationStatus {
    /// Interrupt observed within the timeout
    Ok,
    /// Timeout elapsed, hardware presumed unresponsive
    Timeout,
}

/// Logic level for the sensor enable pin
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PinLevel {
    /// Sensor held in reset / powered down
    Low,
    /// Sensor enabled
    High,
}

/// Register addresses of the radar sensor
///
/// All registers are 16 bits wide and little-endian except
/// `CalibrationResult`, which is a block read of
/// [`CALIBRATION_RESULT_SIZE`](crate::domain::calibration::CALIBRATION_RESULT_SIZE) bytes.
#[repr(u16)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Register {
    /// Chip identification (0x0000)
    ChipId = 0x0000,
    /// Sensor status, reads `STATUS_RESET_VALUE` after a clean boot (0x0001)
    Status = 0x0001,
    /// Read/write scratch register used for bus checks (0x0010)
    Scratch = 0x0010,
    /// Writing any value asserts the interrupt line (0x0020)
    InterruptTrigger = 0x0020,
    /// Clock status, bit 0 set when the PLL is locked (0x0030)
    ClockStatus = 0x0030,
    /// Supply status, one bit per rail, all set when rails are good (0x0031)
    SupplyStatus = 0x0031,
    /// Die temperature, signed, degrees Celsius (0x0040)
    Temperature = 0x0040,
    /// Command register (0x0050)
    Command = 0x0050,
    /// Calibration result block (0x0100)
    CalibrationResult = 0x0100,
}

impl From<Register> for u16 {
    fn from(r: Register) -> Self {
        r as u16
    }
}

/// Expected content of [`Register::ChipId`]
pub const EXPECTED_CHIP_ID: u16 = 0x1210;

/// Content of [`Register::Status`] right after the enable pin goes high
pub const STATUS_RESET_VALUE: u16 = 0x0000;

/// [`Register::ClockStatus`] bit set when the PLL is locked
pub const CLOCK_PLL_LOCKED: u16 = 0x0001;

/// [`Register::SupplyStatus`] mask, all rails good
pub const SUPPLY_RAILS_GOOD: u16 = 0x0007;

/// [`Register::Command`] value starting a sensor calibration
pub const COMMAND_CALIBRATE: u16 = 0x0003;

/// Port for the radar sensor's board integration
///
/// Every call blocks until the hardware answers or fails. Interrupt waits
/// are the only suspension point and are bounded by `timeout_ms`.
///
/// # Example Implementation
///
/// ```ignore
/// impl<SPI: SpiDevice, EN: OutputPin, INT: InputPin, D: DelayNs> RadarHal
///     for EmbeddedHalIntegration<SPI, EN, INT, D>
/// {
///     fn set_enable_pin(&mut self, level: PinLevel) -> Result<(), HalError> {
///         self.enable.set_high().map_err(|_| HalError::Pin)?;
///         self.delay.delay_ms(2);
///         Ok(())
///     }
///     // ...
/// }
/// ```
pub trait RadarHal {
    /// Drive the sensor enable pin
    fn set_enable_pin(&mut self, level: PinLevel) -> Result<(), HalError>;

    /// Block until the sensor interrupt line is asserted or `timeout_ms` elapses
    fn wait_for_interrupt(&mut self, timeout_ms: u32) -> Result<IntegrationStatus, HalError>;

    /// Read `buf.len()` bytes starting at `register`
    fn read_register(&mut self, register: Register, buf: &mut [u8]) -> Result<(), HalError>;

    /// Write `data` starting at `register`
    fn write_register(&mut self, register: Register, data: &[u8]) -> Result<(), HalError>;

    /// Read a 16-bit register
    fn read_u16(&mut self, register: Register) -> Result<u16, HalError> {
        let mut buf = [0u8; 2];
        self.read_register(register, &mut buf)?;
        Ok(u16::from_le_bytes(buf))
    }

    /// Write a 16-bit register
    fn write_u16(&mut self, register: Register, value: u16) -> Result<(), HalError> {
        self.write_register(register, &value.to_le_bytes())
    }

    /// Current die temperature in degrees Celsius
    fn get_temperature(&mut self) -> Result<i16, HalError> {
        let mut buf = [0u8; 2];
        self.read_register(Register::Temperature, &mut buf)?;
        Ok(i16::from_le_bytes(buf))
    }
}
