//! Radar HAL adapter over embedded-hal 1.0 traits
//!
//! Works with any board whose HAL provides an SPI device, one output pin
//! for sensor enable, one input pin for the sensor interrupt and a delay.
//!
//! # Register transactions
//!
//! Addresses are sent big-endian. The top bit of the address marks a write:
//!
//! ```text
//! read:  [addr_hi, addr_lo]         then read n bytes
//! write: [0x80 | addr_hi, addr_lo]  then data bytes
//! ```
//!
//! Both halves run inside one chip-select assertion.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal::spi::{Operation, SpiDevice};

use crate::ports::radar_hal::{HalError, IntegrationStatus, PinLevel, RadarHal, Register};

/// Time for the sensor crystal to settle after the enable pin changes
const ENABLE_SETTLE_MS: u32 = 2;

/// Interrupt line polling period
const INTERRUPT_POLL_MS: u32 = 1;

const WRITE_FLAG: u8 = 0x80;

/// Radar HAL built from embedded-hal peripherals
pub struct EmbeddedHalIntegration<SPI, EN, INT, D> {
    spi: SPI,
    enable: EN,
    interrupt: INT,
    delay: D,
}

impl<SPI, EN, INT, D> EmbeddedHalIntegration<SPI, EN, INT, D>
where
    SPI: SpiDevice,
    EN: OutputPin,
    INT: InputPin,
    D: DelayNs,
{
    /// Take ownership of the sensor peripherals
    pub fn new(spi: SPI, enable: EN, interrupt: INT, delay: D) -> Self {
        Self {
            spi,
            enable,
            interrupt,
            delay,
        }
    }

    /// Give the peripherals back
    pub fn release(self) -> (SPI, EN, INT, D) {
        (self.spi, self.enable, self.interrupt, self.delay)
    }

    fn address(register: Register) -> [u8; 2] {
        u16::from(register).to_be_bytes()
    }
}

impl<SPI, EN, INT, D> RadarHal for EmbeddedHalIntegration<SPI, EN, INT, D>
where
    SPI: SpiDevice,
    EN: OutputPin,
    INT: InputPin,
    D: DelayNs,
{
    fn set_enable_pin(&mut self, level: PinLevel) -> Result<(), HalError> {
        match level {
            PinLevel::High => self.enable.set_high(),
            PinLevel::Low => self.enable.set_low(),
        }
        .map_err(|_| HalError::Pin)?;
        self.delay.delay_ms(ENABLE_SETTLE_MS);
        Ok(())
    }

    fn wait_for_interrupt(&mut self, timeout_ms: u32) -> Result<IntegrationStatus, HalError> {
        let mut waited_ms = 0;
        loop {
            if self.interrupt.is_high().map_err(|_| HalError::Pin)? {
                return Ok(IntegrationStatus::Ok);
            }
            if waited_ms >= timeout_ms {
                warn!("radar: no interrupt within {} ms", timeout_ms);
                return Ok(IntegrationStatus::Timeout);
            }
            self.delay.delay_ms(INTERRUPT_POLL_MS);
            waited_ms += INTERRUPT_POLL_MS;
        }
    }

    fn read_register(&mut self, register: Register, buf: &mut [u8]) -> Result<(), HalError> {
        let address = Self::address(register);
        self.spi
            .transaction(&mut [Operation::Write(&address), Operation::Read(buf)])
            .map_err(|_| HalError::Bus)
    }

    fn write_register(&mut self, register: Register, data: &[u8]) -> Result<(), HalError> {
        let [hi, lo] = Self::address(register);
        self.spi
            .transaction(&mut [Operation::Write(&[WRITE_FLAG | hi, lo]), Operation::Write(data)])
            .map_err(|_| HalError::Bus)
    }
}
