//! Scriptable radar HAL for unit tests

use std::collections::HashMap;
use std::vec::Vec;

use crate::domain::calibration::CALIBRATION_RESULT_SIZE;
use crate::ports::radar_hal::{
    HalError, IntegrationStatus, PinLevel, RadarHal, Register, CLOCK_PLL_LOCKED, COMMAND_CALIBRATE,
    EXPECTED_CHIP_ID, STATUS_RESET_VALUE, SUPPLY_RAILS_GOOD,
};

/// Every HAL interaction, in call order
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Call {
    Pin(PinLevel),
    Wait(u32),
    Read(Register),
    Write(Register, Vec<u8>),
}

/// In-memory sensor that behaves like a healthy board until told otherwise
///
/// The interrupt line is raised by an enable pin rising edge, by a write to
/// `InterruptTrigger`, or by the calibrate command. `interrupt_responds`
/// set to false makes every wait time out.
pub(crate) struct MockHal {
    registers: HashMap<u16, Vec<u8>>,
    pin: PinLevel,
    interrupt_pending: bool,
    pub interrupt_responds: bool,
    /// Die temperature the calibrate command leaves behind
    pub temperature_after_calibration: Option<i16>,
    pub fail_on: Option<Register>,
    pub calls: Vec<Call>,
}

impl MockHal {
    pub fn new() -> Self {
        let mut hal = Self {
            registers: HashMap::new(),
            pin: PinLevel::Low,
            interrupt_pending: false,
            interrupt_responds: true,
            temperature_after_calibration: None,
            fail_on: None,
            calls: Vec::new(),
        };
        hal.set_u16(Register::ChipId, EXPECTED_CHIP_ID);
        hal.set_u16(Register::Status, STATUS_RESET_VALUE);
        hal.set_u16(Register::ClockStatus, CLOCK_PLL_LOCKED);
        hal.set_u16(Register::SupplyStatus, SUPPLY_RAILS_GOOD);
        hal.set_temperature(25);
        hal.set(Register::CalibrationResult, &[0xA5; CALIBRATION_RESULT_SIZE]);
        hal
    }

    pub fn set(&mut self, register: Register, bytes: &[u8]) {
        self.registers.insert(register.into(), bytes.to_vec());
    }

    pub fn set_u16(&mut self, register: Register, value: u16) {
        self.set(register, &value.to_le_bytes());
    }

    pub fn set_temperature(&mut self, celsius: i16) {
        self.set(Register::Temperature, &celsius.to_le_bytes());
    }

    fn check(&self, register: Register) -> Result<(), HalError> {
        if self.fail_on == Some(register) {
            return Err(HalError::Bus);
        }
        Ok(())
    }
}

impl RadarHal for MockHal {
    fn set_enable_pin(&mut self, level: PinLevel) -> Result<(), HalError> {
        self.calls.push(Call::Pin(level));
        if self.pin == PinLevel::Low && level == PinLevel::High {
            self.interrupt_pending = true;
        }
        self.pin = level;
        Ok(())
    }

    fn wait_for_interrupt(&mut self, timeout_ms: u32) -> Result<IntegrationStatus, HalError> {
        self.calls.push(Call::Wait(timeout_ms));
        if self.interrupt_pending && self.interrupt_responds {
            self.interrupt_pending = false;
            Ok(IntegrationStatus::Ok)
        } else {
            Ok(IntegrationStatus::Timeout)
        }
    }

    fn read_register(&mut self, register: Register, buf: &mut [u8]) -> Result<(), HalError> {
        self.calls.push(Call::Read(register));
        self.check(register)?;
        match self.registers.get(&u16::from(register)) {
            Some(bytes) if bytes.len() == buf.len() => {
                buf.copy_from_slice(bytes);
                Ok(())
            }
            _ => Err(HalError::InvalidResponse),
        }
    }

    fn write_register(&mut self, register: Register, data: &[u8]) -> Result<(), HalError> {
        self.calls.push(Call::Write(register, data.to_vec()));
        self.check(register)?;
        match register {
            Register::InterruptTrigger => self.interrupt_pending = true,
            Register::Command if data == COMMAND_CALIBRATE.to_le_bytes() => {
                self.interrupt_pending = true;
                if let Some(celsius) = self.temperature_after_calibration {
                    self.set_temperature(celsius);
                }
            }
            _ => {}
        }
        self.set(register, data);
        Ok(())
    }
}
