//! Eurotherm furnace controller over Modbus.

use std::fmt;
use std::time::Duration;

use fc_core::Sleeper;
use tracing::{info, warn};

use crate::client::ModbusClient;
use crate::error::{ThermalError, ThermalResult};

/// Register map (one decimal place on every value).
pub mod registers {
    pub const THERMOCOUPLE: u16 = 1;
    pub const WORKING_SETPOINT: u16 = 2;
    pub const PROGRAMMER_TEMPERATURE: u16 = 5;
    pub const HEATING_RATE: u16 = 35;
    pub const OUTPUT_POWER: u16 = 85;
    /// Proportional band, then a reserved word, integral and derivative time.
    pub const PID_BLOCK: u16 = 6;
}

const SCALE: f64 = 10.0;
pub const WRITE_ATTEMPTS: u32 = 5;
pub const WRITE_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Readings of one controller poll.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThermalSnapshot {
    /// Reactor thermocouple, degC.
    pub thermocouple: f64,
    /// Working setpoint, degC.
    pub working_setpoint: f64,
    /// Programmer temperature, degC.
    pub programmer: f64,
    /// Ramp rate, degC/min.
    pub heating_rate: f64,
    /// Output power, percent.
    pub output_power: f64,
}

impl fmt::Display for ThermalSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TC {:.1} degC | WSP {:.1} degC | Prog {:.1} degC | Rate {:.1} degC/min | Power {:.1}%",
            self.thermocouple,
            self.working_setpoint,
            self.programmer,
            self.heating_rate,
            self.output_power
        )
    }
}

/// Tuning shipped for the reactor cells the rig is used with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PidPreset {
    /// Harrick Mantis DRIFTS cell, local power output.
    MantisDrifts,
    /// Clausen cell with coil heaters on the local output.
    ClausenCoilLocal,
    /// Clausen cell with coil heaters on a remote power supply.
    ClausenCoilRemote,
}

impl PidPreset {
    pub const ALL: [PidPreset; 3] = [
        PidPreset::MantisDrifts,
        PidPreset::ClausenCoilLocal,
        PidPreset::ClausenCoilRemote,
    ];

    /// Raw contents of the PID block.
    pub fn registers(self) -> [u16; 4] {
        match self {
            PidPreset::MantisDrifts => [869, 0, 96, 16],
            PidPreset::ClausenCoilLocal => [9876, 0, 96, 16],
            PidPreset::ClausenCoilRemote => [6000, 0, 20, 4],
        }
    }

    /// Power output the operator has to select after applying the preset.
    pub fn power_output(self) -> &'static str {
        match self {
            PidPreset::ClausenCoilRemote => "REMOTE",
            _ => "LOCAL",
        }
    }
}

/// PID terms as read back from the controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PidTerms {
    pub proportional_band: f64,
    /// Seconds.
    pub integral_time: u16,
    /// Seconds.
    pub derivative_time: u16,
}

impl PidTerms {
    pub fn from_block(block: &[u16]) -> ThermalResult<Self> {
        match *block {
            [pb, _, ti, td] => Ok(Self {
                proportional_band: from_register(pb),
                integral_time: ti,
                derivative_time: td,
            }),
            _ => Err(ThermalError::frame(format!(
                "PID block has {} registers",
                block.len()
            ))),
        }
    }
}

impl fmt::Display for PidTerms {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Proportional band = {:.1} | Integral time = {} | Derivative time = {}",
            self.proportional_band, self.integral_time, self.derivative_time
        )
    }
}

/// Furnace temperature controller seam.
pub trait TemperatureController {
    fn read_thermocouple(&mut self) -> ThermalResult<f64>;
    fn read_working_setpoint(&mut self) -> ThermalResult<f64>;
    fn read_programmer_temperature(&mut self) -> ThermalResult<f64>;
    fn read_heating_rate(&mut self) -> ThermalResult<f64>;
    fn read_output_power(&mut self) -> ThermalResult<f64>;

    fn write_setpoint(&mut self, celsius: f64) -> ThermalResult<()>;
    fn write_heating_rate(&mut self, celsius_per_min: f64) -> ThermalResult<()>;

    /// Load a PID preset and return the terms the controller now holds.
    fn apply_pid(&mut self, preset: PidPreset) -> ThermalResult<PidTerms>;

    fn snapshot(&mut self) -> ThermalResult<ThermalSnapshot> {
        Ok(ThermalSnapshot {
            thermocouple: self.read_thermocouple()?,
            working_setpoint: self.read_working_setpoint()?,
            programmer: self.read_programmer_temperature()?,
            heating_rate: self.read_heating_rate()?,
            output_power: self.read_output_power()?,
        })
    }
}

impl<T: TemperatureController + ?Sized> TemperatureController for Box<T> {
    fn read_thermocouple(&mut self) -> ThermalResult<f64> {
        (**self).read_thermocouple()
    }
    fn read_working_setpoint(&mut self) -> ThermalResult<f64> {
        (**self).read_working_setpoint()
    }
    fn read_programmer_temperature(&mut self) -> ThermalResult<f64> {
        (**self).read_programmer_temperature()
    }
    fn read_heating_rate(&mut self) -> ThermalResult<f64> {
        (**self).read_heating_rate()
    }
    fn read_output_power(&mut self) -> ThermalResult<f64> {
        (**self).read_output_power()
    }
    fn write_setpoint(&mut self, celsius: f64) -> ThermalResult<()> {
        (**self).write_setpoint(celsius)
    }
    fn write_heating_rate(&mut self, celsius_per_min: f64) -> ThermalResult<()> {
        (**self).write_heating_rate(celsius_per_min)
    }
    fn apply_pid(&mut self, preset: PidPreset) -> ThermalResult<PidTerms> {
        (**self).apply_pid(preset)
    }
}

/// Convert an engineering value to its one-decimal register encoding.
pub fn to_register(value: f64, what: &str) -> ThermalResult<u16> {
    let raw = (value * SCALE).round();
    if !raw.is_finite() || raw < 0.0 || raw > u16::MAX as f64 {
        return Err(ThermalError::OutOfRange {
            what: format!("{what} {value} does not fit a one-decimal register"),
        });
    }
    Ok(raw as u16)
}

pub fn from_register(raw: u16) -> f64 {
    raw as f64 / SCALE
}

#[derive(Debug)]
pub struct Eurotherm<C, S> {
    client: C,
    sleeper: S,
    write_attempts: u32,
    retry_delay: Duration,
}

impl<C: ModbusClient, S: Sleeper> Eurotherm<C, S> {
    pub fn new(client: C, sleeper: S) -> Self {
        Self {
            client,
            sleeper,
            write_attempts: WRITE_ATTEMPTS,
            retry_delay: WRITE_RETRY_DELAY,
        }
    }

    pub fn with_retry(mut self, attempts: u32, delay: Duration) -> Self {
        self.write_attempts = attempts.max(1);
        self.retry_delay = delay;
        self
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn into_parts(self) -> (C, S) {
        (self.client, self.sleeper)
    }

    fn read_scaled(&mut self, register: u16) -> ThermalResult<f64> {
        self.client.read_holding_register(register).map(from_register)
    }

    fn write_with_retry(&mut self, register: u16, value: u16) -> ThermalResult<()> {
        let mut last = String::new();
        for attempt in 1..=self.write_attempts {
            match self.client.write_single_register(register, value) {
                Ok(()) => return Ok(()),
                Err(e) => {
                    warn!(register, attempt, error = %e, "register write failed");
                    last = e.to_string();
                    if attempt < self.write_attempts {
                        self.sleeper.sleep(self.retry_delay);
                    }
                }
            }
        }
        Err(ThermalError::WriteFailed {
            register,
            attempts: self.write_attempts,
            last,
        })
    }
}

impl<C: ModbusClient, S: Sleeper> TemperatureController for Eurotherm<C, S> {
    fn read_thermocouple(&mut self) -> ThermalResult<f64> {
        self.read_scaled(registers::THERMOCOUPLE)
    }

    fn read_working_setpoint(&mut self) -> ThermalResult<f64> {
        self.read_scaled(registers::WORKING_SETPOINT)
    }

    fn read_programmer_temperature(&mut self) -> ThermalResult<f64> {
        self.read_scaled(registers::PROGRAMMER_TEMPERATURE)
    }

    fn read_heating_rate(&mut self) -> ThermalResult<f64> {
        self.read_scaled(registers::HEATING_RATE)
    }

    fn read_output_power(&mut self) -> ThermalResult<f64> {
        self.read_scaled(registers::OUTPUT_POWER)
    }

    fn write_setpoint(&mut self, celsius: f64) -> ThermalResult<()> {
        let raw = to_register(celsius, "setpoint")?;
        self.write_with_retry(registers::WORKING_SETPOINT, raw)?;
        info!("Setpoint written: {celsius:.1} degC");
        Ok(())
    }

    fn write_heating_rate(&mut self, celsius_per_min: f64) -> ThermalResult<()> {
        let raw = to_register(celsius_per_min, "heating rate")?;
        self.write_with_retry(registers::HEATING_RATE, raw)?;
        info!("Heating rate written: {celsius_per_min:.1} degC/min");
        Ok(())
    }

    fn apply_pid(&mut self, preset: PidPreset) -> ThermalResult<PidTerms> {
        let block = preset.registers();
        self.client
            .write_multiple_registers(registers::PID_BLOCK, &block)?;
        let read = self
            .client
            .read_holding_registers(registers::PID_BLOCK, block.len() as u16)?;
        let terms = PidTerms::from_block(&read)?;
        info!(
            "PID for {preset:?}: {terms}. Switch power output to {}",
            preset.power_output()
        );
        Ok(terms)
    }
}
