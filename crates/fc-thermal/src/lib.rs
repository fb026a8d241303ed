//! Furnace temperature control for the rig.
//!
//! The furnace is driven by a Eurotherm controller reached either over
//! Modbus TCP (through a gateway) or Modbus RTU on a serial line. Only the
//! functions the controller needs are implemented: read holding registers
//! (0x03), write single register (0x06) and write multiple registers (0x10).

pub mod client;
pub mod error;
pub mod eurotherm;
pub mod frame;
pub mod pdu;
pub mod ramp;

pub use client::{ModbusClient, ModbusRtuClient, ModbusTcpClient};
pub use error::{ThermalError, ThermalResult};
pub use eurotherm::{Eurotherm, PidPreset, PidTerms, TemperatureController, ThermalSnapshot};
pub use pdu::{Request, Response};
pub use ramp::{Ramp, RampDirection, RampOutcome, finish_experiment, ramp_to, run_ramp};
