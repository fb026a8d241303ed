//! Rig service layer shared by front ends.
//!
//! Reads the I/O record once, picks the valve, furnace and flow-controller transports, and
//! assembles them around the mode controller and pulse sequencer. Everything
//! a front end can do to the rig goes through [`Rig`].

pub mod error;
pub mod rig;
pub mod wiring;

pub use error::{AppError, AppResult};
pub use rig::{HardwareRig, Rig};
pub use wiring::{
    FlowBinding, ThermalBinding, ValveBus, flow_binding, open_flow, open_thermal,
    open_valve_link, thermal_binding, valve_bus,
};
