//! Mass-flow control for the rig's two mixing lines.
//!
//! The Flow-SMS controllers speak propar, reached through a TCP serial
//! server or a direct serial line. Gases are metered per line in groups
//! that share one controller, and the line pressures are read from two
//! transducers on the same bus.

pub mod client;
pub mod error;
pub mod groups;
pub mod mfc;
pub mod propar;
pub mod report;
pub mod setpoint;

pub use client::{ProparClient, ProparSerialClient, ProparTcpClient};
pub use error::{FlowError, FlowResult};
pub use groups::{GAS_GROUPS, GasGroup, Line, group_of, plan_setpoints};
pub use mfc::{ChannelReading, FlowController, FlowSms};
pub use report::{ChannelStatus, FlowReport, PressureReport, flow_report, pressure_report};
pub use setpoint::{FlowSetpoint, convert_setpoint};
