//! Valve-mode state machine and pulse-train sequencing for the fasstcat rig.
//!
//! The reaction-mode module has three two-way selector valves (`A`, `B`, `C`).
//! Every named reaction mode is a fixed combination of their positions, and
//! every pulse train is a timed series of transitions between those modes.
//!
//! # Architecture
//!
//! - [`ValveActuator`] is the only way out to hardware: one command per call,
//!   faults propagate unchanged
//! - [`ModeController`] owns the actuator and the last commanded position of
//!   each valve
//! - [`PulseSequencer`] owns a controller plus a [`fc_core::Sleeper`] and
//!   blocks for the whole train
//!
//! Nothing here reads hardware state back; the commanded state is the model.

pub mod actuator;
pub mod controller;
pub mod mode;
pub mod pulse;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use actuator::ValveActuator;
pub use controller::{CommandedState, ModeController, ValveSetOutcome};
pub use mode::Mode;
pub use pulse::{
    DEAD_VOLUME_COMPENSATION_S, LoopPulseStrategy, LoopPulseTrain, PULSES_LINE_VALVE,
    PulseReport, PulseSequencer, ValvePulseTrain,
};
