//! Driver for the multiposition selector-valve manifold.
//!
//! The manifold speaks a line-oriented ASCII protocol: every command is
//! `/{valve}{mnemonic}` followed by a carriage return, and queries answer with
//! a single line. Commands travel over a [`Link`], either a serial port or a
//! TCP serial server.
//!
//! [`ValveBank`] is the production [`fc_modes::ValveActuator`].

pub mod bank;
pub mod link;
pub mod protocol;

pub use bank::{QUERY_DELAY, SETTLE_TIME, ValveBank};
pub use link::{Link, SerialLink, TcpLink};
pub use protocol::{MessageMode, PositionReply, ValveCommand, parse_position_reply};
