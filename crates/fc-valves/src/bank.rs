//! The valve manifold as a [`ValveActuator`].

use std::time::Duration;

use fc_core::{FcResult, Position, Sleeper, ValveId};
use fc_modes::ValveActuator;
use tracing::{debug, info, warn};

use crate::link::Link;
use crate::protocol::{MessageMode, ValveCommand, parse_position_reply};

/// Time allowed for the rotor to finish moving before its position is read back.
pub const SETTLE_TIME: Duration = Duration::from_millis(300);

/// Gap between a query and reading its answer.
pub const QUERY_DELAY: Duration = Duration::from_millis(10);

/// Every selector valve on the manifold behind one link.
#[derive(Debug)]
pub struct ValveBank<L, S> {
    link: L,
    sleeper: S,
}

impl<L: Link, S: Sleeper> ValveBank<L, S> {
    pub fn new(link: L, sleeper: S) -> Self {
        Self { link, sleeper }
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    pub fn into_parts(self) -> (L, S) {
        (self.link, self.sleeper)
    }

    fn query(&mut self, valve: ValveId, command: ValveCommand) -> FcResult<String> {
        self.link.send(&command.encode(valve))?;
        self.sleeper.sleep(QUERY_DELAY);
        self.link.receive()
    }

    fn command(&mut self, valve: ValveId, command: ValveCommand) -> FcResult<()> {
        self.link.send(&command.encode(valve))
    }

    /// Reported position of one valve; `None` when the letter is not A/B.
    pub fn position(&mut self, valve: ValveId) -> FcResult<Option<Position>> {
        let reply = self.query(valve, ValveCommand::CurrentPosition)?;
        Ok(parse_position_reply(&reply)?.position)
    }

    /// Polls every address on the manifold in bus order.
    pub fn positions(&mut self) -> FcResult<Vec<(ValveId, Option<Position>)>> {
        let mut out = Vec::with_capacity(ValveId::ALL.len());
        for valve in ValveId::ALL {
            let position = self.position(valve)?;
            debug!(%valve, ?position, "polled");
            out.push((valve, position));
        }
        Ok(out)
    }

    pub fn toggle(&mut self, valve: ValveId) -> FcResult<()> {
        self.command(valve, ValveCommand::Toggle)?;
        self.sleeper.sleep(SETTLE_TIME);
        Ok(())
    }

    pub fn set_message_mode(&mut self, valve: ValveId, mode: MessageMode) -> FcResult<()> {
        self.command(valve, ValveCommand::MessageMode(Some(mode)))
    }

    pub fn message_mode(&mut self, valve: ValveId) -> FcResult<String> {
        self.query(valve, ValveCommand::MessageMode(None))
    }

    pub fn command_list(&mut self, valve: ValveId) -> FcResult<String> {
        self.query(valve, ValveCommand::CommandList)
    }

    pub fn settings(&mut self, valve: ValveId) -> FcResult<String> {
        self.query(valve, ValveCommand::Settings)
    }

    pub fn actuation_time(&mut self, valve: ValveId) -> FcResult<String> {
        self.query(valve, ValveCommand::ActuationTime)
    }

    pub fn port_count(&mut self, valve: ValveId) -> FcResult<String> {
        self.query(valve, ValveCommand::PortCount)
    }

    fn drive(&mut self, valve: ValveId, position: Position) -> FcResult<()> {
        self.command(valve, ValveCommand::MoveTo(position))?;
        self.sleeper.sleep(SETTLE_TIME);
        Ok(())
    }
}

impl<L: Link, S: Sleeper> ValveActuator for ValveBank<L, S> {
    /// Drives the valve, reads its position back and re-sends once on mismatch.
    fn move_valve_to_position(&mut self, valve: ValveId, position: Position) -> FcResult<()> {
        self.drive(valve, position)?;
        let reply = self.query(valve, ValveCommand::CurrentPosition)?;
        let reported = match parse_position_reply(&reply) {
            Ok(r) => r.position,
            Err(e) => {
                warn!(%valve, error = %e, "unreadable position reply");
                None
            }
        };
        if reported == Some(position) {
            info!("Valve {valve} moved to position {position}");
            return Ok(());
        }
        warn!(%valve, expected = %position, ?reported, "position mismatch, re-sending");
        self.drive(valve, position)?;
        info!("Valve {valve} moved to position {position}");
        Ok(())
    }
}
