//! Mode controller: named operations to ordered valve commands.

use fc_core::{FcResult, Position, ValveId};
use tracing::{debug, info};

use crate::actuator::ValveActuator;
use crate::mode::Mode;

/// Last position commanded for each valve on the manifold.
///
/// Hardware is never read back, so this is what the controller believes,
/// not what the valves report. `None` means never commanded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandedState {
    positions: [Option<Position>; ValveId::ALL.len()],
}

impl CommandedState {
    pub fn get(&self, valve: ValveId) -> Option<Position> {
        self.positions[valve as usize]
    }

    fn record(&mut self, valve: ValveId, position: Position) {
        self.positions[valve as usize] = Some(position);
    }

    /// The named mode the commanded `A`, `B`, `C` positions realise, if any.
    pub fn active_mode(&self) -> Option<Mode> {
        Mode::ALL.into_iter().find(|mode| {
            mode.commands()
                .iter()
                .all(|&(valve, position)| self.get(valve) == Some(position))
        })
    }
}

/// Result of a single-valve setter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValveSetOutcome {
    /// The token was recognised and the command issued.
    Commanded(Position),
    /// The token was not `"ON"`/`"OFF"`; nothing was sent.
    Ignored,
}

/// Translates named operations into `(valve, position)` commands.
///
/// Owns the actuator for the lifetime of the rig. Every operation is
/// idempotent: repeating it re-sends the same commands.
#[derive(Debug)]
pub struct ModeController<A> {
    actuator: A,
    state: CommandedState,
    issued: usize,
}

impl<A: ValveActuator> ModeController<A> {
    pub fn new(actuator: A) -> Self {
        Self {
            actuator,
            state: CommandedState::default(),
            issued: 0,
        }
    }

    pub fn state(&self) -> &CommandedState {
        &self.state
    }

    /// Total commands issued through this controller.
    pub fn issued(&self) -> usize {
        self.issued
    }

    pub fn actuator(&self) -> &A {
        &self.actuator
    }

    pub fn actuator_mut(&mut self) -> &mut A {
        &mut self.actuator
    }

    pub fn into_actuator(self) -> A {
        self.actuator
    }

    /// Issue one command and record it. A fault leaves the state untouched
    /// for this valve and is returned as-is.
    pub fn set_valve(&mut self, valve: ValveId, position: Position) -> FcResult<()> {
        self.actuator.move_valve_to_position(valve, position)?;
        self.state.record(valve, position);
        self.issued += 1;
        debug!(valve = %valve, position = %position, "valve commanded");
        Ok(())
    }

    /// Enter a named mode by issuing its three commands in table order.
    pub fn enter(&mut self, mode: Mode, verbose: bool) -> FcResult<()> {
        for (valve, position) in mode.commands() {
            self.set_valve(valve, position)?;
        }
        if verbose {
            info!("Valves operation mode: {}", mode.label());
            info!("{}", mode.topology());
        }
        Ok(())
    }

    pub fn continuous_mode_a(&mut self, verbose: bool) -> FcResult<()> {
        self.enter(Mode::ContinuousA, verbose)
    }

    pub fn continuous_mode_b(&mut self, verbose: bool) -> FcResult<()> {
        self.enter(Mode::ContinuousB, verbose)
    }

    pub fn pulses_loop_mode_a(&mut self, verbose: bool) -> FcResult<()> {
        self.enter(Mode::PulsesLoopA, verbose)
    }

    pub fn pulses_loop_mode_b(&mut self, verbose: bool) -> FcResult<()> {
        self.enter(Mode::PulsesLoopB, verbose)
    }

    /// Pulses-line loop selector.
    pub fn valve_a(&mut self, token: &str) -> FcResult<ValveSetOutcome> {
        self.set_from_token(ValveId::A, token)
    }

    /// Reactor-feed selector.
    pub fn valve_b(&mut self, token: &str) -> FcResult<ValveSetOutcome> {
        self.set_from_token(ValveId::B, token)
    }

    /// Reaction-mode selector.
    pub fn valve_c(&mut self, token: &str) -> FcResult<ValveSetOutcome> {
        self.set_from_token(ValveId::C, token)
    }

    fn set_from_token(&mut self, valve: ValveId, token: &str) -> FcResult<ValveSetOutcome> {
        let Some(position) = Position::from_token(token) else {
            debug!(valve = %valve, token, "unrecognised position token, no command sent");
            return Ok(ValveSetOutcome::Ignored);
        };
        self.set_valve(valve, position)?;
        info!("{}", valve_status(valve, position));
        Ok(ValveSetOutcome::Commanded(position))
    }
}

fn valve_status(valve: ValveId, position: Position) -> &'static str {
    match (valve, position) {
        (ValveId::A, Position::Off) => {
            "Pulses line valve position: off (Gas Line A -> loop 1 -> vent / Gas Line B -> loop 2 -> reactor)"
        }
        (ValveId::A, Position::On) => {
            "Pulses line valve position: on (Gas Line B -> loop 2 -> vent / Gas Line A -> loop 1 -> reactor)"
        }
        (ValveId::B, Position::Off) => {
            "Valve B position: off (Gas Line A -> reactor) (Gas Line B -> pulses)"
        }
        (ValveId::B, Position::On) => {
            "Valve B position: on (Gas Line B -> reactor) (Gas Line A -> pulses)"
        }
        (ValveId::C, Position::Off) => "Gas Line A/B valve position: off (Gas Line A/B -> reactor)",
        (ValveId::C, Position::On) => "Gas Line A/B valve position: on (Gas Line A/B -> loop)",
        (_, Position::Off) => "Feed valve position: off",
        (_, Position::On) => "Feed valve position: on",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::RecordingActuator;
    use fc_core::Position::{Off, On};

    #[test]
    fn continuous_mode_a_issues_all_off_in_order() {
        let mut ctl = ModeController::new(RecordingActuator::new());
        ctl.continuous_mode_a(true).unwrap();
        assert_eq!(
            ctl.actuator().commands(),
            vec![(ValveId::A, Off), (ValveId::B, Off), (ValveId::C, Off)]
        );
        assert_eq!(ctl.state().active_mode(), Some(Mode::ContinuousA));
    }

    #[test]
    fn repeating_a_mode_resends_identical_commands() {
        let mut ctl = ModeController::new(RecordingActuator::new());
        ctl.pulses_loop_mode_b(false).unwrap();
        ctl.pulses_loop_mode_b(false).unwrap();
        let cmds = ctl.actuator().commands();
        assert_eq!(cmds.len(), 6);
        assert_eq!(cmds[..3], cmds[3..]);
        assert_eq!(ctl.issued(), 6);
    }

    #[test]
    fn valve_setters_target_their_own_valve() {
        let mut ctl = ModeController::new(RecordingActuator::new());
        assert_eq!(ctl.valve_a("ON").unwrap(), ValveSetOutcome::Commanded(On));
        assert_eq!(ctl.valve_b("OFF").unwrap(), ValveSetOutcome::Commanded(Off));
        assert_eq!(ctl.valve_c("ON").unwrap(), ValveSetOutcome::Commanded(On));
        assert_eq!(
            ctl.actuator().commands(),
            vec![(ValveId::A, On), (ValveId::B, Off), (ValveId::C, On)]
        );
    }

    #[test]
    fn unrecognised_token_sends_nothing() {
        let mut ctl = ModeController::new(RecordingActuator::new());
        for token in ["on", "Off", "OPEN", ""] {
            assert_eq!(ctl.valve_c(token).unwrap(), ValveSetOutcome::Ignored);
        }
        assert!(ctl.actuator().commands().is_empty());
        assert_eq!(ctl.state().get(ValveId::C), None);
    }

    #[test]
    fn fault_stops_mode_change_midway() {
        let mut ctl = ModeController::new(RecordingActuator::failing_at(1));
        let err = ctl.continuous_mode_b(true).unwrap_err();
        assert!(err.to_string().contains("Transport"));
        // A went out, B faulted, C was never sent.
        assert_eq!(ctl.actuator().commands(), vec![(ValveId::A, Off)]);
        assert_eq!(ctl.state().get(ValveId::A), Some(Off));
        assert_eq!(ctl.state().get(ValveId::B), None);
        assert_eq!(ctl.state().active_mode(), None);
    }

    #[test]
    fn single_setter_can_complete_a_mode() {
        let mut ctl = ModeController::new(RecordingActuator::new());
        ctl.continuous_mode_a(false).unwrap();
        ctl.valve_b("ON").unwrap();
        assert_eq!(ctl.state().active_mode(), Some(Mode::ContinuousB));
    }
}
