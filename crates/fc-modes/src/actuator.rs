//! The hardware seam consumed by the mode controller.

use fc_core::{FcResult, Position, ValveId};

/// Moves one valve to one logical position.
///
/// Implementations apply their own retry policy. Once this returns `Ok` the
/// command is considered issued; an `Err` aborts whatever sequence issued it.
pub trait ValveActuator {
    fn move_valve_to_position(&mut self, valve: ValveId, position: Position) -> FcResult<()>;
}

impl<T: ValveActuator + ?Sized> ValveActuator for &mut T {
    fn move_valve_to_position(&mut self, valve: ValveId, position: Position) -> FcResult<()> {
        (**self).move_valve_to_position(valve, position)
    }
}

impl<T: ValveActuator + ?Sized> ValveActuator for Box<T> {
    fn move_valve_to_position(&mut self, valve: ValveId, position: Position) -> FcResult<()> {
        (**self).move_valve_to_position(valve, position)
    }
}
