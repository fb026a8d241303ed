//! In-memory doubles for the actuator and sleeper seams.
//!
//! Both doubles can write into one shared [`EventLog`] so tests can assert
//! how commands and pauses interleave.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use fc_core::{FcError, FcResult, Position, Sleeper, ValveId};

use crate::actuator::ValveActuator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Command(ValveId, Position),
    Sleep(Duration),
}

/// Shared, ordered record of commands and sleeps.
#[derive(Debug, Clone, Default)]
pub struct EventLog(Rc<RefCell<Vec<Event>>>);

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: Event) {
        self.0.borrow_mut().push(event);
    }

    pub fn events(&self) -> Vec<Event> {
        self.0.borrow().clone()
    }

    pub fn commands(&self) -> Vec<(ValveId, Position)> {
        self.0
            .borrow()
            .iter()
            .filter_map(|e| match *e {
                Event::Command(v, p) => Some((v, p)),
                Event::Sleep(_) => None,
            })
            .collect()
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.0
            .borrow()
            .iter()
            .filter_map(|e| match *e {
                Event::Sleep(d) => Some(d),
                Event::Command(..) => None,
            })
            .collect()
    }
}

/// Records every command; optionally faults on the n-th (0-based) one.
#[derive(Debug, Clone, Default)]
pub struct RecordingActuator {
    log: EventLog,
    fail_at: Option<usize>,
    attempts: usize,
}

impl RecordingActuator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sharing(log: &EventLog) -> Self {
        Self {
            log: log.clone(),
            ..Self::default()
        }
    }

    /// The command at index `n` returns a transport fault and is not recorded.
    pub fn failing_at(n: usize) -> Self {
        Self {
            fail_at: Some(n),
            ..Self::default()
        }
    }

    pub fn with_failure_at(mut self, n: usize) -> Self {
        self.fail_at = Some(n);
        self
    }

    pub fn log(&self) -> &EventLog {
        &self.log
    }

    pub fn commands(&self) -> Vec<(ValveId, Position)> {
        self.log.commands()
    }
}

impl ValveActuator for RecordingActuator {
    fn move_valve_to_position(&mut self, valve: ValveId, position: Position) -> FcResult<()> {
        let attempt = self.attempts;
        self.attempts += 1;
        if self.fail_at == Some(attempt) {
            return Err(FcError::Transport {
                what: format!("simulated fault moving valve {valve} to {position}"),
            });
        }
        self.log.push(Event::Command(valve, position));
        Ok(())
    }
}

/// Records requested pauses without blocking.
#[derive(Debug, Clone, Default)]
pub struct RecordingSleeper {
    log: EventLog,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sharing(log: &EventLog) -> Self {
        Self { log: log.clone() }
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.log.sleeps()
    }

    pub fn total(&self) -> Duration {
        self.sleeps().iter().sum()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&mut self, duration: Duration) {
        self.log.push(Event::Sleep(duration));
    }
}
