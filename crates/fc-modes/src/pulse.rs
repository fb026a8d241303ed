//! Timed pulse trains built on the mode controller.
//!
//! Two physical strategies exist:
//! - **Loop alternation**: the rig sits in a pulses-loop baseline and the
//!   pulses-line valve is driven once per pulse, injecting loop contents
//! - **Single-valve**: the rig flips between the two continuous modes, holding
//!   the "open" mode for the requested time plus a transit-lag compensation
//!
//! Trains block the calling thread until every pulse has been issued. There is
//! no cancellation; a fault from the actuator ends the train immediately and
//! leaves already-issued commands in effect.

use fc_core::{FcResult, Position, Sleeper, Time, Timer, ValveId, s, seconds, to_sleep_duration};
use tracing::{debug, info};

use crate::actuator::ValveActuator;
use crate::controller::ModeController;
use crate::mode::Mode;

/// Gas transit lag between valve actuation and arrival at the reactor,
/// added to every single-valve open phase.
pub const DEAD_VOLUME_COMPENSATION_S: f64 = 0.38;

/// Valve driven on every loop-alternation pulse.
pub const PULSES_LINE_VALVE: ValveId = ValveId::A;

/// How the pulses-line valve is driven during loop alternation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoopPulseStrategy {
    /// Command `ON` on every pulse. After the first pulse the valve is
    /// already `ON`, so later pulses only re-assert it.
    #[default]
    ReassertOn,
    /// Flip the valve on every pulse, so every second pulse returns it to the
    /// baseline position.
    Alternate,
}

/// Parameters of a loop-alternation train.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoopPulseTrain {
    pub count: u32,
    /// Pause after each pulse.
    pub period: Time,
}

impl LoopPulseTrain {
    pub fn new(count: u32, period: Time) -> Self {
        Self { count, period }
    }
}

/// Parameters of a single-valve train.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValvePulseTrain {
    pub count: u32,
    /// Requested open time, before compensation.
    pub open: Time,
    /// Pause after the valve closes.
    pub period: Time,
}

impl ValvePulseTrain {
    pub fn new(count: u32, open: Time, period: Time) -> Self {
        Self { count, open, period }
    }

    /// Time actually held in the open mode.
    pub fn open_phase(&self) -> Time {
        self.open + s(DEAD_VOLUME_COMPENSATION_S)
    }
}

/// Summary of a completed train.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PulseReport {
    pub pulses: u32,
    /// Valve commands issued, baseline included.
    pub commands: usize,
    /// Sum of all requested pauses.
    pub scheduled: Time,
}

/// Generates pulse trains on top of a [`ModeController`].
#[derive(Debug)]
pub struct PulseSequencer<A, S> {
    controller: ModeController<A>,
    sleeper: S,
    strategy: LoopPulseStrategy,
}

impl<A: ValveActuator, S: Sleeper> PulseSequencer<A, S> {
    pub fn new(controller: ModeController<A>, sleeper: S) -> Self {
        Self {
            controller,
            sleeper,
            strategy: LoopPulseStrategy::default(),
        }
    }

    pub fn with_strategy(mut self, strategy: LoopPulseStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn strategy(&self) -> LoopPulseStrategy {
        self.strategy
    }

    pub fn set_strategy(&mut self, strategy: LoopPulseStrategy) {
        self.strategy = strategy;
    }

    pub fn controller(&self) -> &ModeController<A> {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut ModeController<A> {
        &mut self.controller
    }

    /// Pauses outside a train, such as furnace polling, go through the same
    /// sleeper.
    pub fn sleeper_mut(&mut self) -> &mut S {
        &mut self.sleeper
    }

    pub fn into_parts(self) -> (ModeController<A>, S) {
        (self.controller, self.sleeper)
    }

    /// Dual-loop pulsing from the `PulsesLoopA` baseline.
    pub fn send_pulses_loop_a(&mut self, train: &LoopPulseTrain) -> FcResult<PulseReport> {
        self.send_pulses_loop(Mode::PulsesLoopA, train)
    }

    /// Dual-loop pulsing from the `PulsesLoopB` baseline.
    pub fn send_pulses_loop_b(&mut self, train: &LoopPulseTrain) -> FcResult<PulseReport> {
        self.send_pulses_loop(Mode::PulsesLoopB, train)
    }

    fn send_pulses_loop(&mut self, baseline: Mode, train: &LoopPulseTrain) -> FcResult<PulseReport> {
        let period = to_sleep_duration(train.period, "time between pulses")?;
        let issued_before = self.controller.issued();
        let timer = Timer::start("loop pulses");

        self.controller.enter(baseline, true)?;
        info!("Valves operation mode: pulses (dual loop alternation)");
        info!(
            "Number of pulses (loop): {}, time in between pulses (s): {}",
            train.count,
            seconds(train.period)
        );

        for pulse in 1..=train.count {
            let target = match self.strategy {
                LoopPulseStrategy::ReassertOn => Position::On,
                LoopPulseStrategy::Alternate => self
                    .controller
                    .state()
                    .get(PULSES_LINE_VALVE)
                    .unwrap_or(Position::Off)
                    .toggled(),
            };
            self.controller.set_valve(PULSES_LINE_VALVE, target)?;
            debug!("Sending pulse number {} of {}", pulse, train.count);
            self.sleeper.sleep(period);
        }

        info!("Pulses have finished");
        debug!(label = timer.label(), elapsed_s = timer.elapsed_s(), "train complete");
        Ok(PulseReport {
            pulses: train.count,
            commands: self.controller.issued() - issued_before,
            scheduled: s(period.as_secs_f64() * f64::from(train.count)),
        })
    }

    /// Single-valve pulsing: `ContinuousB` is the open position,
    /// `ContinuousA` the closed one.
    pub fn send_pulses_valve_a(&mut self, train: &ValvePulseTrain) -> FcResult<PulseReport> {
        let open = to_sleep_duration(train.open_phase(), "valve open time")?;
        let period = to_sleep_duration(train.period, "time between pulses")?;
        let issued_before = self.controller.issued();
        let timer = Timer::start("valve pulses");

        self.controller.continuous_mode_a(true)?;
        info!("Valves operation mode: pulses (valve)");
        info!(
            "Number of pulses (valve): {}, time valve open (s): {}, time in between pulses (s): {}",
            train.count,
            seconds(train.open),
            seconds(train.period)
        );

        for pulse in 1..=train.count {
            self.controller.continuous_mode_b(false)?;
            self.sleeper.sleep(open);
            self.controller.continuous_mode_a(false)?;
            debug!("Sending pulse number {} of {}", pulse, train.count);
            self.sleeper.sleep(period);
        }

        info!("Pulses have finished");
        debug!(label = timer.label(), elapsed_s = timer.elapsed_s(), "train complete");
        Ok(PulseReport {
            pulses: train.count,
            commands: self.controller.issued() - issued_before,
            scheduled: s((open + period).as_secs_f64() * f64::from(train.count)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{Event, EventLog, RecordingActuator, RecordingSleeper};
    use fc_core::Position::{Off, On};
    use std::time::Duration;

    fn sequencer(log: &EventLog) -> PulseSequencer<RecordingActuator, RecordingSleeper> {
        PulseSequencer::new(
            ModeController::new(RecordingActuator::sharing(log)),
            RecordingSleeper::sharing(log),
        )
    }

    #[test]
    fn loop_a_three_pulses() {
        let log = EventLog::new();
        let mut seq = sequencer(&log);
        let report = seq.send_pulses_loop_a(&LoopPulseTrain::new(3, s(0.1))).unwrap();

        let tick = Duration::from_secs_f64(0.1);
        assert_eq!(
            log.events(),
            vec![
                Event::Command(ValveId::A, Off),
                Event::Command(ValveId::B, Off),
                Event::Command(ValveId::C, On),
                Event::Command(ValveId::A, On),
                Event::Sleep(tick),
                Event::Command(ValveId::A, On),
                Event::Sleep(tick),
                Event::Command(ValveId::A, On),
                Event::Sleep(tick),
            ]
        );
        assert_eq!(report.pulses, 3);
        assert_eq!(report.commands, 6);
        assert!((seconds(report.scheduled) - 0.3).abs() < 1e-9);
    }

    #[test]
    fn loop_b_uses_its_own_baseline() {
        let log = EventLog::new();
        let mut seq = sequencer(&log);
        seq.send_pulses_loop_b(&LoopPulseTrain::new(1, s(0.5))).unwrap();
        assert_eq!(
            log.commands(),
            vec![
                (ValveId::A, Off),
                (ValveId::B, On),
                (ValveId::C, On),
                (ValveId::A, On),
            ]
        );
    }

    #[test]
    fn alternate_strategy_returns_to_baseline_every_second_pulse() {
        let log = EventLog::new();
        let mut seq = sequencer(&log).with_strategy(LoopPulseStrategy::Alternate);
        seq.send_pulses_loop_a(&LoopPulseTrain::new(4, s(0.2))).unwrap();
        let toggles: Vec<_> = log.commands()[3..].iter().map(|(_, p)| *p).collect();
        assert_eq!(toggles, vec![On, Off, On, Off]);
        assert_eq!(seq.controller().state().active_mode(), Some(Mode::PulsesLoopA));
    }

    #[test]
    fn zero_count_only_enters_baseline() {
        let log = EventLog::new();
        let mut seq = sequencer(&log);
        let report = seq.send_pulses_loop_a(&LoopPulseTrain::new(0, s(5.0))).unwrap();
        assert_eq!(log.commands(), Mode::PulsesLoopA.commands().to_vec());
        assert!(log.sleeps().is_empty());
        assert_eq!(report.commands, 3);

        let log = EventLog::new();
        let mut seq = sequencer(&log);
        seq.send_pulses_valve_a(&ValvePulseTrain::new(0, s(1.0), s(1.0)))
            .unwrap();
        assert_eq!(log.commands(), Mode::ContinuousA.commands().to_vec());
        assert!(log.sleeps().is_empty());
    }

    #[test]
    fn valve_pulse_adds_compensation_to_open_phase() {
        let log = EventLog::new();
        let mut seq = sequencer(&log);
        let report = seq
            .send_pulses_valve_a(&ValvePulseTrain::new(2, s(1.0), s(4.0)))
            .unwrap();

        let open = Duration::from_secs_f64(1.0 + DEAD_VOLUME_COMPENSATION_S);
        let period = Duration::from_secs_f64(4.0);
        assert_eq!(log.sleeps(), vec![open, period, open, period]);
        // Baseline + 2 x (open mode + closed mode).
        assert_eq!(report.commands, 3 + 2 * 6);

        let events = log.events();
        assert_eq!(&events[3..6], &[
            Event::Command(ValveId::A, Off),
            Event::Command(ValveId::B, On),
            Event::Command(ValveId::C, Off),
        ]);
        assert_eq!(events[6], Event::Sleep(open));
        assert_eq!(events[10], Event::Sleep(period));
    }

    #[test]
    fn zero_and_negative_periods_do_not_pause() {
        let log = EventLog::new();
        let mut seq = sequencer(&log);
        seq.send_pulses_loop_a(&LoopPulseTrain::new(2, s(0.0))).unwrap();
        seq.send_pulses_loop_b(&LoopPulseTrain::new(2, s(-3.0))).unwrap();
        assert!(log.sleeps().iter().all(|d| d.is_zero()));
        assert_eq!(log.sleeps().len(), 4);
    }

    #[test]
    fn non_finite_period_is_rejected_before_any_command() {
        let log = EventLog::new();
        let mut seq = sequencer(&log);
        assert!(
            seq.send_pulses_loop_a(&LoopPulseTrain::new(3, s(f64::NAN)))
                .is_err()
        );
        assert!(
            seq.send_pulses_valve_a(&ValvePulseTrain::new(3, s(f64::INFINITY), s(1.0)))
                .is_err()
        );
        assert!(log.events().is_empty());
    }

    #[test]
    fn fault_mid_train_stops_immediately() {
        let log = EventLog::new();
        // Fault on the second pulse command (index 4: three baseline + one pulse).
        let actuator = RecordingActuator::sharing(&log).with_failure_at(4);
        let mut seq = PulseSequencer::new(
            ModeController::new(actuator),
            RecordingSleeper::sharing(&log),
        );
        assert!(seq.send_pulses_loop_a(&LoopPulseTrain::new(10, s(0.1))).is_err());
        assert_eq!(log.commands().len(), 4);
        assert_eq!(log.sleeps().len(), 1);
        assert_eq!(seq.controller().state().get(ValveId::A), Some(On));
    }

    #[test]
    fn fault_inside_open_mode_ends_valve_train_before_any_pause() {
        let log = EventLog::new();
        // Index 5 is valve C of the first ContinuousB entry.
        let actuator = RecordingActuator::sharing(&log).with_failure_at(5);
        let sleeper = RecordingSleeper::sharing(&log);
        let mut seq = PulseSequencer::new(ModeController::new(actuator), sleeper.clone());
        assert!(
            seq.send_pulses_valve_a(&ValvePulseTrain::new(3, s(1.0), s(2.0)))
                .is_err()
        );

        assert_eq!(
            log.commands(),
            vec![
                (ValveId::A, Off),
                (ValveId::B, Off),
                (ValveId::C, Off),
                (ValveId::A, Off),
                (ValveId::B, On),
            ]
        );
        assert_eq!(sleeper.total(), Duration::ZERO);
        let state = seq.controller().state();
        assert_eq!(state.get(ValveId::B), Some(On));
        // C keeps the Off recorded by the baseline.
        assert_eq!(state.get(ValveId::C), Some(Off));
        assert_eq!(state.active_mode(), Some(Mode::ContinuousB));
    }
}
