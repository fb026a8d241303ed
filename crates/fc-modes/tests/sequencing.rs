//! Command-sequence properties of the mode controller and pulse sequencer.

use fc_core::Position::{Off, On};
use fc_core::{ThreadSleeper, Timer, ValveId, s};
use fc_modes::test_support::{EventLog, RecordingActuator, RecordingSleeper};
use fc_modes::{
    DEAD_VOLUME_COMPENSATION_S, LoopPulseTrain, Mode, ModeController, PULSES_LINE_VALVE,
    PulseSequencer, ValvePulseTrain, ValveSetOutcome,
};
use proptest::prelude::*;
use std::time::Duration;

fn mode_strategy() -> impl Strategy<Value = Mode> {
    prop::sample::select(Mode::ALL.to_vec())
}

proptest! {
    #[test]
    fn any_mode_sequence_issues_exact_table(modes in prop::collection::vec(mode_strategy(), 1..12)) {
        let mut ctl = ModeController::new(RecordingActuator::new());
        let mut expected = Vec::new();
        for mode in &modes {
            ctl.enter(*mode, false).unwrap();
            expected.extend(mode.commands());
        }
        prop_assert_eq!(ctl.actuator().commands(), expected);
        prop_assert_eq!(ctl.state().active_mode(), modes.last().copied());
    }

    #[test]
    fn loop_train_issues_count_pulses(count in 0u32..40, period_ms in 0u64..2_000) {
        let log = EventLog::new();
        let mut seq = PulseSequencer::new(
            ModeController::new(RecordingActuator::sharing(&log)),
            RecordingSleeper::sharing(&log),
        );
        let period = period_ms as f64 / 1000.0;
        seq.send_pulses_loop_a(&LoopPulseTrain::new(count, s(period))).unwrap();

        let cmds = log.commands();
        let baseline = Mode::PulsesLoopA.commands();
        prop_assert_eq!(&cmds[..3], &baseline[..]);
        prop_assert_eq!(cmds.len(), 3 + count as usize);
        prop_assert!(cmds[3..].iter().all(|c| *c == (PULSES_LINE_VALVE, On)));
        let sleeps = log.sleeps();
        prop_assert_eq!(sleeps.len(), count as usize);
        prop_assert!(sleeps.iter().all(|d| *d == Duration::from_secs_f64(period)));
    }

    #[test]
    fn valve_train_pairs_open_and_close(count in 0u32..20, open_ms in 0u64..3_000, period_ms in 0u64..3_000) {
        let log = EventLog::new();
        let mut seq = PulseSequencer::new(
            ModeController::new(RecordingActuator::sharing(&log)),
            RecordingSleeper::sharing(&log),
        );
        let open = open_ms as f64 / 1000.0;
        let period = period_ms as f64 / 1000.0;
        seq.send_pulses_valve_a(&ValvePulseTrain::new(count, s(open), s(period))).unwrap();

        let cmds = log.commands();
        prop_assert_eq!(cmds.len(), 3 + 6 * count as usize);
        let open_d = Duration::from_secs_f64(open + DEAD_VOLUME_COMPENSATION_S);
        let period_d = Duration::from_secs_f64(period);
        let sleeps = log.sleeps();
        prop_assert_eq!(sleeps.len(), 2 * count as usize);
        for pair in sleeps.chunks(2) {
            prop_assert_eq!(pair[0], open_d);
            prop_assert_eq!(pair[1], period_d);
        }
    }

    #[test]
    fn unrecognised_tokens_never_actuate(token in "[a-zA-Z ]{0,6}") {
        prop_assume!(token != "ON" && token != "OFF");
        let mut ctl = ModeController::new(RecordingActuator::new());
        prop_assert_eq!(ctl.valve_a(&token).unwrap(), ValveSetOutcome::Ignored);
        prop_assert_eq!(ctl.valve_b(&token).unwrap(), ValveSetOutcome::Ignored);
        prop_assert_eq!(ctl.valve_c(&token).unwrap(), ValveSetOutcome::Ignored);
        prop_assert!(ctl.actuator().commands().is_empty());
    }
}

#[test]
fn continuous_mode_a_scenario() {
    let mut ctl = ModeController::new(RecordingActuator::new());
    ctl.continuous_mode_a(true).unwrap();
    assert_eq!(
        ctl.actuator().commands(),
        vec![(ValveId::A, Off), (ValveId::B, Off), (ValveId::C, Off)]
    );
}

#[test]
fn loop_train_blocks_for_its_full_duration() {
    let mut seq = PulseSequencer::new(ModeController::new(RecordingActuator::new()), ThreadSleeper);
    let timer = Timer::start("three pulses");
    let report = seq.send_pulses_loop_a(&LoopPulseTrain::new(3, s(0.1))).unwrap();
    assert!(timer.elapsed_s() >= 0.3);
    assert_eq!(report.pulses, 3);

    let (ctl, _) = seq.into_parts();
    let cmds = ctl.into_actuator().commands();
    assert_eq!(cmds.len(), 6);
    assert_eq!(cmds[3..], [(ValveId::A, On); 3]);
}
