//! Heating and cooling events: write a ramp, then poll until the furnace
//! reaches the setpoint or the event runs out of time.

use std::time::Duration;

use fc_core::Sleeper;
use tracing::{info, warn};

use crate::error::ThermalError;
use crate::eurotherm::{TemperatureController, ThermalSnapshot};

pub const POLL_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_MAX_DURATION: Duration = Duration::from_secs(600);

/// Setpoint and rate the furnace is parked at when an experiment ends.
pub const FINISH_SETPOINT: f64 = 20.0;
pub const FINISH_RATE: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RampDirection {
    Heating,
    Cooling,
}

impl RampDirection {
    /// Direction needed to move from `current` to `setpoint`.
    pub fn toward(current: f64, setpoint: f64) -> Self {
        if current > setpoint {
            RampDirection::Cooling
        } else {
            RampDirection::Heating
        }
    }

    fn reached(self, snap: &ThermalSnapshot) -> bool {
        match self {
            RampDirection::Heating => snap.thermocouple >= snap.working_setpoint,
            RampDirection::Cooling => snap.thermocouple <= snap.working_setpoint,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ramp {
    /// degC/min.
    pub rate: f64,
    /// degC.
    pub setpoint: f64,
    pub max_duration: Duration,
}

impl Ramp {
    pub fn new(rate: f64, setpoint: f64) -> Self {
        Self {
            rate,
            setpoint,
            max_duration: DEFAULT_MAX_DURATION,
        }
    }

    pub fn with_max_duration(mut self, max_duration: Duration) -> Self {
        self.max_duration = max_duration;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RampOutcome {
    Reached { snapshot: ThermalSnapshot, polls: u32 },
    TimedOut { snapshot: ThermalSnapshot, polls: u32 },
}

impl RampOutcome {
    pub fn snapshot(&self) -> &ThermalSnapshot {
        match self {
            RampOutcome::Reached { snapshot, .. } | RampOutcome::TimedOut { snapshot, .. } => {
                snapshot
            }
        }
    }
}

/// Run one ramp event in the given direction.
///
/// `on_poll` sees every snapshot taken while the setpoint is not yet
/// reached; its error aborts the event. Elapsed time is counted in poll
/// intervals.
pub fn run_ramp<T, S, E, F>(
    controller: &mut T,
    sleeper: &mut S,
    direction: RampDirection,
    ramp: &Ramp,
    mut on_poll: F,
) -> Result<RampOutcome, E>
where
    T: TemperatureController + ?Sized,
    S: Sleeper + ?Sized,
    E: From<ThermalError>,
    F: FnMut(&ThermalSnapshot) -> Result<(), E>,
{
    controller.write_heating_rate(ramp.rate)?;
    controller.write_setpoint(ramp.setpoint)?;
    info!(?direction, "Ramping to {:.1} degC at {:.1} degC/min", ramp.setpoint, ramp.rate);

    let mut elapsed = Duration::ZERO;
    let mut polls = 0;
    loop {
        let snapshot = controller.snapshot()?;
        polls += 1;
        if direction.reached(&snapshot) {
            info!("{:.1} degC setpoint reached", snapshot.working_setpoint);
            return Ok(RampOutcome::Reached { snapshot, polls });
        }
        on_poll(&snapshot)?;
        if elapsed > ramp.max_duration {
            warn!(
                "Max duration of {} s exceeded, ending ramp at {:.1} degC",
                ramp.max_duration.as_secs(),
                snapshot.thermocouple
            );
            return Ok(RampOutcome::TimedOut { snapshot, polls });
        }
        sleeper.sleep(POLL_INTERVAL);
        elapsed += POLL_INTERVAL;
    }
}

/// Heat or cool toward the ramp setpoint, whichever the current
/// thermocouple reading calls for.
pub fn ramp_to<T, S, E, F>(
    controller: &mut T,
    sleeper: &mut S,
    ramp: &Ramp,
    on_poll: F,
) -> Result<RampOutcome, E>
where
    T: TemperatureController + ?Sized,
    S: Sleeper + ?Sized,
    E: From<ThermalError>,
    F: FnMut(&ThermalSnapshot) -> Result<(), E>,
{
    let current = controller.read_thermocouple()?;
    let direction = RampDirection::toward(current, ramp.setpoint);
    run_ramp(controller, sleeper, direction, ramp, on_poll)
}

/// Park the furnace at room temperature without waiting.
pub fn finish_experiment<T: TemperatureController + ?Sized>(
    controller: &mut T,
) -> Result<(), ThermalError> {
    controller.write_setpoint(FINISH_SETPOINT)?;
    controller.write_heating_rate(FINISH_RATE)?;
    info!("Setpoint {FINISH_SETPOINT:.1} degC at {FINISH_RATE:.1} degC/min");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eurotherm::{PidPreset, PidTerms};
    use crate::error::ThermalResult;

    /// Furnace that moves `step` degC toward the setpoint on every
    /// thermocouple read.
    #[derive(Debug)]
    struct DriftingFurnace {
        temperature: f64,
        setpoint: f64,
        rate: f64,
        step: f64,
    }

    impl DriftingFurnace {
        fn at(temperature: f64, step: f64) -> Self {
            Self {
                temperature,
                setpoint: temperature,
                rate: 0.0,
                step,
            }
        }
    }

    impl TemperatureController for DriftingFurnace {
        fn read_thermocouple(&mut self) -> ThermalResult<f64> {
            let t = self.temperature;
            let delta = (self.setpoint - self.temperature).clamp(-self.step, self.step);
            self.temperature += delta;
            Ok(t)
        }
        fn read_working_setpoint(&mut self) -> ThermalResult<f64> {
            Ok(self.setpoint)
        }
        fn read_programmer_temperature(&mut self) -> ThermalResult<f64> {
            Ok(self.setpoint)
        }
        fn read_heating_rate(&mut self) -> ThermalResult<f64> {
            Ok(self.rate)
        }
        fn read_output_power(&mut self) -> ThermalResult<f64> {
            Ok(50.0)
        }
        fn write_setpoint(&mut self, celsius: f64) -> ThermalResult<()> {
            self.setpoint = celsius;
            Ok(())
        }
        fn write_heating_rate(&mut self, celsius_per_min: f64) -> ThermalResult<()> {
            self.rate = celsius_per_min;
            Ok(())
        }
        fn apply_pid(&mut self, _preset: PidPreset) -> ThermalResult<PidTerms> {
            Err(ThermalError::Transport {
                what: "not wired".to_string(),
            })
        }
    }

    #[derive(Debug, Default)]
    struct Ticks(Vec<Duration>);

    impl Sleeper for Ticks {
        fn sleep(&mut self, duration: Duration) {
            self.0.push(duration);
        }
    }

    #[test]
    fn heating_polls_until_setpoint() {
        let mut furnace = DriftingFurnace::at(100.0, 50.0);
        let mut ticks = Ticks::default();
        let mut seen = Vec::new();
        let outcome = run_ramp(
            &mut furnace,
            &mut ticks,
            RampDirection::Heating,
            &Ramp::new(5.0, 250.0),
            |snap: &ThermalSnapshot| -> ThermalResult<()> {
                seen.push(snap.thermocouple);
                Ok(())
            },
        )
        .unwrap();
        assert!(matches!(outcome, RampOutcome::Reached { polls: 4, .. }));
        assert_eq!(seen, vec![100.0, 150.0, 200.0]);
        assert_eq!(ticks.0, vec![POLL_INTERVAL; 3]);
        assert_eq!(furnace.rate, 5.0);
    }

    #[test]
    fn ramp_times_out_after_max_duration() {
        let mut furnace = DriftingFurnace::at(25.0, 0.0);
        let mut ticks = Ticks::default();
        let ramp = Ramp::new(2.0, 400.0).with_max_duration(Duration::from_secs(3));
        let outcome = run_ramp(&mut furnace, &mut ticks, RampDirection::Heating, &ramp, |_| {
            ThermalResult::Ok(())
        })
        .unwrap();
        assert!(matches!(outcome, RampOutcome::TimedOut { polls: 5, .. }));
        assert_eq!(outcome.snapshot().thermocouple, 25.0);
        assert_eq!(ticks.0.len(), 4);
    }

    #[test]
    fn ramp_to_picks_cooling_when_above_setpoint() {
        let mut furnace = DriftingFurnace::at(300.0, 100.0);
        let mut ticks = Ticks::default();
        let outcome = ramp_to(&mut furnace, &mut ticks, &Ramp::new(10.0, 150.0), |_| {
            ThermalResult::Ok(())
        })
        .unwrap();
        assert!(matches!(outcome, RampOutcome::Reached { .. }));
        assert!(outcome.snapshot().thermocouple <= 150.0);
        assert_eq!(RampDirection::toward(20.0, 150.0), RampDirection::Heating);
    }

    #[test]
    fn poll_callback_error_aborts_the_ramp() {
        let mut furnace = DriftingFurnace::at(25.0, 1.0);
        let mut ticks = Ticks::default();
        let result = run_ramp(
            &mut furnace,
            &mut ticks,
            RampDirection::Heating,
            &Ramp::new(5.0, 100.0),
            |_| {
                Err(ThermalError::Transport {
                    what: "pressure gauge".to_string(),
                })
            },
        );
        assert!(matches!(result, Err(ThermalError::Transport { .. })));
        assert!(ticks.0.is_empty());
    }

    #[test]
    fn finish_parks_at_room_temperature() {
        let mut furnace = DriftingFurnace::at(400.0, 1.0);
        finish_experiment(&mut furnace).unwrap();
        assert_eq!(furnace.setpoint, FINISH_SETPOINT);
        assert_eq!(furnace.rate, FINISH_RATE);
    }
}
