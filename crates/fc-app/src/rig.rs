//! The assembled rig: mode sequencing, furnace control, gas metering and
//! gas routing.

use fc_config::{GasCatalog, IoConfig};
use fc_core::{Position, Sleeper, ThreadSleeper, ValveId};
use fc_flow::{
    FlowController, FlowReport, FlowSetpoint, PressureReport, convert_setpoint, flow_report,
    plan_setpoints, pressure_report,
};
use fc_modes::{
    CommandedState, LoopPulseStrategy, LoopPulseTrain, Mode, ModeController, PulseReport,
    PulseSequencer, ValveActuator, ValvePulseTrain, ValveSetOutcome,
};
use fc_thermal::{
    PidPreset, PidTerms, Ramp, RampOutcome, TemperatureController, ThermalSnapshot,
    finish_experiment, ramp_to,
};
use fc_valves::{Link, ValveBank};
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::wiring::{
    flow_binding, open_flow, open_thermal, open_valve_link, thermal_binding, valve_bus,
};

/// A rig wired to real transports.
pub type HardwareRig = Rig<ValveBank<Box<dyn Link>, ThreadSleeper>, ThreadSleeper>;

pub struct Rig<A, S> {
    sequencer: PulseSequencer<A, S>,
    thermal: Box<dyn TemperatureController>,
    flow: Box<dyn FlowController>,
    gases: GasCatalog,
}

impl<A, S> std::fmt::Debug for Rig<A, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rig")
            .field("gases", &self.gases.len())
            .finish_non_exhaustive()
    }
}

impl HardwareRig {
    /// Open the valve bus, the furnace controller and the flow controllers
    /// described by `io`. Any of them missing from the record is an error,
    /// reported before any port is opened.
    pub fn connect(io: &IoConfig, gases: GasCatalog) -> AppResult<Self> {
        let (bus, furnace, meters) = (valve_bus(io)?, thermal_binding(io)?, flow_binding(io)?);
        let link = open_valve_link(&bus)?;
        let thermal = open_thermal(&furnace)?;
        let flow = open_flow(&meters)?;
        let bank = ValveBank::new(link, ThreadSleeper);
        Ok(Rig::new(
            ModeController::new(bank),
            ThreadSleeper,
            thermal,
            flow,
            gases,
        ))
    }
}

impl<A: ValveActuator, S: Sleeper> Rig<A, S> {
    pub fn new(
        controller: ModeController<A>,
        sleeper: S,
        thermal: Box<dyn TemperatureController>,
        flow: Box<dyn FlowController>,
        gases: GasCatalog,
    ) -> Self {
        Self {
            sequencer: PulseSequencer::new(controller, sleeper),
            thermal,
            flow,
            gases,
        }
    }

    pub fn gases(&self) -> &GasCatalog {
        &self.gases
    }

    pub fn state(&self) -> &CommandedState {
        self.sequencer.controller().state()
    }

    pub fn sequencer(&self) -> &PulseSequencer<A, S> {
        &self.sequencer
    }

    pub fn into_sequencer(self) -> PulseSequencer<A, S> {
        self.sequencer
    }

    pub fn set_loop_strategy(&mut self, strategy: LoopPulseStrategy) {
        self.sequencer.set_strategy(strategy);
    }

    fn controller(&mut self) -> &mut ModeController<A> {
        self.sequencer.controller_mut()
    }

    pub fn enter(&mut self, mode: Mode, verbose: bool) -> AppResult<()> {
        Ok(self.controller().enter(mode, verbose)?)
    }

    pub fn continuous_mode_a(&mut self, verbose: bool) -> AppResult<()> {
        Ok(self.controller().continuous_mode_a(verbose)?)
    }

    pub fn continuous_mode_b(&mut self, verbose: bool) -> AppResult<()> {
        Ok(self.controller().continuous_mode_b(verbose)?)
    }

    pub fn pulses_loop_mode_a(&mut self, verbose: bool) -> AppResult<()> {
        Ok(self.controller().pulses_loop_mode_a(verbose)?)
    }

    pub fn pulses_loop_mode_b(&mut self, verbose: bool) -> AppResult<()> {
        Ok(self.controller().pulses_loop_mode_b(verbose)?)
    }

    /// Set one mode valve from an `"ON"`/`"OFF"` token.
    pub fn set_mode_valve(&mut self, valve: ValveId, token: &str) -> AppResult<ValveSetOutcome> {
        let ctl = self.controller();
        let outcome = match valve {
            ValveId::A => ctl.valve_a(token)?,
            ValveId::B => ctl.valve_b(token)?,
            ValveId::C => ctl.valve_c(token)?,
            other => {
                return Err(AppError::InvalidInput(format!(
                    "valve {other} is not a mode valve"
                )));
            }
        };
        Ok(outcome)
    }

    pub fn send_pulses_loop_a(&mut self, train: &LoopPulseTrain) -> AppResult<PulseReport> {
        Ok(self.sequencer.send_pulses_loop_a(train)?)
    }

    pub fn send_pulses_loop_b(&mut self, train: &LoopPulseTrain) -> AppResult<PulseReport> {
        Ok(self.sequencer.send_pulses_loop_b(train)?)
    }

    pub fn send_pulses_valve_a(&mut self, train: &ValvePulseTrain) -> AppResult<PulseReport> {
        Ok(self.sequencer.send_pulses_valve_a(train)?)
    }

    /// Route a catalog gas by driving its selector valve.
    pub fn feed_gas(&mut self, name: &str) -> AppResult<(ValveId, Position)> {
        let gas = self
            .gases
            .get(name)
            .ok_or_else(|| AppError::UnknownGas(name.to_string()))?;
        let (valve, position) = gas
            .valve_settings
            .ok_or_else(|| AppError::GasNotRouted(name.to_string()))?;
        if ValveId::MODE_VALVES.contains(&valve) {
            return Err(AppError::InvalidInput(format!(
                "gas {name} is routed through mode valve {valve}"
            )));
        }
        self.controller().set_valve(valve, position)?;
        info!("Feeding {name}: valve {valve} {position}");
        Ok((valve, position))
    }

    /// Meter `flow` sccm of a catalog gas.
    ///
    /// A positive flow of a routed gas drives its selector valve before the
    /// setpoint is written. An out-of-range flow issues nothing.
    pub fn set_flowrate(&mut self, name: &str, flow: f64) -> AppResult<FlowSetpoint> {
        let gas = self
            .gases
            .get(name)
            .ok_or_else(|| AppError::UnknownGas(name.to_string()))?;
        let setpoint = convert_setpoint(name, gas, flow)?;
        let routed = gas.valve_settings.is_some();

        if setpoint.feeds() && routed {
            self.feed_gas(name)?;
        }
        self.flow
            .write_flow(setpoint.node, setpoint.cal_id, setpoint.raw)?;
        info!("{name} flow setpoint {flow:.2} sccm");
        Ok(setpoint)
    }

    /// Apply a whole gas mixture: one setpoint per controller, every
    /// controller not named zeroed.
    pub fn setpoints(&mut self, requests: &[(String, f64)]) -> AppResult<Vec<FlowSetpoint>> {
        let plan = plan_setpoints(&self.gases, requests)?;
        plan.into_iter()
            .map(|(gas, flow)| self.set_flowrate(gas, flow))
            .collect()
    }

    pub fn flow_status(&mut self) -> AppResult<FlowReport> {
        Ok(flow_report(self.flow.as_mut(), &self.gases)?)
    }

    pub fn pressure_report(&mut self) -> AppResult<PressureReport> {
        Ok(pressure_report(self.flow.as_mut())?)
    }

    pub fn temperature(&mut self) -> AppResult<ThermalSnapshot> {
        Ok(self.thermal.snapshot()?)
    }

    pub fn write_setpoint(&mut self, celsius: f64) -> AppResult<()> {
        Ok(self.thermal.write_setpoint(celsius)?)
    }

    pub fn write_heating_rate(&mut self, celsius_per_min: f64) -> AppResult<()> {
        Ok(self.thermal.write_heating_rate(celsius_per_min)?)
    }

    pub fn apply_pid(&mut self, preset: PidPreset) -> AppResult<PidTerms> {
        let terms = self.thermal.apply_pid(preset)?;
        info!("PID preset {preset:?}: {terms}");
        Ok(terms)
    }

    /// Heat or cool to the ramp setpoint, reporting the line pressures on
    /// every poll. Pauses go through the rig's sleeper.
    pub fn ramp(&mut self, ramp: &Ramp) -> AppResult<RampOutcome> {
        let Self {
            sequencer,
            thermal,
            flow,
            ..
        } = self;
        ramp_to(
            thermal.as_mut(),
            sequencer.sleeper_mut(),
            ramp,
            |snapshot: &ThermalSnapshot| -> AppResult<()> {
                info!("{snapshot}");
                let pressure = pressure_report(flow.as_mut())?;
                info!(line_a = pressure.line_a, line_b = pressure.line_b, "line pressure (psia)");
                Ok(())
            },
        )
    }

    pub fn finish_experiment(&mut self) -> AppResult<()> {
        Ok(finish_experiment(self.thermal.as_mut())?)
    }
}

impl<L: Link, B: Sleeper, S: Sleeper> Rig<ValveBank<L, B>, S> {
    /// Read back every valve position from the manifold.
    pub fn positions(&mut self) -> AppResult<Vec<(ValveId, Option<Position>)>> {
        Ok(self.controller().actuator_mut().positions()?)
    }

    pub fn position(&mut self, valve: ValveId) -> AppResult<Option<Position>> {
        Ok(self.controller().actuator_mut().position(valve)?)
    }
}
