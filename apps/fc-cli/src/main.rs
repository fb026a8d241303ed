mod logging;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use fc_app::{AppResult, HardwareRig, flow_binding, thermal_binding, valve_bus};
use fc_config::{GasCatalog, IoConfig, incomplete_pairs, load_gas_catalog, load_io_config};
use fc_core::{ValveId, s};
use fc_modes::{LoopPulseStrategy, LoopPulseTrain, Mode, ValvePulseTrain, ValveSetOutcome};
use fc_thermal::{PidPreset, Ramp, RampOutcome};
use tracing::error;

#[derive(Parser)]
#[command(name = "fasstcat")]
#[command(about = "Valve-mode and pulse control for the catalytic testing rig", long_about = None)]
struct Cli {
    /// Instrument I/O record
    #[arg(short, long, global = true, default_value = fc_config::DEFAULT_CONFIG_FILE)]
    config: PathBuf,
    /// Gas catalog
    #[arg(short, long, global = true, default_value = fc_config::DEFAULT_GASES_FILE)]
    gases: PathBuf,
    /// Directory searched for config/ and demos/
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Switch the reaction-mode valves to a named mode
    Mode {
        mode: ModeArg,
        /// Skip the mode description
        #[arg(short, long)]
        quiet: bool,
    },
    /// Set one mode valve from an ON/OFF token
    Valve {
        #[arg(value_parser = parse_valve)]
        valve: ValveId,
        token: String,
    },
    /// Dual-loop pulse train
    PulsesLoop {
        baseline: LoopArg,
        #[arg(long)]
        count: u32,
        /// Seconds between pulses
        #[arg(long)]
        period: f64,
        /// Flip the pulses-line valve every pulse instead of re-asserting ON
        #[arg(long)]
        alternate: bool,
    },
    /// Single-valve pulse train
    PulsesValve {
        #[arg(long)]
        count: u32,
        /// Seconds the valve stays open, before dead-volume compensation
        #[arg(long)]
        open: f64,
        /// Seconds between pulses
        #[arg(long)]
        period: f64,
    },
    /// Read valve positions back from the manifold
    Positions {
        #[arg(value_parser = parse_valve)]
        valve: Option<ValveId>,
    },
    /// Route a catalog gas through its selector valve
    Feed { gas: String },
    /// Poll the furnace controller
    Temperature,
    /// Write the furnace setpoint in degC
    Setpoint {
        celsius: f64,
        /// Heating rate in degC/min
        #[arg(long)]
        rate: Option<f64>,
    },
    /// Ramp the furnace to a setpoint and wait for it
    Ramp {
        celsius: f64,
        /// Heating or cooling rate in degC/min
        #[arg(long)]
        rate: f64,
        /// Give up after this many seconds
        #[arg(long)]
        max_duration: Option<u64>,
    },
    /// Park the furnace at room temperature
    Finish,
    /// Load a PID tuning preset into the furnace controller
    Pid { preset: PidArg },
    /// Meter one gas, in sccm
    Flow { gas: String, sccm: f64 },
    /// Apply a gas mixture given as GAS=SCCM pairs; other controllers are zeroed
    Mix {
        #[arg(value_parser = parse_gas_flow, required = true)]
        flows: Vec<(String, f64)>,
    },
    /// Measured flows, setpoints and concentrations per line
    FlowStatus,
    /// Line pressures
    Pressure,
    /// List the gas catalog
    Gases,
    /// Validate configuration and show the transports it selects
    Check,
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    ContA,
    ContB,
    LoopA,
    LoopB,
}

impl From<ModeArg> for Mode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::ContA => Mode::ContinuousA,
            ModeArg::ContB => Mode::ContinuousB,
            ModeArg::LoopA => Mode::PulsesLoopA,
            ModeArg::LoopB => Mode::PulsesLoopB,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum LoopArg {
    A,
    B,
}

#[derive(Clone, Copy, ValueEnum)]
enum PidArg {
    Mantis,
    ClausenLocal,
    ClausenRemote,
}

impl From<PidArg> for PidPreset {
    fn from(arg: PidArg) -> Self {
        match arg {
            PidArg::Mantis => PidPreset::MantisDrifts,
            PidArg::ClausenLocal => PidPreset::ClausenCoilLocal,
            PidArg::ClausenRemote => PidPreset::ClausenCoilRemote,
        }
    }
}

fn parse_gas_flow(s: &str) -> Result<(String, f64), String> {
    let (gas, flow) = s
        .split_once('=')
        .ok_or_else(|| format!("'{s}' is not GAS=SCCM"))?;
    let flow = flow
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("'{flow}': {e}"))?;
    Ok((gas.trim().to_string(), flow))
}

fn parse_valve(s: &str) -> Result<ValveId, String> {
    ValveId::parse(s).ok_or_else(|| format!("'{s}' is not a valve letter A-I"))
}

fn main() -> ExitCode {
    logging::init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> AppResult<()> {
    let (io, gases) = load(&cli.config, &cli.gases, &cli.root)?;
    match cli.command {
        Commands::Gases => cmd_gases(&gases),
        Commands::Check => cmd_check(&io, &gases),
        command => {
            let mut rig = HardwareRig::connect(&io, gases)?;
            dispatch(&mut rig, command)
        }
    }
}

fn load(config: &Path, gases: &Path, root: &Path) -> AppResult<(IoConfig, GasCatalog)> {
    let (config_path, gases_path) = fc_config::resolve_config_files(config, gases, root)?;
    Ok((load_io_config(&config_path)?, load_gas_catalog(&gases_path)?))
}

fn dispatch(rig: &mut HardwareRig, command: Commands) -> AppResult<()> {
    match command {
        Commands::Mode { mode, quiet } => rig.enter(mode.into(), !quiet),
        Commands::Valve { valve, token } => {
            if let ValveSetOutcome::Ignored = rig.set_mode_valve(valve, &token)? {
                println!("Token '{token}' not recognised; valve {valve} unchanged (use ON or OFF)");
            }
            Ok(())
        }
        Commands::PulsesLoop {
            baseline,
            count,
            period,
            alternate,
        } => {
            if alternate {
                rig.set_loop_strategy(LoopPulseStrategy::Alternate);
            }
            let train = LoopPulseTrain::new(count, s(period));
            let report = match baseline {
                LoopArg::A => rig.send_pulses_loop_a(&train)?,
                LoopArg::B => rig.send_pulses_loop_b(&train)?,
            };
            println!("{} pulses, {} valve commands", report.pulses, report.commands);
            Ok(())
        }
        Commands::PulsesValve {
            count,
            open,
            period,
        } => {
            let report = rig.send_pulses_valve_a(&ValvePulseTrain::new(count, s(open), s(period)))?;
            println!("{} pulses, {} valve commands", report.pulses, report.commands);
            Ok(())
        }
        Commands::Positions { valve } => {
            let positions = match valve {
                Some(v) => vec![(v, rig.position(v)?)],
                None => rig.positions()?,
            };
            for (v, p) in positions {
                match p {
                    Some(p) => println!("  {v}: {p} ({})", v.role()),
                    None => println!("  {v}: unknown ({})", v.role()),
                }
            }
            Ok(())
        }
        Commands::Feed { gas } => {
            let (valve, position) = rig.feed_gas(&gas)?;
            println!("✓ {gas} via valve {valve} {position}");
            Ok(())
        }
        Commands::Temperature => {
            println!("{}", rig.temperature()?);
            Ok(())
        }
        Commands::Setpoint { celsius, rate } => {
            if let Some(rate) = rate {
                rig.write_heating_rate(rate)?;
            }
            rig.write_setpoint(celsius)
        }
        Commands::Ramp {
            celsius,
            rate,
            max_duration,
        } => {
            let mut ramp = Ramp::new(rate, celsius);
            if let Some(secs) = max_duration {
                ramp = ramp.with_max_duration(Duration::from_secs(secs));
            }
            match rig.ramp(&ramp)? {
                RampOutcome::Reached { snapshot, .. } => println!("✓ {snapshot}"),
                RampOutcome::TimedOut { snapshot, .. } => println!("timed out: {snapshot}"),
            }
            Ok(())
        }
        Commands::Finish => rig.finish_experiment(),
        Commands::Pid { preset } => {
            let preset = PidPreset::from(preset);
            let terms = rig.apply_pid(preset)?;
            println!("{terms} ({} power output)", preset.power_output());
            Ok(())
        }
        Commands::Flow { gas, sccm } => {
            let sp = rig.set_flowrate(&gas, sccm)?;
            println!("✓ {gas}: {:.2} sccm on node {} (raw {})", sp.converted, sp.node, sp.raw);
            Ok(())
        }
        Commands::Mix { flows } => {
            let applied = rig.setpoints(&flows)?;
            println!("✓ {} controllers set", applied.len());
            Ok(())
        }
        Commands::FlowStatus => {
            println!("{}", rig.flow_status()?);
            Ok(())
        }
        Commands::Pressure => {
            println!("{}", rig.pressure_report()?);
            Ok(())
        }
        Commands::Gases | Commands::Check => Ok(()),
    }
}

fn cmd_gases(gases: &GasCatalog) -> AppResult<()> {
    if gases.is_empty() {
        println!("No gases in catalog");
        return Ok(());
    }
    println!("Gases:");
    for name in gases.names() {
        let Some(gas) = gases.get(name) else {
            continue;
        };
        match gas.valve_settings {
            Some((valve, position)) => println!("  {name} - valve {valve} {position}"),
            None => println!("  {name} - not routed"),
        }
    }
    Ok(())
}

fn cmd_check(io: &IoConfig, gases: &GasCatalog) -> AppResult<()> {
    for issue in incomplete_pairs(io) {
        println!("  warning: {issue}");
    }
    println!("Valve bus: {:?}", valve_bus(io)?);
    println!("Temperature controller: {:?}", thermal_binding(io)?);
    println!("Flow controllers: {:?}", flow_binding(io)?);
    println!("✓ Configuration is valid ({} gases)", gases.len());
    Ok(())
}
