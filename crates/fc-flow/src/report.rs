//! Flow and line-pressure reports.

use std::fmt;

use fc_config::GasCatalog;

use crate::error::FlowResult;
use crate::groups::{GAS_GROUPS, GasGroup, Line};
use crate::mfc::{FlowController, PRESSURE_NODE_A, PRESSURE_NODE_B};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PressureReport {
    /// psia.
    pub line_a: f64,
    /// psia.
    pub line_b: f64,
}

impl fmt::Display for PressureReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Pressure in line A = {:.2} psia", self.line_a)?;
        write!(f, "Pressure in line B = {:.2} psia", self.line_b)
    }
}

pub fn pressure_report<F: FlowController + ?Sized>(flow: &mut F) -> FlowResult<PressureReport> {
    Ok(PressureReport {
        line_a: flow.read_pressure(PRESSURE_NODE_A)?,
        line_b: flow.read_pressure(PRESSURE_NODE_B)?,
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChannelStatus {
    pub line: Line,
    /// Gas selected by the controller's active calibration.
    pub gas: &'static str,
    pub measured: f64,
    pub setpoint: f64,
    /// Share of the line's measured total, percent.
    pub concentration: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlowReport {
    pub channels: Vec<ChannelStatus>,
    pub pressure: PressureReport,
}

impl FlowReport {
    /// Measured flow summed over one line, sccm.
    pub fn total(&self, line: Line) -> f64 {
        self.channels
            .iter()
            .filter(|c| c.line == line)
            .map(|c| c.measured)
            .sum()
    }
}

impl fmt::Display for FlowReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Flow Report ---")?;
        for c in self.channels.iter().filter(|c| c.setpoint != 0.0) {
            write!(
                f,
                "{}: measured flow is {:.2} sccm, flow setpoint is {:.2} sccm",
                c.gas, c.measured, c.setpoint
            )?;
            if let Some(pct) = c.concentration {
                write!(f, ", concentration is {pct:.1} %")?;
            }
            writeln!(f)?;
        }
        writeln!(f, "Total flow line A: {:.2} sccm", self.total(Line::A))?;
        writeln!(f, "Total flow line B: {:.2} sccm", self.total(Line::B))?;
        writeln!(f, "--- Pressure Report ---")?;
        write!(f, "{}", self.pressure)
    }
}

/// Gas of `group` whose calibration table is `fluid`, else the primary.
fn active_gas(group: &GasGroup, catalog: &GasCatalog, fluid: u8) -> &'static str {
    group
        .options()
        .find(|gas| catalog.get(gas).and_then(|g| g.cal_id) == Some(fluid))
        .unwrap_or(group.primary)
}

/// Read every controller whose group is in the catalog, then both line
/// pressures.
pub fn flow_report<F: FlowController + ?Sized>(
    flow: &mut F,
    catalog: &GasCatalog,
) -> FlowResult<FlowReport> {
    let mut channels = Vec::new();
    for group in &GAS_GROUPS {
        let Some(node) = catalog.get(group.primary).and_then(|g| g.node_id) else {
            continue;
        };
        let reading = flow.read_channel(node)?;
        channels.push(ChannelStatus {
            line: group.line,
            gas: active_gas(group, catalog, reading.fluid),
            measured: reading.measured,
            setpoint: reading.setpoint,
            concentration: None,
        });
    }

    let mut report = FlowReport {
        channels,
        pressure: pressure_report(flow)?,
    };
    let totals = [
        (Line::A, report.total(Line::A)),
        (Line::B, report.total(Line::B)),
    ];
    for c in &mut report.channels {
        let total = totals
            .iter()
            .find(|(line, _)| *line == c.line)
            .map_or(0.0, |(_, t)| *t);
        if total > 0.0 {
            c.concentration = Some(c.measured / total * 100.0);
        }
    }
    Ok(report)
}
