//! Conversion of a requested flow into a controller setpoint.

use fc_config::GasDef;

use crate::error::{FlowError, FlowResult};
use crate::mfc::FULL_SCALE;

/// A setpoint ready to be written to one controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlowSetpoint {
    pub node: u8,
    pub cal_id: Option<u8>,
    /// Requested flow divided by the gas calibration factor.
    pub converted: f64,
    pub raw: u16,
}

impl FlowSetpoint {
    /// Whether the gas is actually fed, so its selector valve must be set.
    pub fn feeds(&self) -> bool {
        self.converted > 0.0
    }
}

fn required<T: Copy>(gas: &str, value: Option<T>, field: &'static str) -> FlowResult<T> {
    value.ok_or_else(|| FlowError::Incomplete {
        gas: gas.to_string(),
        field,
    })
}

/// Divide by the calibration factor, check against the controller range and
/// scale to the raw 0..=32000 setpoint. A zero flow skips the range check.
pub fn convert_setpoint(name: &str, gas: &GasDef, flow: f64) -> FlowResult<FlowSetpoint> {
    let node = required(name, gas.node_id, "node_id")?;
    if flow == 0.0 {
        return Ok(FlowSetpoint {
            node,
            cal_id: gas.cal_id,
            converted: 0.0,
            raw: 0,
        });
    }

    let cal_factor = required(name, gas.cal_factor, "cal_factor")?;
    let [low, high] = required(name, gas.flow_range, "flow_range")?;
    let float_to_int = required(name, gas.float_to_int_factor, "float_to_int_factor")?;

    let converted = flow / cal_factor;
    let out_of_range = || FlowError::OutOfRange {
        gas: name.to_string(),
        flow: converted,
        low,
        high,
    };
    if !converted.is_finite() || converted < low || converted > high {
        return Err(out_of_range());
    }
    let raw = (converted * FULL_SCALE / float_to_int).trunc();
    if raw > u16::MAX as f64 {
        return Err(out_of_range());
    }
    Ok(FlowSetpoint {
        node,
        cal_id: gas.cal_id,
        converted,
        raw: raw as u16,
    })
}
