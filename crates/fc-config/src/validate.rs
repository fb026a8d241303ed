//! Catalog and I/O record validation.

use crate::schema::{GasCatalog, GasDef, IoConfig};

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Incomplete pair: {present} is set but {missing} is not")]
    IncompletePair {
        present: &'static str,
        missing: &'static str,
    },
}

fn invalid(gas: &str, field: &str, value: impl ToString, reason: &str) -> ValidationError {
    ValidationError::InvalidValue {
        field: format!("{gas}.{field}"),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

pub fn validate_catalog(catalog: &GasCatalog) -> Result<(), ValidationError> {
    for (name, gas) in &catalog.gases {
        validate_gas(name, gas)?;
    }
    Ok(())
}

fn validate_gas(name: &str, gas: &GasDef) -> Result<(), ValidationError> {
    if let Some([lo, hi]) = gas.flow_range {
        if !lo.is_finite() || !hi.is_finite() {
            return Err(invalid(name, "flow_range", format!("[{lo}, {hi}]"), "must be finite"));
        }
        if lo < 0.0 || lo > hi {
            return Err(invalid(
                name,
                "flow_range",
                format!("[{lo}, {hi}]"),
                "must satisfy 0 <= low <= high",
            ));
        }
    }
    if let Some(f) = gas.cal_factor {
        if !f.is_finite() || f <= 0.0 {
            return Err(invalid(name, "cal_factor", f, "must be positive"));
        }
    }
    if let Some(f) = gas.float_to_int_factor {
        if !f.is_finite() || f <= 0.0 {
            return Err(invalid(name, "float_to_int_factor", f, "must be positive"));
        }
    }
    Ok(())
}

/// Host/port halves set without their partner. Such a half is ignored and
/// the instrument falls back to its serial port.
pub fn incomplete_pairs(io: &IoConfig) -> Vec<ValidationError> {
    let pairs = [
        (io.host_euro.is_some(), "HOST_EURO", io.port_euro.is_some(), "PORT_EURO"),
        (io.host_moxa.is_some(), "HOST_MOXA", io.port_valves.is_some(), "PORT_VALVES"),
    ];
    let mut issues: Vec<ValidationError> = pairs
        .into_iter()
        .filter_map(|(has_host, host, has_port, port)| match (has_host, has_port) {
            (true, false) => Some(ValidationError::IncompletePair {
                present: host,
                missing: port,
            }),
            (false, true) => Some(ValidationError::IncompletePair {
                present: port,
                missing: host,
            }),
            _ => None,
        })
        .collect();
    // HOST_MOXA alone is fine here: it may only carry the valve bus.
    if io.port_mfc.is_some() && io.host_moxa.is_none() {
        issues.push(ValidationError::IncompletePair {
            present: "PORT_MFC",
            missing: "HOST_MOXA",
        });
    }
    issues
}
