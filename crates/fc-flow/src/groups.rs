//! Gases sharing one controller on one mixing line.
//!
//! Each group is metered by a single controller: only one of its gases can
//! flow at a time, selected through the calibration table.

use std::fmt;

use fc_config::GasCatalog;
use tracing::{debug, warn};

use crate::error::{FlowError, FlowResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Line {
    A,
    B,
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Line::A => f.write_str("A"),
            Line::B => f.write_str("B"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasGroup {
    pub line: Line,
    /// Gas the controller is zeroed on when nothing in the group is requested.
    pub primary: &'static str,
    pub alternates: &'static [&'static str],
}

impl GasGroup {
    pub fn options(&self) -> impl Iterator<Item = &'static str> + '_ {
        std::iter::once(self.primary).chain(self.alternates.iter().copied())
    }

    pub fn contains(&self, gas: &str) -> bool {
        self.options().any(|g| g == gas)
    }
}

const fn group(line: Line, primary: &'static str, alternates: &'static [&'static str]) -> GasGroup {
    GasGroup {
        line,
        primary,
        alternates,
    }
}

pub static GAS_GROUPS: [GasGroup; 10] = [
    group(Line::A, "H2_A", &["D2_A"]),
    group(Line::B, "H2_B", &["D2_B"]),
    group(Line::A, "O2_A", &[]),
    group(Line::B, "O2_B", &[]),
    group(Line::A, "CH4_A", &["C2H6_A", "C3H8_A"]),
    group(Line::B, "CH4_B", &["C2H6_B", "C3H8_B"]),
    group(Line::A, "CO_AH", &["CO2_AH", "CO_AL", "CO2_AL"]),
    group(Line::B, "CO_BH", &["CO2_BH", "CO_BL", "CO2_BL"]),
    group(Line::A, "He_A", &["Ar_A", "N2_A"]),
    group(Line::B, "He_B", &["Ar_B", "N2_B"]),
];

pub fn group_of(gas: &str) -> Option<&'static GasGroup> {
    GAS_GROUPS.iter().find(|g| g.contains(gas))
}

/// Resolve a set of requested flows into one setpoint per controller.
///
/// The first requested gas of a group (in group order) is set; groups
/// without a request are zeroed on their primary gas. Groups whose primary
/// gas is missing from the catalog are left alone.
pub fn plan_setpoints(
    catalog: &GasCatalog,
    requests: &[(String, f64)],
) -> FlowResult<Vec<(&'static str, f64)>> {
    for (gas, _) in requests {
        if catalog.get(gas).is_none() {
            return Err(FlowError::UnknownGas(gas.clone()));
        }
        if group_of(gas).is_none() {
            return Err(FlowError::NotOnLine(gas.clone()));
        }
    }

    let requested = |gas: &str| {
        requests
            .iter()
            .find(|(name, _)| name == gas)
            .map(|(_, flow)| *flow)
    };

    let mut plan = Vec::with_capacity(GAS_GROUPS.len());
    for group in &GAS_GROUPS {
        let mut chosen = group
            .options()
            .filter_map(|gas| requested(gas).map(|flow| (gas, flow)));
        match chosen.next() {
            Some(setpoint) => {
                for (ignored, _) in chosen {
                    warn!(
                        "{ignored} shares a controller with {}, request ignored",
                        setpoint.0
                    );
                }
                plan.push(setpoint);
            }
            None if catalog.get(group.primary).is_some() => plan.push((group.primary, 0.0)),
            None => debug!(group = group.primary, "group not in catalog"),
        }
    }
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fc_config::GasDef;

    fn catalog(names: &[&str]) -> GasCatalog {
        let mut catalog = GasCatalog::default();
        for name in names {
            catalog.gases.insert(name.to_string(), GasDef::default());
        }
        catalog
    }

    fn req(items: &[(&str, f64)]) -> Vec<(String, f64)> {
        items.iter().map(|(g, f)| (g.to_string(), *f)).collect()
    }

    #[test]
    fn every_gas_belongs_to_one_group() {
        let mut seen = Vec::new();
        for group in &GAS_GROUPS {
            for gas in group.options() {
                assert!(!seen.contains(&gas), "{gas} listed twice");
                seen.push(gas);
            }
        }
        assert_eq!(group_of("Ar_B").map(|g| g.line), Some(Line::B));
        assert_eq!(group_of("CO2_AL").map(|g| g.primary), Some("CO_AH"));
        assert!(group_of("Xe_A").is_none());
    }

    #[test]
    fn unrequested_groups_are_zeroed_on_their_primary() {
        let cat = catalog(&["H2_A", "D2_A", "O2_A", "He_B", "Ar_B"]);
        let plan = plan_setpoints(&cat, &req(&[("D2_A", 5.0), ("Ar_B", 20.0)])).unwrap();
        assert_eq!(plan, vec![("D2_A", 5.0), ("O2_A", 0.0), ("Ar_B", 20.0)]);
    }

    #[test]
    fn group_order_decides_between_requests_on_one_controller() {
        let cat = catalog(&["He_A", "Ar_A", "N2_A"]);
        let plan = plan_setpoints(&cat, &req(&[("N2_A", 3.0), ("Ar_A", 4.0)])).unwrap();
        assert_eq!(plan, vec![("Ar_A", 4.0)]);
    }

    #[test]
    fn unknown_or_ungrouped_gases_are_rejected() {
        let cat = catalog(&["H2_A", "Kr_X"]);
        assert!(matches!(
            plan_setpoints(&cat, &req(&[("Xe_A", 1.0)])),
            Err(FlowError::UnknownGas(_))
        ));
        assert!(matches!(
            plan_setpoints(&cat, &req(&[("Kr_X", 1.0)])),
            Err(FlowError::NotOnLine(_))
        ));
    }
}
