//! Serialized shapes of `config.json` and `gases.toml`.

use std::collections::BTreeMap;

use fc_core::{Position, ValveId};
use serde::{Deserialize, Serialize};

/// Instrument addresses. Every key is optional; which ones are present
/// decides the transport each instrument uses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IoConfig {
    /// Modbus TCP gateway for the furnace controller.
    #[serde(rename = "HOST_EURO", default, skip_serializing_if = "Option::is_none")]
    pub host_euro: Option<String>,
    #[serde(rename = "PORT_EURO", default, skip_serializing_if = "Option::is_none")]
    pub port_euro: Option<u16>,

    /// Serial port and slave address of the furnace controller.
    #[serde(rename = "COM_TMP", default, skip_serializing_if = "Option::is_none")]
    pub com_tmp: Option<String>,
    #[serde(rename = "SUB_ADD_TMP", default, skip_serializing_if = "Option::is_none")]
    pub sub_add_tmp: Option<u8>,

    /// Serial device server carrying the valve bus.
    #[serde(rename = "HOST_MOXA", default, skip_serializing_if = "Option::is_none")]
    pub host_moxa: Option<String>,
    #[serde(rename = "PORT_VALVES", default, skip_serializing_if = "Option::is_none")]
    pub port_valves: Option<u16>,

    /// Direct serial port for the valve bus.
    #[serde(rename = "COM_VALVE", default, skip_serializing_if = "Option::is_none")]
    pub com_valve: Option<String>,

    /// Device-server port for the mass-flow controllers, used with `HOST_MOXA`.
    #[serde(rename = "PORT_MFC", default, skip_serializing_if = "Option::is_none")]
    pub port_mfc: Option<u16>,

    /// Direct serial port for the mass-flow controllers.
    #[serde(rename = "COM_MFC", default, skip_serializing_if = "Option::is_none")]
    pub com_mfc: Option<String>,
}

/// One feed gas as wired to a mass-flow controller and selector valve.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GasDef {
    /// Propar node of the controller that meters this gas.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<u8>,
    /// Calibration table selected before the setpoint is written.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cal_id: Option<u8>,
    /// `[low, high]` in the controller's flow unit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow_range: Option<[f64; 2]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cal_factor: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub float_to_int_factor: Option<f64>,
    /// Selector valve and position that route this gas, e.g. `["E", "ON"]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valve_settings: Option<(ValveId, Position)>,
}

/// Gas name to definition, in name order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GasCatalog {
    pub gases: BTreeMap<String, GasDef>,
}

impl GasCatalog {
    pub fn get(&self, name: &str) -> Option<&GasDef> {
        self.gases.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.gases.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.gases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gases.is_empty()
    }
}
