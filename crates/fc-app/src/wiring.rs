//! Transport selection from the I/O record, decided once at construction.

use fc_config::{ConfigError, IoConfig, convert_com_port};
use fc_core::ThreadSleeper;
use fc_flow::{FlowController, FlowSms, ProparSerialClient, ProparTcpClient};
use fc_thermal::{Eurotherm, ModbusRtuClient, ModbusTcpClient, TemperatureController};
use fc_valves::{Link, SerialLink, TcpLink};
use tracing::info;

use crate::error::AppResult;

/// Where the valve bus lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValveBus {
    Network { host: String, port: u16 },
    Serial { port: String },
}

/// Where the furnace controller lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThermalBinding {
    Network { host: String, port: u16 },
    Serial { port: String, sub_address: u8 },
}

/// Where the mass-flow controllers live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowBinding {
    Network { host: String, port: u16 },
    Serial { port: String },
}

/// `HOST_MOXA` + `PORT_VALVES` select the device server, otherwise `COM_VALVE`.
pub fn valve_bus(io: &IoConfig) -> AppResult<ValveBus> {
    if let (Some(host), Some(port)) = (&io.host_moxa, io.port_valves) {
        return Ok(ValveBus::Network {
            host: host.clone(),
            port,
        });
    }
    let com = io
        .com_valve
        .as_deref()
        .ok_or(ConfigError::MissingKey("COM_VALVE"))?;
    Ok(ValveBus::Serial {
        port: convert_com_port(com),
    })
}

/// `HOST_EURO` + `PORT_EURO` select Modbus TCP, otherwise RTU on `COM_TMP`.
pub fn thermal_binding(io: &IoConfig) -> AppResult<ThermalBinding> {
    if let (Some(host), Some(port)) = (&io.host_euro, io.port_euro) {
        return Ok(ThermalBinding::Network {
            host: host.clone(),
            port,
        });
    }
    let com = io
        .com_tmp
        .as_deref()
        .ok_or(ConfigError::MissingKey("COM_TMP"))?;
    let sub_address = io.sub_add_tmp.ok_or(ConfigError::MissingKey("SUB_ADD_TMP"))?;
    Ok(ThermalBinding::Serial {
        port: convert_com_port(com),
        sub_address,
    })
}

/// `HOST_MOXA` + `PORT_MFC` select the device server, otherwise `COM_MFC`.
pub fn flow_binding(io: &IoConfig) -> AppResult<FlowBinding> {
    if let (Some(host), Some(port)) = (&io.host_moxa, io.port_mfc) {
        return Ok(FlowBinding::Network {
            host: host.clone(),
            port,
        });
    }
    let com = io
        .com_mfc
        .as_deref()
        .ok_or(ConfigError::MissingKey("COM_MFC"))?;
    Ok(FlowBinding::Serial {
        port: convert_com_port(com),
    })
}

pub fn open_valve_link(bus: &ValveBus) -> AppResult<Box<dyn Link>> {
    match bus {
        ValveBus::Network { host, port } => {
            info!("Valve bus on {host}:{port}");
            Ok(Box::new(TcpLink::new(host.clone(), *port)))
        }
        ValveBus::Serial { port } => {
            info!("Valve bus on {port}");
            Ok(Box::new(SerialLink::open(port)?))
        }
    }
}

pub fn open_thermal(binding: &ThermalBinding) -> AppResult<Box<dyn TemperatureController>> {
    match binding {
        ThermalBinding::Network { host, port } => {
            info!("Temperature controller on {host}:{port}");
            let client = ModbusTcpClient::new(host.clone(), *port);
            Ok(Box::new(Eurotherm::new(client, ThreadSleeper)))
        }
        ThermalBinding::Serial { port, sub_address } => {
            info!("Temperature controller on {port} (address {sub_address})");
            let client = ModbusRtuClient::open(port, *sub_address)?;
            Ok(Box::new(Eurotherm::new(client, ThreadSleeper)))
        }
    }
}

pub fn open_flow(binding: &FlowBinding) -> AppResult<Box<dyn FlowController>> {
    match binding {
        FlowBinding::Network { host, port } => {
            info!("Flow controllers on {host}:{port}");
            Ok(Box::new(FlowSms::new(ProparTcpClient::new(host.clone(), *port))))
        }
        FlowBinding::Serial { port } => {
            info!("Flow controllers on {port}");
            Ok(Box::new(FlowSms::new(ProparSerialClient::open(port)?)))
        }
    }
}
