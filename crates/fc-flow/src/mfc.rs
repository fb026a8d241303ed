//! Flow-SMS mass-flow controllers.

use tracing::debug;

use crate::client::ProparClient;
use crate::error::FlowResult;
use crate::propar::{ParamType, Parameter, Value};

/// Parameters the rig reads and writes on every controller.
pub mod parameters {
    use super::{ParamType, Parameter};

    /// Setpoint as a fraction of full scale, 0..=32000.
    pub const SETPOINT: Parameter = Parameter::new(1, 1, ParamType::Int16);
    /// Index of the active calibration (fluid) table.
    pub const FLUID: Parameter = Parameter::new(1, 16, ParamType::Int8);
    /// Measured value in engineering units.
    pub const FMEASURE: Parameter = Parameter::new(33, 0, ParamType::Float);
    /// Setpoint in engineering units.
    pub const FSETPOINT: Parameter = Parameter::new(33, 3, ParamType::Float);
}

/// Raw setpoint at 100 % of full scale.
pub const FULL_SCALE: f64 = 32_000.0;

/// Pressure transducers on the two mixing lines.
pub const PRESSURE_NODE_A: u8 = 3;
pub const PRESSURE_NODE_B: u8 = 14;

/// One controller channel as read back.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelReading {
    /// sccm.
    pub measured: f64,
    /// sccm.
    pub setpoint: f64,
    pub fluid: u8,
}

/// Mass-flow controller seam.
pub trait FlowController {
    /// Select the calibration table (when given) and write a raw setpoint.
    fn write_flow(&mut self, node: u8, cal_id: Option<u8>, raw: u16) -> FlowResult<()>;

    fn read_channel(&mut self, node: u8) -> FlowResult<ChannelReading>;

    /// psia.
    fn read_pressure(&mut self, node: u8) -> FlowResult<f64>;
}

impl<F: FlowController + ?Sized> FlowController for Box<F> {
    fn write_flow(&mut self, node: u8, cal_id: Option<u8>, raw: u16) -> FlowResult<()> {
        (**self).write_flow(node, cal_id, raw)
    }
    fn read_channel(&mut self, node: u8) -> FlowResult<ChannelReading> {
        (**self).read_channel(node)
    }
    fn read_pressure(&mut self, node: u8) -> FlowResult<f64> {
        (**self).read_pressure(node)
    }
}

#[derive(Debug)]
pub struct FlowSms<C> {
    client: C,
}

impl<C: ProparClient> FlowSms<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    fn read_f64(&mut self, node: u8, parameter: Parameter) -> FlowResult<f64> {
        self.client
            .read_parameter(node, parameter)
            .map(|v| v.as_f64())
    }
}

impl<C: ProparClient> FlowController for FlowSms<C> {
    fn write_flow(&mut self, node: u8, cal_id: Option<u8>, raw: u16) -> FlowResult<()> {
        let mut values = Vec::with_capacity(2);
        if let Some(cal) = cal_id {
            values.push((parameters::FLUID, Value::Int8(cal)));
        }
        values.push((parameters::SETPOINT, Value::Int16(raw)));
        self.client.write_parameters(node, values)?;
        debug!(node, ?cal_id, raw, "flow setpoint written");
        Ok(())
    }

    fn read_channel(&mut self, node: u8) -> FlowResult<ChannelReading> {
        let measured = self.read_f64(node, parameters::FMEASURE)?;
        let setpoint = self.read_f64(node, parameters::FSETPOINT)?;
        let fluid = self.read_f64(node, parameters::FLUID)? as u8;
        Ok(ChannelReading {
            measured,
            setpoint,
            fluid,
        })
    }

    fn read_pressure(&mut self, node: u8) -> FlowResult<f64> {
        self.read_f64(node, parameters::FMEASURE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FlowError;
    use crate::propar::{Reply, Request};
    use std::collections::BTreeMap;

    /// Parameter store keyed by node, process and number.
    #[derive(Debug, Default)]
    struct Instruments {
        values: BTreeMap<(u8, u8, u8), Value>,
        writes: Vec<Request>,
    }

    impl ProparClient for Instruments {
        fn transact(&mut self, request: &Request) -> FlowResult<Reply> {
            match request {
                Request::Read { node, parameter } => self
                    .values
                    .get(&(*node, parameter.process, parameter.number))
                    .copied()
                    .map(Reply::Value)
                    .ok_or(FlowError::Status {
                        node: *node,
                        code: 0x01,
                        index: 3,
                    }),
                Request::Write { node, values } => {
                    for (p, v) in values {
                        self.values.insert((*node, p.process, p.number), *v);
                    }
                    self.writes.push(request.clone());
                    Ok(Reply::Accepted)
                }
            }
        }
    }

    #[test]
    fn write_selects_calibration_before_setpoint() {
        let mut sms = FlowSms::new(Instruments::default());
        sms.write_flow(7, Some(2), 16000).unwrap();
        sms.write_flow(8, None, 0).unwrap();
        assert_eq!(
            sms.client().writes,
            vec![
                Request::Write {
                    node: 7,
                    values: vec![
                        (parameters::FLUID, Value::Int8(2)),
                        (parameters::SETPOINT, Value::Int16(16000)),
                    ],
                },
                Request::Write {
                    node: 8,
                    values: vec![(parameters::SETPOINT, Value::Int16(0))],
                },
            ]
        );
    }

    #[test]
    fn channel_reads_measure_setpoint_and_fluid() {
        let mut inst = Instruments::default();
        inst.values.insert((5, 33, 0), Value::Float(9.5));
        inst.values.insert((5, 33, 3), Value::Float(10.0));
        inst.values.insert((5, 1, 16), Value::Int8(1));
        inst.values.insert((PRESSURE_NODE_A, 33, 0), Value::Float(15.25));
        let mut sms = FlowSms::new(inst);
        assert_eq!(
            sms.read_channel(5).unwrap(),
            ChannelReading {
                measured: 9.5,
                setpoint: 10.0,
                fluid: 1
            }
        );
        assert_eq!(sms.read_pressure(PRESSURE_NODE_A).unwrap(), 15.25);
        assert!(matches!(
            sms.read_pressure(PRESSURE_NODE_B),
            Err(FlowError::Status { node: 14, .. })
        ));
    }
}
