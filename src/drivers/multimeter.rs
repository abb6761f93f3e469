//! SCPI-driven bench multimeter.
//!
//! The meter is reset and identified when the connection opens, then put in
//! DC-voltage mode with an immediate trigger. Each [`InstrumentSource::sample`]
//! call issues `READ?` and stamps the reading with the midpoint of the query,
//! which halves the timestamp error caused by the command round trip.
use log::{debug, info};
use crate::drivers::serial::{SerialLink, SerialSettings};
use crate::drivers::source::{Clock, InstrumentSource, SystemClock};
use crate::drivers::visa::VisaLink;
use crate::drivers::InstrumentError;
use crate::types::Sample;
/// Default measurement range in volts.
pub const DEFAULT_MAX_RANGE: f64 = 100.0;
/// Default measurement resolution in volts.
pub const DEFAULT_RESOLUTION: f64 = 3.0e-5;
/// Transport that carries SCPI strings to an instrument.
pub trait ScpiLink {
    fn write(&mut self, command: &str) -> Result<(), InstrumentError>;
    fn query(&mut self, command: &str) -> Result<String, InstrumentError>;
}
impl<L: ScpiLink + ?Sized> ScpiLink for Box<L> {
    fn write(&mut self, command: &str) -> Result<(), InstrumentError> {
        (**self).write(command)
    }
    fn query(&mut self, command: &str) -> Result<String, InstrumentError> {
        (**self).query(command)
    }
}
/// How a resource string is reached.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResourceKind {
    /// `ASRL<port>::INSTR`, opened directly as a serial port.
    Serial { port: String },
    /// Anything else VISA understands (USB, TCPIP, GPIB).
    Visa,
}
impl ResourceKind {
    pub fn parse(resource: &str) -> Result<Self, InstrumentError> {
        let resource = resource.trim();
        let upper = resource.to_ascii_uppercase();
        if upper.starts_with("ASRL") {
            let body = &resource[4..];
            let port = if upper.ends_with("::INSTR") {
                &body[..body.len() - "::INSTR".len()]
            } else {
                body
            };
            if port.is_empty() {
                return Err(InstrumentError::UnsupportedResource(resource.to_owned()));
            }
            // ASRL3::INSTR is COM3 on Windows
            let port = if port.chars().all(|c| c.is_ascii_digit()) {
                format!("COM{port}")
            } else {
                port.to_owned()
            };
            return Ok(ResourceKind::Serial { port });
        }
        if upper.starts_with("USB") || upper.starts_with("TCPIP") || upper.starts_with("GPIB") {
            return Ok(ResourceKind::Visa);
        }
        Err(InstrumentError::UnsupportedResource(resource.to_owned()))
    }
}
pub struct Multimeter<L: ScpiLink, C: Clock = SystemClock> {
    link: L,
    clock: C,
    identity: String,
}
impl<L: ScpiLink, C: Clock> Multimeter<L, C> {
    /// Resets and identifies the instrument behind `link`.
    pub fn connect(link: L, clock: C) -> Result<Self, InstrumentError> {
        let mut meter = Self {
            link,
            clock,
            identity: String::new(),
        };
        meter.link.write("*RST")?;
        let identity = meter.link.query("*IDN?")?.trim().to_owned();
        if identity.is_empty() {
            return Err(InstrumentError::Identification("multimeter".into()));
        }
        info!("Instrument info: {identity}");
        meter.identity = identity;
        Ok(meter)
    }
}
impl<L: ScpiLink, C: Clock> InstrumentSource for Multimeter<L, C> {
    fn configure(&mut self, max_range: f64, resolution: f64) -> Result<(), InstrumentError> {
        let command = dc_config_command(max_range, resolution);
        info!("Instrument DCV config: {command}");
        self.link.write(&command)?;
        self.link.write("TRIG:SOUR IMM")
    }
    fn sample(&mut self) -> Result<Sample, InstrumentError> {
        let before = self.clock.now();
        let reply = self.link.query("READ?")?;
        let after = self.clock.now();
        let value = parse_reading(&reply)?;
        debug!("READ? -> {value}");
        Ok(Sample {
            timestamp: 0.5 * (before + after),
            value,
        })
    }
    fn describe(&self) -> String {
        self.identity.clone()
    }
}
/// `CONF:VOLT:DC 100,3.0e-5`
pub fn dc_config_command(max_range: f64, resolution: f64) -> String {
    format!("CONF:VOLT:DC {:.0},{:.1e}", max_range, resolution)
}
pub fn parse_reading(reply: &str) -> Result<f64, InstrumentError> {
    let trimmed = reply.trim();
    trimmed
        .parse::<f64>()
        .map_err(|_| InstrumentError::Parse(trimmed.to_owned()))
}
/// Opens, resets and identifies the hardware multimeter named by `resource`.
pub fn open_multimeter(
    resource: &str,
    serial: SerialSettings,
) -> Result<Box<dyn InstrumentSource>, InstrumentError> {
    let link: Box<dyn ScpiLink> = match ResourceKind::parse(resource)? {
        ResourceKind::Serial { port } => Box::new(SerialLink::open(&port, serial)?),
        ResourceKind::Visa => {
            for visible in VisaLink::list_resources()? {
                info!("VISA resource: {visible}");
            }
            Box::new(VisaLink::open(resource)?)
        }
    };
    let meter = Multimeter::connect(link, SystemClock)?;
    Ok(Box::new(meter))
}
#[cfg(test)]
pub mod testing {
    use std::collections::VecDeque;
    use super::*;
    /// Records every command and answers queries from a script.
    #[derive(Default)]
    pub struct ScriptedLink {
        pub sent: Vec<String>,
        pub replies: VecDeque<String>,
    }
    impl ScriptedLink {
        pub fn with_replies(replies: &[&str]) -> Self {
            Self {
                sent: Vec::new(),
                replies: replies.iter().map(|r| r.to_string()).collect(),
            }
        }
    }
    impl ScpiLink for ScriptedLink {
        fn write(&mut self, command: &str) -> Result<(), InstrumentError> {
            self.sent.push(command.to_owned());
            Ok(())
        }
        fn query(&mut self, command: &str) -> Result<String, InstrumentError> {
            self.sent.push(command.to_owned());
            self.replies
                .pop_front()
                .ok_or_else(|| InstrumentError::Io(std::io::ErrorKind::TimedOut.into()))
        }
    }
}
