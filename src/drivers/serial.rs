//! RS-232 SCPI link for meters addressed as `ASRL<port>::INSTR`.
use std::io::{Read, Write};
use std::time::{Duration, Instant};
use log::trace;
use serialport::SerialPort;
use crate::drivers::multimeter::ScpiLink;
use crate::drivers::InstrumentError;
#[derive(Clone, Copy, Debug)]
pub struct SerialSettings {
    pub baud_rate: u32,
    pub read_timeout: Duration,
}
impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            baud_rate: 9600,
            read_timeout: Duration::from_secs(2),
        }
    }
}
pub struct SerialLink<P: Read + Write = Box<dyn SerialPort>> {
    port: P,
    name: String,
    read_timeout: Duration,
}
impl SerialLink {
    pub fn open(port_name: &str, settings: SerialSettings) -> Result<Self, InstrumentError> {
        let port = serialport::new(port_name, settings.baud_rate)
            .timeout(Duration::from_millis(100))
            .open()
            .map_err(|e| InstrumentError::Open {
                resource: port_name.to_owned(),
                reason: e.to_string(),
            })?;
        Ok(Self::from_port(port, port_name, settings.read_timeout))
    }
}
impl<P: Read + Write> SerialLink<P> {
    pub fn from_port(port: P, name: &str, read_timeout: Duration) -> Self {
        Self {
            port,
            name: name.to_owned(),
            read_timeout,
        }
    }
    /// Reads until a `\n` arrives or the timeout passes.
    fn read_line(&mut self) -> Result<String, InstrumentError> {
        let mut buffer = [0u8; 256];
        let mut response = Vec::new();
        let start = Instant::now();
        while start.elapsed() < self.read_timeout {
            match self.port.read(&mut buffer) {
                Ok(0) => {}
                Ok(n) => {
                    response.extend_from_slice(&buffer[..n]);
                    if response.contains(&b'\n') {
                        break;
                    }
                }
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => {}
                Err(e) => return Err(e.into()),
            }
        }
        if !response.contains(&b'\n') {
            return Err(InstrumentError::Io(std::io::ErrorKind::TimedOut.into()));
        }
        Ok(String::from_utf8_lossy(&response).into_owned())
    }
}
impl<P: Read + Write> ScpiLink for SerialLink<P> {
    fn write(&mut self, command: &str) -> Result<(), InstrumentError> {
        trace!("Sending command to {}: '{}'", self.name, command);
        self.port.write_all(format!("{command}\n").as_bytes())?;
        self.port.flush()?;
        Ok(())
    }
    fn query(&mut self, command: &str) -> Result<String, InstrumentError> {
        self.write(command)?;
        let reply = self.read_line()?;
        trace!(
            "Received response from {}: '{}'",
            self.name,
            reply.escape_default()
        );
        Ok(reply)
    }
}
