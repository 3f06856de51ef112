use std::io::{BufRead, BufReader};
use std::time::Duration;

use biovox_foundation::EcgError;

/// Seam over the serial backend so the manager's REAL/FALLBACK state
/// machine and its recovery timing are unit-testable against a fake port,
/// without a concrete `serialport` dependency in test code.
pub trait SerialPort: Send {
    /// Reads one line, blocking up to the port's configured timeout.
    /// Returns `Ok(None)` on a read timeout with no data, not an error.
    fn read_line(&mut self) -> std::io::Result<Option<String>>;
    fn port_name(&self) -> &str;
}

/// Real serial backend, line-buffered over the `serialport` crate.
pub struct RealSerialPort {
    port_name: String,
    reader: BufReader<Box<dyn serialport::SerialPort>>,
}

impl RealSerialPort {
    pub fn open(port_name: &str, baud: u32, timeout: Duration) -> Result<Self, EcgError> {
        let port = serialport::new(port_name, baud)
            .timeout(timeout)
            .open()
            .map_err(|e| EcgError::SerialOpenFailed {
                port: port_name.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            port_name: port_name.to_string(),
            reader: BufReader::new(port),
        })
    }
}

impl SerialPort for RealSerialPort {
    fn read_line(&mut self) -> std::io::Result<Option<String>> {
        let mut line = String::new();
        match self.reader.read_line(&mut line) {
            Ok(0) => Ok(None),
            Ok(_) => Ok(Some(line)),
            Err(e) if matches!(e.kind(), std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock) => {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn port_name(&self) -> &str {
        &self.port_name
    }
}

/// Auto-detects a serial port, preferring a device description containing
/// "Arduino", else the first available port.
pub fn auto_detect_port_name() -> Result<String, EcgError> {
    let ports = serialport::available_ports().map_err(|_| EcgError::NoPortsAvailable)?;
    if ports.is_empty() {
        return Err(EcgError::NoPortsAvailable);
    }

    let arduino = ports.iter().find(|p| matches!(&p.port_type, serialport::SerialPortType::UsbPort(info) if info
        .product
        .as_deref()
        .map(|s| s.to_lowercase().contains("arduino"))
        .unwrap_or(false)));

    let chosen = arduino.unwrap_or(&ports[0]);
    Ok(chosen.port_name.clone())
}

/// Parses one ASCII line into a physiologically plausible ECG amplitude
/// sample. Lines that fail to parse, or parse outside the plausible band,
/// are dropped silently per the external-interface contract.
pub fn parse_ecg_line(line: &str) -> Option<f32> {
    let value: f32 = line.trim().parse().ok()?;
    if value.is_finite() && value.abs() <= 10_000.0 {
        Some(value)
    } else {
        None
    }
}
