use {
    crate::config::Config,
    serialport::{ClearBuffer, DataBits, FlowControl, Parity, SerialPort, StopBits},
    std::{
        io::{self, Read, Write},
        time::{Duration, Instant},
    },
};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Could not open {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: serialport::Error,
    },
    #[error("Serial port error: {0}")]
    Port(#[from] serialport::Error),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("The serial port has already been closed")]
    Closed,
}

/// A serial port speaking 8N1 to the servo bus.
pub struct Serial {
    port: Option<Box<dyn SerialPort>>,
    settle: Duration,
}

impl Serial {
    #[inline]
    pub fn open(config: &Config) -> Result<Self, Error> {
        let port = serialport::new(&config.port, config.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(config.timeout())
            .open()
            .map_err(|source| Error::Open {
                path: config.port.clone(),
                source,
            })?;
        log::info!("Opened {} at {} baud", config.port, config.baud_rate);
        Ok(Self {
            port: Some(port),
            settle: config.settle(),
        })
    }

    #[inline]
    fn port(&mut self) -> Result<&mut Box<dyn SerialPort>, Error> {
        self.port.as_mut().ok_or(Error::Closed)
    }
}

impl sts_driver::comm::Comm for Serial {
    type Error = Error;

    #[inline]
    async fn send(&mut self, bytes: &[u8]) -> Result<(), Self::Error> {
        let settle = self.settle;
        let port = self.port()?;
        // A late reply to an earlier command must not be read as this one's.
        port.clear(ClearBuffer::Input)?;
        port.write_all(bytes)?;
        port.flush()?;
        std::thread::sleep(settle);
        Ok(())
    }

    #[inline]
    async fn recv(&mut self, buffer: &mut [u8], timeout: Duration) -> Result<usize, Self::Error> {
        let port = self.port()?;
        let deadline = Instant::now() + timeout;
        let mut filled = 0;
        while filled < buffer.len() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            port.set_timeout(remaining)?;
            match port.read(&mut buffer[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::TimedOut => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(filled)
    }

    #[inline]
    async fn close(&mut self) -> Result<(), Self::Error> {
        if let Some(port) = self.port.take() {
            log::debug!("Closing {}", port.name().unwrap_or_default());
        }
        Ok(())
    }
}
