//! # Native Transport
//!
//! [`Transport`] over a local serial device (`/dev/ttyUSB0`, `COM3`, ...)
//! using `tokio-serial`.
//!
//! The port is split into independent read and write halves so the
//! response router can sit in [`Transport::read_chunk`] while commands are
//! written from other tasks.

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing,
    clippy::todo
)]

use core_types::{FlowControl, Parity, SerialConfig, Transport, TransportError};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::io::{AsyncReadExt, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::sync::Mutex;
use tokio_serial::{SerialPortBuilderExt, SerialStream};
use tracing::{debug, info};

/// Bytes requested per read. The controller's lines are short, a read
/// rarely returns more than one or two of them.
const READ_BUFFER_SIZE: usize = 256;

pub struct SerialTransport {
    device: String,
    reader: Mutex<ReadHalf<SerialStream>>,
    writer: Mutex<Option<WriteHalf<SerialStream>>>,
    closed: AtomicBool,
}

impl SerialTransport {
    /// Open `config.device` with the configured line settings.
    ///
    /// Needs a running tokio runtime (the port registers with its reactor).
    pub fn open(config: &SerialConfig) -> Result<Self, TransportError> {
        let builder = tokio_serial::new(&config.device, config.baud_rate)
            .data_bits(data_bits(config.data_bits)?)
            .stop_bits(stop_bits(config.stop_bits)?)
            .parity(parity(config.parity))
            .flow_control(flow_control(config.flow_control));

        let stream = builder.open_native_async().map_err(|e| {
            TransportError::ConnectionFailed(format!("{}: {}", config.device, e))
        })?;
        info!(device = %config.device, baud = config.baud_rate, "serial port open");

        let (reader, writer) = tokio::io::split(stream);
        Ok(Self {
            device: config.device.clone(),
            reader: Mutex::new(reader),
            writer: Mutex::new(Some(writer)),
            closed: AtomicBool::new(false),
        })
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl Transport for SerialTransport {
    async fn read_chunk(&self) -> Result<Vec<u8>, TransportError> {
        let mut reader = self.reader.lock().await;
        let mut buf = vec![0u8; READ_BUFFER_SIZE];
        if self.is_closed() {
            return Err(TransportError::NotConnected);
        }
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            return Err(TransportError::NotConnected);
        }
        buf.truncate(n);
        Ok(buf)
    }

    async fn write(&self, data: &[u8]) -> Result<(), TransportError> {
        let mut writer = self.writer.lock().await;
        let writer = writer.as_mut().ok_or(TransportError::NotConnected)?;
        writer.write_all(data).await?;
        writer.flush().await?;
        Ok(())
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.closed.store(true, Ordering::Release);
        if let Some(mut writer) = self.writer.lock().await.take() {
            let _ = writer.shutdown().await;
        }
        debug!(device = %self.device, "serial port closed");
        Ok(())
    }
}

fn data_bits(bits: u8) -> Result<tokio_serial::DataBits, TransportError> {
    match bits {
        5 => Ok(tokio_serial::DataBits::Five),
        6 => Ok(tokio_serial::DataBits::Six),
        7 => Ok(tokio_serial::DataBits::Seven),
        8 => Ok(tokio_serial::DataBits::Eight),
        other => Err(TransportError::ConnectionFailed(format!(
            "unsupported data bits: {}",
            other
        ))),
    }
}

fn stop_bits(bits: u8) -> Result<tokio_serial::StopBits, TransportError> {
    match bits {
        1 => Ok(tokio_serial::StopBits::One),
        2 => Ok(tokio_serial::StopBits::Two),
        other => Err(TransportError::ConnectionFailed(format!(
            "unsupported stop bits: {}",
            other
        ))),
    }
}

fn parity(parity: Parity) -> tokio_serial::Parity {
    match parity {
        Parity::None => tokio_serial::Parity::None,
        Parity::Even => tokio_serial::Parity::Even,
        Parity::Odd => tokio_serial::Parity::Odd,
    }
}

fn flow_control(flow: FlowControl) -> tokio_serial::FlowControl {
    match flow {
        FlowControl::None => tokio_serial::FlowControl::None,
        FlowControl::Hardware => tokio_serial::FlowControl::Hardware,
        FlowControl::Software => tokio_serial::FlowControl::Software,
    }
}
