// (c) 2025 Ross Younger

//! Byte-stream transport over the serial line
//!
//! The serial line always runs at a fixed configuration:
//!
//! | Parameter | Value |
//! |---|---|
//! | Speed | 19200 baud |
//! | Framing | 8 data bits, no parity, 1 stop bit |
//! | Flow control | none (neither XON/XOFF nor RTS/CTS) |
//! | Read timeout | 2 seconds |
//!
//! [`SerialLink`] knows nothing about the protocol. It writes bytes, and it reads
//! _up to_ a given number of bytes before the read timeout expires. A read that comes
//! up short is not an error; the caller decides what to do about it.

use std::time::Duration;

use anyhow::Context as _;
use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt as _, AsyncWrite, AsyncWriteExt as _};
use tokio::time::{timeout_at, Instant};
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// Line speed of the serial connection
pub const BAUD_RATE: u32 = 19_200;

/// How long a single [`SerialLink::read_exactly`] may wait for its bytes
pub const READ_TIMEOUT: Duration = Duration::from_secs(2);

/// Marker trait for byte streams which can carry the protocol.
///
/// In production this is a serial port; in tests it is usually an in-memory pipe.
pub trait LinkStream: AsyncRead + AsyncWrite + Send + Unpin {}
impl<T: AsyncRead + AsyncWrite + Send + Unpin> LinkStream for T {}

/// Failures of the link itself (as opposed to the protocol running over it)
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// The underlying device reported an error
    #[error("serial I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The stream reached end-of-file. A UART never does this, but a pipe does.
    #[error("serial link closed by peer")]
    Closed,
    /// The session's cancellation token fired while we were waiting
    #[error("session cancelled")]
    Cancelled,
}

/// The result of [`SerialLink::read_exactly`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// All the requested bytes arrived
    Full(Bytes),
    /// The read timed out; this holds whatever did arrive (possibly nothing)
    Short(Bytes),
}

impl ReadOutcome {
    /// Accessor
    #[must_use]
    pub fn bytes(&self) -> &Bytes {
        match self {
            ReadOutcome::Full(b) | ReadOutcome::Short(b) => b,
        }
    }

    /// Consumes the outcome, returning the bytes that arrived
    #[must_use]
    pub fn into_bytes(self) -> Bytes {
        match self {
            ReadOutcome::Full(b) | ReadOutcome::Short(b) => b,
        }
    }

    /// Did the read time out before all bytes arrived?
    #[must_use]
    pub fn is_short(&self) -> bool {
        matches!(self, ReadOutcome::Short(_))
    }
}

/// A serial connection, owned by exactly one session.
#[derive(Debug)]
pub struct SerialLink<S> {
    stream: S,
    read_timeout: Duration,
    cancel: CancellationToken,
    sent: u64,
    received: u64,
}

impl<S: LinkStream> SerialLink<S> {
    /// Wraps a stream with the standard read timeout
    #[must_use]
    pub fn new(stream: S, cancel: CancellationToken) -> Self {
        Self::with_timeout(stream, READ_TIMEOUT, cancel)
    }

    /// Wraps a stream with a non-standard read timeout
    #[must_use]
    pub fn with_timeout(stream: S, read_timeout: Duration, cancel: CancellationToken) -> Self {
        Self {
            stream,
            read_timeout,
            cancel,
            sent: 0,
            received: 0,
        }
    }

    /// Writes all of `bytes` to the line and flushes.
    pub async fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), LinkError> {
        if self.cancel.is_cancelled() {
            return Err(LinkError::Cancelled);
        }
        trace!("tx {bytes:02x?}");
        self.stream.write_all(bytes).await?;
        self.stream.flush().await?;
        self.sent += bytes.len() as u64;
        Ok(())
    }

    /// Reads `n` bytes, or as many as arrive before the read timeout.
    ///
    /// The timeout applies to the call as a whole, not to each byte.
    pub async fn read_exactly(&mut self, n: usize) -> Result<ReadOutcome, LinkError> {
        let mut buf = BytesMut::zeroed(n);
        let mut filled = 0;
        let deadline = Instant::now() + self.read_timeout;
        while filled < n {
            let result = tokio::select! {
                biased;
                () = self.cancel.cancelled() => return Err(LinkError::Cancelled),
                r = timeout_at(deadline, self.stream.read(&mut buf[filled..])) => r,
            };
            match result {
                Err(_elapsed) => break,
                Ok(Ok(0)) => return Err(LinkError::Closed),
                Ok(Ok(count)) => filled += count,
                Ok(Err(e)) => return Err(e.into()),
            }
        }
        buf.truncate(filled);
        self.received += filled as u64;
        let data = buf.freeze();
        trace!("rx {:02x?} ({filled}/{n})", &data[..]);
        Ok(if filled == n {
            ReadOutcome::Full(data)
        } else {
            ReadOutcome::Short(data)
        })
    }

    /// Reads a single byte. `None` means the read timed out.
    pub async fn read_byte(&mut self) -> Result<Option<u8>, LinkError> {
        Ok(match self.read_exactly(1).await? {
            ReadOutcome::Full(b) => Some(b[0]),
            ReadOutcome::Short(_) => None,
        })
    }

    /// Total bytes written to the line so far
    #[must_use]
    pub fn bytes_sent(&self) -> u64 {
        self.sent
    }

    /// Total bytes read from the line so far
    #[must_use]
    pub fn bytes_received(&self) -> u64 {
        self.received
    }

    /// Releases the underlying stream
    #[must_use]
    pub fn into_inner(self) -> S {
        self.stream
    }
}

/// Opens the serial device at the fixed line configuration
pub fn open_serial(device: &str) -> anyhow::Result<tokio_serial::SerialStream> {
    use tokio_serial::{DataBits, FlowControl, Parity, SerialPortBuilderExt as _, StopBits};

    tokio_serial::new(device, BAUD_RATE)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .flow_control(FlowControl::None)
        .timeout(READ_TIMEOUT)
        .open_native_async()
        .with_context(|| format!("failed to open serial port {device}"))
}
