//! Scripted serial port for protocol tests
// (c) 2025 Ross Younger

use std::collections::VecDeque;
use std::future::Future as _;
use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{ready, Context, Poll};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::time::Sleep;

/// One step of what the far end "says"
#[derive(Debug, Clone)]
pub(crate) enum Step {
    /// These bytes become available to read
    Data(Vec<u8>),
    /// Nothing arrives for this long
    Pause(Duration),
}

impl Step {
    pub(crate) fn data(bytes: &[u8]) -> Self {
        Step::Data(bytes.to_vec())
    }
}

/// Something that happened during a test, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Event {
    /// Bytes written to the serial line
    Wire(Vec<u8>),
    /// Bytes written to the local file
    File(Vec<u8>),
}

/// Shared, ordered record of everything written to the port and the local file
#[derive(Debug, Clone, Default)]
pub(crate) struct EventLog(Arc<Mutex<Vec<Event>>>);

impl EventLog {
    fn push(&self, event: Event) {
        self.0.lock().unwrap().push(event);
    }

    pub(crate) fn events(&self) -> Vec<Event> {
        self.0.lock().unwrap().clone()
    }

    /// Everything written to the line, concatenated
    pub(crate) fn wire(&self) -> Vec<u8> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Wire(v) => Some(v),
                Event::File(_) => None,
            })
            .flatten()
            .collect()
    }

    /// Everything written to the file, concatenated
    pub(crate) fn file(&self) -> Vec<u8> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::File(v) => Some(v),
                Event::Wire(_) => None,
            })
            .flatten()
            .collect()
    }

    /// A local file sink which records into this log
    pub(crate) fn file_sink(&self) -> RecordingFile {
        RecordingFile(self.clone())
    }
}

/// Serial port which plays back a script and records what is written to it.
///
/// When the script runs out the line goes silent, so reads time out.
#[derive(Debug)]
pub(crate) struct ScriptedPort {
    script: VecDeque<Step>,
    stall: Option<Pin<Box<Sleep>>>,
    log: EventLog,
}

impl ScriptedPort {
    pub(crate) fn new(script: Vec<Step>) -> (Self, EventLog) {
        let log = EventLog::default();
        (
            Self {
                script: script.into(),
                stall: None,
                log: log.clone(),
            },
            log,
        )
    }
}

impl AsyncRead for ScriptedPort {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        loop {
            if let Some(stall) = this.stall.as_mut() {
                ready!(stall.as_mut().poll(cx));
                this.stall = None;
            }
            match this.script.pop_front() {
                None => return Poll::Pending,
                Some(Step::Pause(d)) => this.stall = Some(Box::pin(tokio::time::sleep(d))),
                Some(Step::Data(mut data)) => {
                    let n = data.len().min(buf.remaining());
                    buf.put_slice(&data[..n]);
                    if n < data.len() {
                        this.script.push_front(Step::Data(data.split_off(n)));
                    }
                    return Poll::Ready(Ok(()));
                }
            }
        }
    }
}

impl AsyncWrite for ScriptedPort {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.log.push(Event::Wire(buf.to_vec()));
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

/// Local file stand-in which records writes into an [`EventLog`]
#[derive(Debug)]
pub(crate) struct RecordingFile(EventLog);

impl AsyncWrite for RecordingFile {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.0.push(Event::File(buf.to_vec()));
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}
