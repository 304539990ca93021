//! Session orchestration: one file, one direction, one serial link
// (c) 2025 Ross Younger

use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context as _, Result};
use indicatif::ProgressBar;
use tokio::fs::{File, OpenOptions};
use tokio::time::Instant;
use tracing::{debug, info};

use crate::engine::{receive_file, send_file, TransferStats};
use crate::protocol::{frame::CommandHeader, handshake, Command, ProtocolError, Role};
use crate::transport::{LinkStream, SerialLink};

/// Which way the file goes
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum Direction {
    /// Local file to remote
    Send,
    /// Remote file to local
    Receive,
}

impl Direction {
    /// The command code which requests this direction
    #[must_use]
    pub fn command(self) -> Command {
        match self {
            Direction::Send => Command::Send,
            Direction::Receive => Command::Receive,
        }
    }
}

/// Everything needed to run one transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    direction: Direction,
    header: CommandHeader,
    local_path: PathBuf,
}

impl Session {
    /// Constructor. Fails if the remote name cannot be expressed on the wire.
    pub fn new<P: Into<PathBuf>>(
        direction: Direction,
        remote_name: &str,
        local_path: P,
    ) -> Result<Self, ProtocolError> {
        Ok(Self {
            direction,
            header: CommandHeader::new(direction.command(), remote_name)?,
            local_path: local_path.into(),
        })
    }

    /// Interprets the two file arguments from the command line.
    ///
    /// When sending they are `LOCAL REMOTE`; when receiving, `REMOTE LOCAL`.
    pub fn from_args(send: bool, first: &str, second: &str) -> Result<Self, ProtocolError> {
        if send {
            Self::new(Direction::Send, second, first)
        } else {
            Self::new(Direction::Receive, first, second)
        }
    }

    /// Accessor
    #[must_use]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Accessor
    #[must_use]
    pub fn remote_name(&self) -> &str {
        self.header.remote_name()
    }

    /// Accessor
    #[must_use]
    pub fn local_path(&self) -> &Path {
        &self.local_path
    }

    /// The command header for this session
    #[must_use]
    pub fn header(&self) -> &CommandHeader {
        &self.header
    }
}

impl std::fmt::Display for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.direction {
            Direction::Send => write!(
                f,
                "{} -> remote:{}",
                self.local_path.display(),
                self.remote_name()
            ),
            Direction::Receive => write!(
                f,
                "remote:{} -> {}",
                self.remote_name(),
                self.local_path.display()
            ),
        }
    }
}

/// The local end of a transfer
#[derive(Debug)]
pub(crate) enum LocalFile {
    /// A file to send, and its size
    Source { file: File, size: u64 },
    /// A file to receive into
    Destination(File),
}

impl LocalFile {
    /// Opens (for sending) or creates (for receiving) the session's local file.
    ///
    /// A destination is not truncated here; [`drive`] does that once the handshake has succeeded.
    pub(crate) async fn open(session: &Session) -> Result<Self> {
        let path = session.local_path();
        match session.direction() {
            Direction::Send => {
                let file = File::open(path)
                    .await
                    .with_context(|| format!("failed to open {}", path.display()))?;
                let meta = file
                    .metadata()
                    .await
                    .with_context(|| format!("failed to stat {}", path.display()))?;
                anyhow::ensure!(!meta.is_dir(), "{} is a directory", path.display());
                Ok(LocalFile::Source {
                    file,
                    size: meta.len(),
                })
            }
            Direction::Receive => {
                // Existing contents survive until the remote has answered
                let file = OpenOptions::new()
                    .write(true)
                    .create(true)
                    .truncate(false)
                    .open(path)
                    .await
                    .with_context(|| format!("failed to create {}", path.display()))?;
                Ok(LocalFile::Destination(file))
            }
        }
    }

    /// Discards the previous contents of a destination file. Sources are left alone.
    async fn truncate(&mut self) -> std::io::Result<()> {
        if let LocalFile::Destination(file) = self {
            file.set_len(0).await?;
        }
        Ok(())
    }

    /// The number of bytes to be sent, if known
    pub(crate) fn size(&self) -> Option<u64> {
        match self {
            LocalFile::Source { size, .. } => Some(*size),
            LocalFile::Destination(_) => None,
        }
    }
}

/// What happened during a completed session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    /// Which way the data went, from this end's point of view
    pub direction: Direction,
    /// Data phase counters
    pub stats: TransferStats,
    /// Handshake probes sent (host only)
    pub handshake_attempts: Option<u32>,
    /// Duration of the data phase
    pub elapsed: Duration,
    /// Total bytes written to the line
    pub wire_sent: u64,
    /// Total bytes read from the line
    pub wire_received: u64,
}

/// Runs a host-side session over an open link: handshake, command header, data phase.
pub(crate) async fn drive<S: LinkStream>(
    session: &Session,
    link: &mut SerialLink<S>,
    mut local: LocalFile,
    handshake_limit: Option<NonZeroU32>,
    progress: &ProgressBar,
) -> Result<Outcome> {
    let attempts = handshake::probe(link, handshake_limit)
        .await
        .context("handshake failed")?;
    info!("connected");
    local
        .truncate()
        .await
        .with_context(|| format!("failed to truncate {}", session.local_path().display()))?;

    debug!("sending command header {:?}", session.header());
    session.header().write_to(link).await?;

    let start = Instant::now();
    let stats = match local {
        LocalFile::Source { mut file, size } => {
            debug!("file size: {size} bytes ({})", session.remote_name());
            send_file(link, &mut file, Role::Host, progress).await?
        }
        LocalFile::Destination(mut file) => {
            let stats = receive_file(link, &mut file, Role::Host, progress).await?;
            file.sync_all()
                .await
                .with_context(|| format!("failed to write {}", session.local_path().display()))?;
            stats
        }
    };

    Ok(Outcome {
        direction: session.direction(),
        stats,
        handshake_attempts: Some(attempts),
        elapsed: start.elapsed(),
        wire_sent: link.bytes_sent(),
        wire_received: link.bytes_received(),
    })
}

#[cfg(test)]
mod tests {
    use super::{Direction, LocalFile, Session};
    use crate::protocol::{Command, ProtocolError, REMOTE_ACK, SYNC_PROBE};
    use crate::transport::SerialLink;
    use crate::util::test_port::{ScriptedPort, Step};

    use indicatif::ProgressBar;
    use pretty_assertions::assert_eq;
    use std::num::NonZeroU32;
    use std::path::Path;
    use tokio_util::sync::CancellationToken;

    #[test]
    fn argument_order() {
        let s = Session::from_args(true, "local.txt", "ram:remote").unwrap();
        assert_eq!(s.direction(), Direction::Send);
        assert_eq!(s.local_path(), Path::new("local.txt"));
        assert_eq!(s.remote_name(), "ram:remote");
        assert_eq!(s.header().command(), Command::Send);
        assert_eq!(s.to_string(), "local.txt -> remote:ram:remote");

        let r = Session::from_args(false, "ram:remote", "local.txt").unwrap();
        assert_eq!(r.direction(), Direction::Receive);
        assert_eq!(r.local_path(), Path::new("local.txt"));
        assert_eq!(r.remote_name(), "ram:remote");
        assert_eq!(r.header().command(), Command::Receive);
        assert_eq!(r.to_string(), "remote:ram:remote -> local.txt");
    }

    #[test]
    fn bad_remote_name() {
        assert!(matches!(
            Session::from_args(false, "", "local"),
            Err(ProtocolError::InvalidName(_))
        ));
    }

    #[tokio::test]
    async fn local_file_errors_are_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("does-not-exist");
        let s = Session::new(Direction::Send, "x", &missing).unwrap();
        let e = LocalFile::open(&s).await.unwrap_err();
        assert!(format!("{e:#}").contains("failed to open"));

        let s = Session::new(Direction::Send, "x", dir.path()).unwrap();
        let _ = LocalFile::open(&s).await.unwrap_err();

        let s = Session::new(Direction::Receive, "x", missing.join("sub")).unwrap();
        let e = LocalFile::open(&s).await.unwrap_err();
        assert!(format!("{e:#}").contains("failed to create"));
    }

    #[tokio::test(start_paused = true)]
    async fn receive_session_on_the_wire() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out");
        let session = Session::from_args(false, "s:abc", dest.to_str().unwrap()).unwrap();

        let (port, log) = ScriptedPort::new(vec![
            Step::data(&[REMOTE_ACK]),
            Step::data(b"\x03abc\x00"),
        ]);
        let mut link = SerialLink::new(port, CancellationToken::new());
        let local = LocalFile::open(&session).await.unwrap();
        let outcome = super::drive(&session, &mut link, local, None, &ProgressBar::hidden())
            .await
            .unwrap();

        let mut expected = vec![SYNC_PROBE];
        expected.extend_from_slice(b"\x17\x06s:abc\x00");
        expected.push(SYNC_PROBE);
        assert_eq!(log.wire(), expected);
        assert_eq!(std::fs::read(&dest).unwrap(), b"abc");
        assert_eq!(outcome.handshake_attempts, Some(1));
        assert_eq!(outcome.stats.payload_bytes, 3);
        assert_eq!(outcome.wire_sent, expected.len() as u64);
        assert_eq!(outcome.wire_received, 6);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_handshake_keeps_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("precious.txt");
        std::fs::write(&dest, b"irreplaceable data").unwrap();
        let session = Session::from_args(false, "remote.bin", dest.to_str().unwrap()).unwrap();

        let (port, log) = ScriptedPort::new(vec![]);
        let mut link = SerialLink::new(port, CancellationToken::new());
        let local = LocalFile::open(&session).await.unwrap();
        let e = super::drive(
            &session,
            &mut link,
            local,
            NonZeroU32::new(2),
            &ProgressBar::hidden(),
        )
        .await
        .unwrap_err();
        assert!(matches!(
            e.downcast_ref::<ProtocolError>(),
            Some(ProtocolError::HandshakeExhausted { attempts: 2 })
        ));
        assert_eq!(log.wire(), [SYNC_PROBE; 2]);
        assert_eq!(std::fs::read(&dest).unwrap(), b"irreplaceable data");
    }

    #[tokio::test(start_paused = true)]
    async fn receive_replaces_longer_file() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out");
        std::fs::write(&dest, b"0123456789").unwrap();
        let session = Session::from_args(false, "s:abc", dest.to_str().unwrap()).unwrap();

        let (port, _log) = ScriptedPort::new(vec![
            Step::data(&[REMOTE_ACK]),
            Step::data(b"\x03abc\x00"),
        ]);
        let mut link = SerialLink::new(port, CancellationToken::new());
        let local = LocalFile::open(&session).await.unwrap();
        let _ = super::drive(&session, &mut link, local, None, &ProgressBar::hidden())
            .await
            .unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"abc");
    }

    #[tokio::test(start_paused = true)]
    async fn send_session_on_the_wire() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("in");
        std::fs::write(&src, b"hello").unwrap();
        let session = Session::from_args(true, src.to_str().unwrap(), "t:x").unwrap();

        let (port, log) = ScriptedPort::new(vec![
            Step::data(&[0x99]),
            Step::data(&[REMOTE_ACK]),
            Step::data(&[REMOTE_ACK]),
        ]);
        let mut link = SerialLink::new(port, CancellationToken::new());
        let local = LocalFile::open(&session).await.unwrap();
        assert_eq!(local.size(), Some(5));
        let outcome = super::drive(&session, &mut link, local, None, &ProgressBar::hidden())
            .await
            .unwrap();

        let mut expected = vec![SYNC_PROBE, SYNC_PROBE];
        expected.extend_from_slice(b"\x18\x04t:x\x00");
        expected.extend_from_slice(b"\x05hello\x00");
        assert_eq!(log.wire(), expected);
        assert_eq!(outcome.handshake_attempts, Some(2));
        assert_eq!(outcome.direction, Direction::Send);
    }
}
