// (c) 2025 Ross Younger

//! Frame codec: the command header and the length-prefixed chunk frames
//!
//! ```text
//! Command header:  [command][name length + 1][name ...][0x00]
//! Chunk frame:     [n = 1..255][n payload bytes]
//! Sentinel frame:  [0x00]
//! ```

use anyhow::Result;
use bytes::{BufMut as _, Bytes, BytesMut};

use super::{Command, ProtocolError, END_OF_TRANSFER, MAX_CHUNK, SYNC_PROBE};
use crate::transport::{LinkError, LinkStream, ReadOutcome, SerialLink};

/// A unit of the data phase.
///
/// The payload is always 1-255 bytes, except for the sentinel which has none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    payload: Bytes,
}

impl Frame {
    /// Creates a chunk frame. The payload must be 1-255 bytes.
    pub fn chunk(payload: impl Into<Bytes>) -> Result<Self, ProtocolError> {
        let payload = payload.into();
        if payload.is_empty() || payload.len() > MAX_CHUNK {
            return Err(ProtocolError::ChunkSize(payload.len()));
        }
        Ok(Self { payload })
    }

    /// Creates the sentinel frame
    #[must_use]
    pub fn end() -> Self {
        Self {
            payload: Bytes::new(),
        }
    }

    /// Is this the sentinel?
    #[must_use]
    pub fn is_end(&self) -> bool {
        self.payload.is_empty()
    }

    /// The length byte
    #[must_use]
    #[allow(clippy::cast_possible_truncation)] // checked by constructor
    pub fn length(&self) -> u8 {
        self.payload.len() as u8
    }

    /// Accessor
    #[must_use]
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Encodes the frame for the wire
    #[must_use]
    pub fn encode(&self) -> Bytes {
        let mut out = BytesMut::with_capacity(1 + self.payload.len());
        out.put_u8(self.length());
        out.extend_from_slice(&self.payload);
        out.freeze()
    }

    /// Writes the encoded frame to the link
    pub async fn write_to<S: LinkStream>(&self, link: &mut SerialLink<S>) -> Result<(), LinkError> {
        link.write_bytes(&self.encode()).await
    }
}

/// A chunk as it came off the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedChunk {
    /// The length byte
    pub declared: u8,
    /// The payload bytes which actually arrived
    pub payload: Bytes,
}

impl ReceivedChunk {
    /// Did fewer bytes arrive than were declared?
    #[must_use]
    pub fn is_short(&self) -> bool {
        self.payload.len() < usize::from(self.declared)
    }
}

/// The result of trying to read one frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    /// No length byte arrived before the read timeout
    Idle,
    /// The sentinel frame
    End,
    /// A chunk frame, possibly short
    Chunk(ReceivedChunk),
}

/// Reads one frame from the link.
///
/// A short payload is returned as-is; see [`ReceivedChunk::is_short`].
pub async fn read_frame<S: LinkStream>(link: &mut SerialLink<S>) -> Result<Decoded, LinkError> {
    let Some(length) = link.read_byte().await? else {
        return Ok(Decoded::Idle);
    };
    if length == END_OF_TRANSFER {
        return Ok(Decoded::End);
    }
    let payload = link.read_exactly(usize::from(length)).await?.into_bytes();
    Ok(Decoded::Chunk(ReceivedChunk {
        declared: length,
        payload,
    }))
}

/// The command header which opens the data phase
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandHeader {
    command: Command,
    remote_name: String,
}

impl CommandHeader {
    /// Longest remote filename which fits in the header
    pub const MAX_NAME_LEN: usize = MAX_CHUNK - 1;

    /// Constructor. Rejects names which cannot be represented on the wire.
    pub fn new(command: Command, remote_name: &str) -> Result<Self, ProtocolError> {
        if remote_name.is_empty() {
            return Err(ProtocolError::InvalidName("name is empty"));
        }
        if !remote_name.is_ascii() {
            return Err(ProtocolError::InvalidName("name must be ASCII"));
        }
        if remote_name.contains('\0') {
            return Err(ProtocolError::InvalidName("name contains a NUL"));
        }
        if remote_name.len() > Self::MAX_NAME_LEN {
            return Err(ProtocolError::InvalidName("name is longer than 254 bytes"));
        }
        Ok(Self {
            command,
            remote_name: remote_name.to_owned(),
        })
    }

    /// Accessor
    #[must_use]
    pub fn command(&self) -> Command {
        self.command
    }

    /// Accessor
    #[must_use]
    pub fn remote_name(&self) -> &str {
        &self.remote_name
    }

    /// Encodes the header for the wire
    #[must_use]
    pub fn encode(&self) -> Bytes {
        let name = self.remote_name.as_bytes();
        let mut out = BytesMut::with_capacity(name.len() + 3);
        out.put_u8(self.command.code());
        #[allow(clippy::cast_possible_truncation)] // checked by constructor
        out.put_u8((name.len() + 1) as u8);
        out.extend_from_slice(name);
        out.put_u8(0);
        out.freeze()
    }

    /// Decodes the name field (everything after the length byte).
    ///
    /// The name ends at the first NUL, if there is one.
    pub fn decode(command: u8, name_field: &[u8]) -> Result<Self, ProtocolError> {
        let command = Command::from_repr(command).ok_or(ProtocolError::UnknownCommand(command))?;
        let end = name_field
            .iter()
            .position(|b| *b == 0)
            .unwrap_or(name_field.len());
        let name = std::str::from_utf8(&name_field[..end])
            .map_err(|_| ProtocolError::InvalidName("name must be ASCII"))?;
        Self::new(command, name)
    }

    /// Writes the encoded header to the link
    pub async fn write_to<S: LinkStream>(&self, link: &mut SerialLink<S>) -> Result<(), LinkError> {
        link.write_bytes(&self.encode()).await
    }

    /// Reads a command header from the link.
    ///
    /// Stray handshake probes ahead of the command byte are skipped; 42 is not a command code,
    /// and a host whose probe crossed with our reply will have sent one more than we answered.
    /// Once the command byte has arrived, the rest of the header must follow within the read timeout.
    pub async fn read_from<S: LinkStream>(link: &mut SerialLink<S>) -> Result<Self> {
        let command = loop {
            match link.read_byte().await? {
                Some(SYNC_PROBE) | None => (),
                Some(b) => break b,
            }
        };
        let Some(name_len) = link.read_byte().await? else {
            return Err(ProtocolError::ShortRead {
                expected: 1,
                got: 0,
            }
            .into());
        };
        let name_field = match link.read_exactly(usize::from(name_len)).await? {
            ReadOutcome::Full(b) => b,
            ReadOutcome::Short(b) => {
                return Err(ProtocolError::ShortRead {
                    expected: usize::from(name_len),
                    got: b.len(),
                }
                .into())
            }
        };
        Ok(Self::decode(command, &name_field)?)
    }
}

#[cfg(test)]
mod tests {
    use super::{CommandHeader, Decoded, Frame, ReceivedChunk};
    use crate::protocol::{Command, ProtocolError};
    use crate::transport::SerialLink;
    use crate::util::test_port::{ScriptedPort, Step};

    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    #[test]
    fn chunk_encoding() {
        let f = Frame::chunk(&b"abc"[..]).unwrap();
        assert_eq!(f.length(), 3);
        assert!(!f.is_end());
        assert_eq!(f.encode().as_ref(), b"\x03abc");
    }

    #[test]
    fn sentinel_encoding() {
        let f = Frame::end();
        assert!(f.is_end());
        assert_eq!(f.length(), 0);
        assert_eq!(f.encode().as_ref(), [0]);
    }

    #[test]
    fn largest_chunk() {
        let f = Frame::chunk(vec![7u8; 255]).unwrap();
        assert_eq!(f.length(), 255);
        let enc = f.encode();
        assert_eq!(enc.len(), 256);
        assert_eq!(enc[0], 255);
    }

    #[rstest]
    #[case(0)]
    #[case(256)]
    #[case(1000)]
    fn chunk_size_limits(#[case] size: usize) {
        assert_eq!(
            Frame::chunk(vec![0u8; size]).unwrap_err(),
            ProtocolError::ChunkSize(size)
        );
    }

    #[test]
    fn header_encoding() {
        let h = CommandHeader::new(Command::Send, "df0:foo").unwrap();
        assert_eq!(h.encode().as_ref(), b"\x18\x08df0:foo\x00");
        let h = CommandHeader::new(Command::Receive, "x").unwrap();
        assert_eq!(h.encode().as_ref(), b"\x17\x02x\x00");
    }

    #[rstest]
    #[case("")]
    #[case("nul\0inside")]
    #[case("caf\u{e9}")]
    fn header_rejects_bad_names(#[case] name: &str) {
        let e = CommandHeader::new(Command::Receive, name).unwrap_err();
        assert!(matches!(e, ProtocolError::InvalidName(_)));
    }

    #[test]
    fn header_name_length_limit() {
        let ok = "n".repeat(CommandHeader::MAX_NAME_LEN);
        let h = CommandHeader::new(Command::Send, &ok).unwrap();
        assert_eq!(h.encode()[1], 255);
        let too_long = "n".repeat(CommandHeader::MAX_NAME_LEN + 1);
        let _ = CommandHeader::new(Command::Send, &too_long).unwrap_err();
    }

    #[test]
    fn header_decode() {
        let h = CommandHeader::decode(24, b"ram:t\0").unwrap();
        assert_eq!(h.command(), Command::Send);
        assert_eq!(h.remote_name(), "ram:t");
        assert_eq!(
            CommandHeader::decode(99, b"x\0").unwrap_err(),
            ProtocolError::UnknownCommand(99)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn read_chunk_then_end() {
        let (port, _log) = ScriptedPort::new(vec![Step::data(b"\x03abc\x00")]);
        let mut link = SerialLink::new(port, CancellationToken::new());
        assert_eq!(
            super::read_frame(&mut link).await.unwrap(),
            Decoded::Chunk(ReceivedChunk {
                declared: 3,
                payload: b"abc".as_slice().into()
            })
        );
        assert_eq!(super::read_frame(&mut link).await.unwrap(), Decoded::End);
    }

    #[tokio::test(start_paused = true)]
    async fn read_idle_and_short() {
        let (port, _log) = ScriptedPort::new(vec![
            Step::Pause(Duration::from_secs(3)),
            Step::data(b"\x05ab"),
        ]);
        let mut link = SerialLink::new(port, CancellationToken::new());
        assert_eq!(super::read_frame(&mut link).await.unwrap(), Decoded::Idle);
        let Decoded::Chunk(chunk) = super::read_frame(&mut link).await.unwrap() else {
            panic!("expected a chunk");
        };
        assert!(chunk.is_short());
        assert_eq!(chunk.declared, 5);
        assert_eq!(chunk.payload.as_ref(), b"ab");
    }

    #[tokio::test(start_paused = true)]
    async fn header_roundtrip_over_link_skips_stray_probes() {
        let original = CommandHeader::new(Command::Receive, "s:startup-sequence").unwrap();
        let mut script = vec![Step::data(&[42, 42])];
        script.push(Step::Data(original.encode().to_vec()));
        let (port, _log) = ScriptedPort::new(script);
        let mut link = SerialLink::new(port, CancellationToken::new());
        let got = CommandHeader::read_from(&mut link).await.unwrap();
        assert_eq!(got, original);
    }

    #[tokio::test(start_paused = true)]
    async fn truncated_header() {
        let (port, _log) = ScriptedPort::new(vec![Step::data(b"\x17\x09abc")]);
        let mut link = SerialLink::new(port, CancellationToken::new());
        let e = CommandHeader::read_from(&mut link).await.unwrap_err();
        assert_eq!(
            e.downcast_ref::<ProtocolError>(),
            Some(&ProtocolError::ShortRead {
                expected: 9,
                got: 3
            })
        );
    }
}
