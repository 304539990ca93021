// (c) 2025 Ross Younger

//! 📖 The serial file transfer protocol
//!
//! ## Overview
//!
//! Two machines are joined by a serial line. The _host_ (the machine running `ftc`) drives the
//! session; the _responder_ on the far end (historically an Amiga running the FTS program,
//! or `ftc --server`) answers.
//!
//! A session has three phases.
//!
//! ### 1. Handshake
//!
//! The host writes the probe byte `0x2A` (42) and waits up to 2 seconds for one reply byte.
//! A reply of `0x17` means the responder is ready. Anything else, or nothing at all,
//! and the host probes again. See [`handshake`].
//!
//! ### 2. Command header
//!
//! The host writes, exactly once:
//!
//! ```text
//! [command][name length + 1][name bytes ...][0x00]
//! ```
//!
//! * `command` is 23 if the host wants to receive the named remote file, or 24 if it is about to send one
//!   (see [`Command`])
//! * the name is ASCII with no embedded NUL, at most 254 bytes
//!
//! ### 3. Data phase
//!
//! Whoever holds the file sends it as a sequence of chunk frames:
//!
//! ```text
//! [length 1-255][payload ...]
//! ```
//!
//! The receiving side acknowledges every chunk with a single byte, _after_ it has stored the payload:
//! `0x17` when the responder is receiving, `0x2A` when the host is receiving.
//! The sender does not send another chunk until it has seen the acknowledgement.
//!
//! The transfer ends when the sender writes a zero length byte, the _sentinel frame_.
//! The sentinel is not acknowledged.
//!
//! See [`frame`] for the encoding.
//!
//! ## Failure behaviour
//!
//! There is no abort message and no retransmission.
//!
//! * A host that receives fewer payload bytes than the length byte declared logs a framing mismatch
//!   and carries on with the bytes it got.
//! * A host waiting for an acknowledgement discards any other byte it reads, as line noise.
//! * A stalled peer shows up only as a read that never completes. Use a [session deadline](crate::Configuration::deadline)
//!   if you need an upper bound.
//!
//! ## Limitations
//!
//! No authentication, encryption, resumption, multi-file transfer or protocol versioning.
//! Adding any form of recovery message on framing errors would break compatibility with existing responders.

pub mod frame;
pub mod handshake;

/// Handshake probe sent by the host. Also the host's chunk acknowledgement.
pub const SYNC_PROBE: u8 = 0x2A;

/// The responder's handshake reply. Also the responder's chunk acknowledgement.
pub const REMOTE_ACK: u8 = 0x17;

/// Largest payload one chunk frame can carry
pub const MAX_CHUNK: usize = 255;

/// The length byte which marks the end of a transfer
pub const END_OF_TRANSFER: u8 = 0;

/// Command codes in the command header
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::FromRepr)]
#[repr(u8)]
pub enum Command {
    /// The host requests the named remote file (responder sends)
    Receive = 23,
    /// The host is about to send a file to be stored under the given name (responder receives)
    Send = 24,
}

impl Command {
    /// The on-wire code
    #[must_use]
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// Which end of the line we are
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum Role {
    /// The machine running the client, which probes and issues the command
    Host,
    /// The far end, which answers the probe and serves the command
    Responder,
}

impl Role {
    /// The byte this role writes to acknowledge a chunk
    #[must_use]
    pub fn ack_byte(self) -> u8 {
        match self {
            Role::Host => SYNC_PROBE,
            Role::Responder => REMOTE_ACK,
        }
    }

    /// The byte this role expects from its peer as a chunk acknowledgement
    #[must_use]
    pub fn peer_ack_byte(self) -> u8 {
        match self {
            Role::Host => REMOTE_ACK,
            Role::Responder => SYNC_PROBE,
        }
    }
}

/// Protocol-level failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// The configured handshake attempt limit was reached
    #[error("no handshake reply after {attempts} attempts")]
    HandshakeExhausted {
        /// Probes sent
        attempts: u32,
    },
    /// Fewer bytes arrived than the protocol required
    #[error("expected {expected} bytes, got {got}")]
    ShortRead {
        /// Bytes required
        expected: usize,
        /// Bytes that arrived before the timeout
        got: usize,
    },
    /// The peer sent something other than the acknowledgement
    #[error("sync lost: expected acknowledgement 0x{expected:02x}, got 0x{got:02x}")]
    SyncLost {
        /// The acknowledgement byte
        expected: u8,
        /// What we got instead
        got: u8,
    },
    /// The command header named an unknown command
    #[error("command {0} is not implemented")]
    UnknownCommand(u8),
    /// The remote filename cannot be sent in a command header
    #[error("invalid remote filename: {0}")]
    InvalidName(&'static str),
    /// Attempt to build a chunk frame with an impossible payload size
    #[error("chunk payload of {0} bytes is out of range 1-255")]
    ChunkSize(usize),
}
