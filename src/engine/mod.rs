// (c) 2025 Ross Younger

//! Transfer engine: the two directional state machines of the data phase
//!
//! Both are written for either [`Role`](crate::protocol::Role); the role decides which
//! acknowledgement byte is used and how strictly the peer's behaviour is checked.
//!
//! | | Host | Responder |
//! |---|---|---|
//! | Sender: non-ack byte while awaiting ack | discarded as noise | [`SyncLost`](crate::protocol::ProtocolError::SyncLost) |
//! | Receiver: payload shorter than declared | warning, carry on | [`ShortRead`](crate::protocol::ProtocolError::ShortRead) |

mod receiver;
mod sender;

pub use receiver::receive_file;
pub use sender::send_file;

/// Counters gathered over one transfer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferStats {
    /// Chunk frames sent or accepted
    pub chunks: u64,
    /// Sum of declared chunk lengths
    pub payload_bytes: u64,
    /// Bytes actually written to the local file (receiver), or read from it (sender)
    pub file_bytes: u64,
    /// Chunks which arrived with fewer bytes than declared
    pub framing_mismatches: u64,
    /// Non-acknowledgement bytes skipped while awaiting acknowledgements
    pub discarded_bytes: u64,
    /// CRC-32 (IEEE) of the file data
    pub crc32: u32,
}
