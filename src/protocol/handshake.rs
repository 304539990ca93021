// (c) 2025 Ross Younger

//! Handshake controller
//!
//! The host writes [`SYNC_PROBE`] and reads one reply byte, over and over, until the reply is
//! [`REMOTE_ACK`]. By default there is no limit on the number of attempts: serial peripherals
//! are often switched on (or their program started) long after the host.

use std::num::NonZeroU32;

use anyhow::Result;
use tracing::{debug, trace};

use super::{ProtocolError, REMOTE_ACK, SYNC_PROBE};
use crate::transport::{LinkStream, SerialLink};

/// Host-side handshake state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    /// Still probing; `attempts` probes have gone unanswered
    Probing {
        /// Probes sent so far
        attempts: u32,
    },
    /// The remote acknowledged. This is terminal.
    Synced {
        /// Probes sent, including the one that was answered
        attempts: u32,
    },
}

impl Default for HandshakeState {
    fn default() -> Self {
        HandshakeState::Probing { attempts: 0 }
    }
}

impl HandshakeState {
    /// Advances the state machine with the reply to one probe (`None` if the read timed out)
    #[must_use]
    pub fn on_reply(self, reply: Option<u8>) -> Self {
        match self {
            HandshakeState::Probing { attempts } => {
                let attempts = attempts.saturating_add(1);
                if reply == Some(REMOTE_ACK) {
                    HandshakeState::Synced { attempts }
                } else {
                    HandshakeState::Probing { attempts }
                }
            }
            synced @ HandshakeState::Synced { .. } => synced,
        }
    }

    /// Accessor
    #[must_use]
    pub fn attempts(self) -> u32 {
        match self {
            HandshakeState::Probing { attempts } | HandshakeState::Synced { attempts } => attempts,
        }
    }

    /// Accessor
    #[must_use]
    pub fn is_synced(self) -> bool {
        matches!(self, HandshakeState::Synced { .. })
    }
}

/// Probes the remote until it acknowledges.
///
/// If `limit` is set, gives up with [`ProtocolError::HandshakeExhausted`] after that many probes.
///
/// # Return
/// The number of probes sent
pub async fn probe<S: LinkStream>(
    link: &mut SerialLink<S>,
    limit: Option<NonZeroU32>,
) -> Result<u32> {
    let mut state = HandshakeState::default();
    loop {
        debug!("handshake...");
        link.write_bytes(&[SYNC_PROBE]).await?;
        let reply = link.read_byte().await?;
        trace!("handshake reply: {reply:02x?}");
        state = state.on_reply(reply);
        if state.is_synced() {
            break;
        }
        if limit.is_some_and(|l| state.attempts() >= l.get()) {
            return Err(ProtocolError::HandshakeExhausted {
                attempts: state.attempts(),
            }
            .into());
        }
    }
    debug!("handshake complete after {} attempt(s)", state.attempts());
    Ok(state.attempts())
}

/// Responder side: waits for a probe, then acknowledges it.
///
/// Anything other than a probe is ignored, as is silence.
pub async fn answer<S: LinkStream>(link: &mut SerialLink<S>) -> Result<()> {
    loop {
        match link.read_byte().await? {
            Some(SYNC_PROBE) => break,
            other => trace!("waiting for handshake, got {other:02x?}"),
        }
    }
    link.write_bytes(&[REMOTE_ACK]).await?;
    debug!("handshake answered");
    Ok(())
}
