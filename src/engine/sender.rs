//! Sending state machine
// (c) 2025 Ross Younger

use anyhow::{Context as _, Result};
use bytes::Bytes;
use indicatif::ProgressBar;
use tokio::io::{AsyncRead, AsyncReadExt as _};
use tracing::{debug, trace};

use super::TransferStats;
use crate::protocol::{frame::Frame, ProtocolError, Role, MAX_CHUNK};
use crate::transport::{LinkStream, SerialLink};

/// Sends the contents of `source` as a sequence of chunk frames, then the sentinel.
///
/// After each chunk this waits for the peer's acknowledgement before reading the next one
/// from `source`. Only the end of `source` finishes the transfer.
///
/// If `source` fails, the host aborts immediately. The responder writes the sentinel first,
/// so the host is not left waiting.
pub async fn send_file<S, R>(
    link: &mut SerialLink<S>,
    source: &mut R,
    role: Role,
    progress: &ProgressBar,
) -> Result<TransferStats>
where
    S: LinkStream,
    R: AsyncRead + Unpin,
{
    let mut stats = TransferStats::default();
    let mut crc = crc32fast::Hasher::new();
    let mut buf = [0u8; MAX_CHUNK];

    loop {
        let n = match fill_chunk(source, &mut buf).await {
            Ok(n) => n,
            Err(e) => {
                if role == Role::Responder {
                    Frame::end().write_to(link).await?;
                }
                return Err(e).context("failed to read local file");
            }
        };
        if n == 0 {
            debug!("finished");
            Frame::end().write_to(link).await?;
            break;
        }
        let chunk = &buf[..n];
        Frame::chunk(Bytes::copy_from_slice(chunk))?
            .write_to(link)
            .await?;
        stats.discarded_bytes += await_ack(link, role).await?;

        crc.update(chunk);
        stats.chunks += 1;
        stats.payload_bytes += n as u64;
        stats.file_bytes += n as u64;
        progress.inc(n as u64);
        trace!("sent {n:3} [{:8}] bytes", stats.payload_bytes);
    }

    stats.crc32 = crc.finalize();
    Ok(stats)
}

/// Reads from `source` until `buf` is full or the source is exhausted.
///
/// A short count therefore means end-of-file, and 0 means there was nothing left.
async fn fill_chunk<R: AsyncRead + Unpin>(source: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let count = source.read(&mut buf[filled..]).await?;
        if count == 0 {
            break;
        }
        filled += count;
    }
    Ok(filled)
}

/// Waits for the peer's acknowledgement byte.
///
/// Timeouts are retried indefinitely. What happens to any other byte depends on the role;
/// see the [module documentation](super).
///
/// # Return
/// The number of bytes discarded before the acknowledgement arrived
async fn await_ack<S: LinkStream>(link: &mut SerialLink<S>, role: Role) -> Result<u64> {
    let expected = role.peer_ack_byte();
    let mut discarded = 0;
    loop {
        match link.read_byte().await? {
            Some(b) if b == expected => return Ok(discarded),
            Some(got) if role == Role::Responder => {
                return Err(ProtocolError::SyncLost { expected, got }.into());
            }
            Some(got) => {
                debug!("discarding 0x{got:02x} while awaiting acknowledgement");
                discarded += 1;
            }
            None => trace!("awaiting acknowledgement"),
        }
    }
}
