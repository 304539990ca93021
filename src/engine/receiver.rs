//! Receiving state machine
// (c) 2025 Ross Younger

use anyhow::{Context as _, Result};
use indicatif::ProgressBar;
use tokio::io::{AsyncWrite, AsyncWriteExt as _};
use tracing::{debug, trace, warn};

use super::TransferStats;
use crate::protocol::{
    frame::{read_frame, Decoded},
    ProtocolError, Role,
};
use crate::transport::{LinkStream, SerialLink};

/// Receives chunk frames into `sink` until the sentinel arrives.
///
/// Each chunk is written (and flushed) to `sink` before it is acknowledged.
/// Silence on the line while waiting for a length byte is not an error; we keep waiting.
pub async fn receive_file<S, W>(
    link: &mut SerialLink<S>,
    sink: &mut W,
    role: Role,
    progress: &ProgressBar,
) -> Result<TransferStats>
where
    S: LinkStream,
    W: AsyncWrite + Unpin,
{
    let mut stats = TransferStats::default();
    let mut crc = crc32fast::Hasher::new();

    loop {
        let chunk = match read_frame(link).await? {
            Decoded::Idle => {
                trace!("waiting for data");
                continue;
            }
            Decoded::End => {
                debug!("finished");
                break;
            }
            Decoded::Chunk(chunk) => chunk,
        };
        let declared = usize::from(chunk.declared);
        trace!("reading {declared:3} bytes [total: {:9}]", stats.payload_bytes);
        if chunk.is_short() {
            let got = chunk.payload.len();
            if role == Role::Responder {
                return Err(ProtocolError::ShortRead {
                    expected: declared,
                    got,
                }
                .into());
            }
            warn!("framing mismatch: {declared} bytes expected, got {got}");
            stats.framing_mismatches += 1;
        }

        sink.write_all(&chunk.payload)
            .await
            .context("failed to write local file")?;
        sink.flush().await.context("failed to write local file")?;
        link.write_bytes(&[role.ack_byte()]).await?;

        crc.update(&chunk.payload);
        stats.chunks += 1;
        stats.payload_bytes += u64::from(chunk.declared);
        stats.file_bytes += chunk.payload.len() as u64;
        progress.inc(u64::from(chunk.declared));
    }

    sink.flush().await.context("failed to write local file")?;
    stats.crc32 = crc.finalize();
    Ok(stats)
}
