//! Statistics processing and output
// (c) 2025 Ross Younger

use human_repr::{HumanCount, HumanDuration, HumanThroughput};
use std::{fmt::Display, time::Duration};
use tracing::{debug, info, warn};

use crate::session::Outcome;

/// Human friendly output helper
#[derive(Debug, Clone, Copy)]
pub(crate) struct DataRate {
    /// Bytes per second; if None, we were unable to compute a rate.
    rate: Option<f64>,
}

impl DataRate {
    /// Standard constructor
    #[must_use]
    pub(crate) fn new(bytes: u64, time: Option<Duration>) -> Self {
        match time {
            None => Self { rate: None },
            Some(time) if time.is_zero() => Self { rate: None }, // divide by zero is not meaningful
            Some(time) => Self {
                #[allow(clippy::cast_precision_loss)]
                rate: Some((bytes as f64) / time.as_secs_f64()),
            },
        }
    }
    /// Accessor
    #[must_use]
    pub(crate) fn byte_rate(&self) -> Option<f64> {
        self.rate
    }
}

impl Display for DataRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.byte_rate() {
            None => f.write_str("unknown"),
            Some(rate) => rate.human_throughput_bytes().fmt(f),
        }
    }
}

/// Output the end-of-session statistics
pub(crate) fn process_statistics(outcome: &Outcome, show_statistics: bool) {
    let stats = &outcome.stats;
    let size = stats.payload_bytes.human_count_bytes();
    let rate = DataRate::new(stats.payload_bytes, Some(outcome.elapsed));
    info!(
        "{dir} {size} in {time}; average {rate}",
        dir = match outcome.direction {
            crate::session::Direction::Send => "Sent",
            crate::session::Direction::Receive => "Received",
        },
        time = outcome.elapsed.human_duration(),
    );

    if stats.framing_mismatches > 0 {
        warn!(
            "{} chunk(s) arrived shorter than declared; {} of {} bytes were written",
            stats.framing_mismatches, stats.file_bytes, stats.payload_bytes
        );
    }
    if stats.discarded_bytes > 0 {
        debug!(
            "{} unexpected byte(s) discarded while awaiting acknowledgements",
            stats.discarded_bytes
        );
    }

    if show_statistics {
        info!(
            "{chunks} chunks, CRC-32 {crc:08x}",
            chunks = stats.chunks.human_count_bare(),
            crc = stats.crc32
        );
        if let Some(attempts) = outcome.handshake_attempts {
            info!("Handshake took {attempts} attempt(s)");
        }
        info!(
            "Line traffic: {sent} sent, {received} received",
            sent = outcome.wire_sent.human_count_bytes(),
            received = outcome.wire_received.human_count_bytes(),
        );
        if stats.payload_bytes != 0 {
            let total = outcome.wire_sent + outcome.wire_received;
            #[allow(clippy::cast_precision_loss)]
            let overhead_pct =
                100. * total.saturating_sub(stats.payload_bytes) as f64 / stats.payload_bytes as f64;
            info!(
                "{total} line bytes for {payload} bytes payload ({overhead_pct:.2}% overhead)",
                payload = stats.payload_bytes,
            );
        }
    }
}
