//! Progress bar styling
// (c) 2025 Ross Younger

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

/// Maximum update frequency we will use for the progress display
pub(crate) const MAX_UPDATE_FPS: u8 = 20;

/// A single-line style format for Indicatif which should cover most situations.
///
/// ```text
/// 11111111111111111111111111111111111111111111111111111111111111111111111111111111
/// filename [==========================            ] 2m30s @ 1.9kB/s [70%/124.3kB]
/// extremely-long-filename-no-really-very-long [== ] 2m30s @ 1.9kB/s [70%/124.3kB]
/// 11111111111111111111111111111111111111111111111111111111111111111111111111111111
/// ```
const PROGRESS_STYLE_COMPACT: &str =
    "{msg:.dim} {wide_bar:.cyan} {eta} @ {decimal_bytes_per_sec} [{decimal_total_bytes:.dim}]";

/// Space to allow for the filename
///
/// We need about 35 characters for the data readout.
/// A useful progress bar needs maybe 20 characters.
const DATA_AND_PROGRESS: usize = 55;

/// A double-line style format for Indicatif for use when the filename is too long.
///
/// ```text
/// 11111111111111111111111111111111111111111111111111111111111111111111111111111111
/// extremely-long-filename-no-really-very-long                        [124.3kB]
/// [==========================                                  ] 2m30s @ 1.9kB/s
/// 11111111111111111111111111111111111111111111111111111111111111111111111111111111
/// ```
const PROGRESS_STYLE_OVERLONG: &str = "{wide_msg:.dim} [{decimal_total_bytes:.dim}]\n{wide_bar:.cyan} {eta} @ {decimal_bytes_per_sec}";

/// Indicatif template for transfers of unknown length (i.e. receiving)
pub(crate) const SPINNER_TEMPLATE: &str =
    "{spinner} {wide_msg:.dim} {decimal_bytes} @ {decimal_bytes_per_sec}";

/// Determine and retrieve the appropriate progress style to use
pub(crate) fn style_for(msg_size: usize) -> &'static str {
    let term_width = console::Term::stderr().size().1 as usize; // this returns a reasonable default if it can't detect
    if msg_size + DATA_AND_PROGRESS > term_width {
        PROGRESS_STYLE_OVERLONG
    } else {
        PROGRESS_STYLE_COMPACT
    }
}

/// Creates the progress display for a transfer.
///
/// With a known `total` this is a bar; otherwise a spinner with a running byte count.
pub(crate) fn progress_for(
    display: &MultiProgress,
    message: String,
    total: Option<u64>,
    quiet: bool,
) -> anyhow::Result<ProgressBar> {
    if quiet {
        return Ok(ProgressBar::hidden());
    }
    let bar = match total {
        Some(len) => ProgressBar::new(len)
            .with_style(ProgressStyle::with_template(style_for(message.len()))?),
        None => ProgressBar::new_spinner().with_style(ProgressStyle::with_template(SPINNER_TEMPLATE)?),
    };
    Ok(display.add(bar.with_message(message)))
}
