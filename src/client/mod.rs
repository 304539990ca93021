//! client-side (_host_) main loop and supporting structures
// (c) 2025 Ross Younger

mod options;
mod progress;

pub use options::Parameters;
pub(crate) use progress::MAX_UPDATE_FPS;

use anyhow::Result;
use indicatif::MultiProgress;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::Configuration;
use crate::session::{self, Direction, LocalFile, Session};
use crate::transport::{open_serial, SerialLink};
use crate::util::stats;

/// Main client mode event loop
///
/// The local file is opened before the serial port, so a bad local path never touches the line.
///
/// # Return
/// true indicates success. An Error is a failure we have not output or logged.
pub(crate) async fn client_main(
    config: &Configuration,
    display: MultiProgress,
    parameters: &Parameters,
    session: Session,
    cancel: CancellationToken,
) -> Result<bool> {
    let local = LocalFile::open(&session).await?;
    info!("{session}");

    debug!("opening {}", config.device);
    let port = open_serial(&config.device)?;
    let mut link = SerialLink::new(port, cancel);

    let message = match session.direction() {
        Direction::Send => session.local_path().display().to_string(),
        Direction::Receive => session.remote_name().to_string(),
    };
    let progress = progress::progress_for(&display, message, local.size(), parameters.quiet)?;

    let result = session::drive(
        &session,
        &mut link,
        local,
        config.handshake_limit(),
        &progress,
    )
    .await;
    progress.finish_and_clear();
    let outcome = result?;

    if !parameters.quiet {
        stats::process_statistics(&outcome, parameters.statistics);
    }
    Ok(true)
}
