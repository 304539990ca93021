//! Responder _(remote end)_ event loop
// (c) 2025 Ross Younger

use std::path::{Component, Path, PathBuf};

use anyhow::{Context as _, Result};
use indicatif::ProgressBar;
use tokio::fs::File;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace_span, Instrument as _};

use crate::config::Configuration;
use crate::engine::{receive_file, send_file};
use crate::protocol::{frame::CommandHeader, handshake, Command, Role};
use crate::session::{Direction, Outcome};
use crate::transport::{open_serial, LinkStream, SerialLink};
use crate::util::stats;

/// Responder main loop
///
/// Opens the configured serial device and serves one session from the current directory.
pub(crate) async fn server_main(
    config: &Configuration,
    cancel: CancellationToken,
    show_statistics: bool,
) -> Result<bool> {
    debug!("opening {}", config.device);
    let port = open_serial(&config.device)?;
    let mut link = SerialLink::new(port, cancel);
    let (_, outcome) = serve(&mut link, Path::new("."), &ProgressBar::hidden()).await?;
    stats::process_statistics(&outcome, show_statistics);
    Ok(true)
}

/// Serves exactly one session on an open link.
///
/// Remote file names are resolved relative to `root`, and may not leave it.
pub(crate) async fn serve<S: LinkStream>(
    link: &mut SerialLink<S>,
    root: &Path,
    progress: &ProgressBar,
) -> Result<(CommandHeader, Outcome)> {
    info!("waiting for handshake");
    handshake::answer(link).await?;

    let header = CommandHeader::read_from(link)
        .await
        .context("failed to read command header")?;
    let path = resolve(root, header.remote_name())?;
    info!("{} {}", header.command(), path.display());

    let start = Instant::now();
    let (direction, stats) = match header.command() {
        Command::Receive => {
            let stats = handle_get(link, &path, progress)
                .instrument(trace_span!("SERVER:GET", filename = header.remote_name()))
                .await?;
            (Direction::Send, stats)
        }
        Command::Send => {
            let stats = handle_put(link, &path, progress)
                .instrument(trace_span!("SERVER:PUT", destination = header.remote_name()))
                .await?;
            (Direction::Receive, stats)
        }
    };
    Ok((
        header,
        Outcome {
            direction,
            stats,
            handshake_attempts: None,
            elapsed: start.elapsed(),
            wire_sent: link.bytes_sent(),
            wire_received: link.bytes_received(),
        },
    ))
}

/// Maps a requested file name to a path under `root`.
///
/// Absolute names and `..` components are refused.
fn resolve(root: &Path, name: &str) -> Result<PathBuf> {
    let requested = Path::new(name);
    for component in requested.components() {
        match component {
            Component::Normal(_) | Component::CurDir => (),
            Component::Prefix(_) | Component::RootDir | Component::ParentDir => {
                anyhow::bail!("refusing {name:?}: outside the serving directory");
            }
        }
    }
    Ok(root.join(requested))
}

async fn handle_get<S: LinkStream>(
    link: &mut SerialLink<S>,
    path: &Path,
    progress: &ProgressBar,
) -> Result<crate::engine::TransferStats> {
    let mut file = File::open(path)
        .await
        .with_context(|| format!("failed to open {}", path.display()))?;
    if let Ok(meta) = file.metadata().await {
        progress.set_length(meta.len());
    }
    debug!("sending file payload");
    send_file(link, &mut file, Role::Responder, progress).await
}

async fn handle_put<S: LinkStream>(
    link: &mut SerialLink<S>,
    path: &Path,
    progress: &ProgressBar,
) -> Result<crate::engine::TransferStats> {
    let mut file = File::create(path)
        .await
        .with_context(|| format!("failed to create {}", path.display()))?;
    debug!("receiving file payload");
    let stats = receive_file(link, &mut file, Role::Responder, progress).await?;
    file.sync_all()
        .await
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(stats)
}
