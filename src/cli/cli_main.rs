//! Main CLI for ftc
// (c) 2025 Ross Younger

use std::ffi::OsString;
use std::process::ExitCode;

use super::args::{CliArgs, MainMode};
use crate::{
    cli::styles::{ERROR, RESET},
    client::{client_main, Parameters, MAX_UPDATE_FPS},
    config::{Configuration, Manager},
    server::server_main,
    util::{setup_tracing, trace_level, watchdog, ConsoleTraceType},
};

use anstream::{eprintln, println};
use anyhow::{Context as _, Result};
use indicatif::{MultiProgress, ProgressDrawTarget};
use tokio_util::sync::CancellationToken;
use tracing::{error_span, Instrument as _};

/// Main CLI entrypoint
///
/// Call this from `main`, passing the arguments to use.
/// Normally you will call `cli(std::env::args_os())` but you can pass in alternate arguments for CLI testing.
///
/// This function starts a tokio runtime and performs work in it.
#[must_use]
pub fn cli<I, T>(args: I) -> ExitCode
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    cli_inner(args)
        .inspect_err(|e| {
            if crate::util::tracing_is_initialised() {
                tracing::error!("{e:#}");
            } else {
                eprintln!("{ERROR}Error:{RESET} {e:#}");
            }
        })
        .map_or(ExitCode::FAILURE, |success| {
            if success {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        })
}

/// Inner CLI logic
///
/// # Return
/// true indicates success. false indicates a failure where the callee has output to stderr.
fn cli_inner<I, T>(args: I) -> Result<bool>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let Some(args) = parse_args(args)? else {
        return Ok(true); // help/version shown; exit
    };
    let mode = MainMode::from(&*args);

    // Now fold the arguments in with the config files and environment (which may fail)
    let config_manager = Manager::from(&args.config);

    match mode {
        MainMode::ShowConfigFiles => {
            println!("{:?}", Manager::config_files());
            Ok(true)
        }
        MainMode::ShowConfig => {
            println!("{}", config_manager.to_display_adapter::<Configuration>());
            let _ = config_manager.configuration()?;
            Ok(true)
        }
        MainMode::Server | MainMode::Client => {
            let config = config_manager.configuration()?;
            run_session(mode, &args, &config)
        }
    }
}

fn parse_args<I, T>(args: I) -> Result<Option<Box<CliArgs>>>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    use clap::error::ErrorKind::{DisplayHelp, DisplayVersion};
    match CliArgs::custom_parse(args) {
        Ok(args) => Ok(Some(Box::new(args))),
        Err(e) if matches!(e.kind(), DisplayHelp | DisplayVersion) => {
            let _ = e.print();
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

// MODE HANDLERS ///////////////////////////////////////////////////////////

#[tokio::main(flavor = "current_thread")]
async fn run_session(mode: MainMode, args: &CliArgs, config: &Configuration) -> Result<bool> {
    let params: &Parameters = &args.client_params;
    // Validate the file arguments before anything touches the line
    let session = if mode == MainMode::Client {
        Some(args.session()?)
    } else {
        None
    };

    let display = MultiProgress::with_draw_target(ProgressDrawTarget::stderr_with_hz(
        MAX_UPDATE_FPS,
    ));
    let console = if mode == MainMode::Client {
        ConsoleTraceType::Indicatif(display.clone())
    } else {
        ConsoleTraceType::Standard
    };
    setup_tracing(
        trace_level(params),
        console,
        params.log_file.as_deref(),
        config.time_format,
    )?; // to provoke error: set RUST_LOG=.

    let cancel = CancellationToken::new();
    let _watchdog_guard = cancel.clone().drop_guard();
    let _watchdog = tokio::spawn(watchdog::watch(
        cancel.clone(),
        config.deadline_duration(),
    ));

    if let Some(session) = session {
        client_main(config, display, params, session, cancel)
            .await
            .context("transfer failed")
    } else {
        server_main(config, cancel, params.statistics)
            .instrument(error_span!("REMOTE"))
            .await
            .context("[Server] failed")
    }
}
