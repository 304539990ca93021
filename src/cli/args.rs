//! Command line argument definition
// (c) 2025 Ross Younger

use std::ffi::OsString;

use anyhow::Result;
use clap::{ArgAction, Parser};

use crate::client::Parameters;
use crate::config::ConfigurationOverrides;
use crate::session::Session;

/// Usage text covering both directions
const USAGE: &str = "ftc [OPTIONS] <REMOTE_FILE> <LOCAL_FILE>\n       \
                     ftc [OPTIONS] -s <LOCAL_FILE> <REMOTE_FILE>\n       \
                     ftc [OPTIONS] --server";

/// Serial-line file transfer client and responder
#[derive(Debug, Parser, Clone)]
#[command(
    version,
    about,
    before_help = "Transfers a file to or from a device at the end of a serial line.",
    override_usage = USAGE,
    styles = super::styles::CLAP_STYLES,
)]
#[allow(clippy::struct_excessive_bools)]
pub(crate) struct CliArgs {
    // MODE SELECTION ======================================================================
    /// Runs the remote end of the protocol: answers one handshake, then serves one session
    /// from the current directory
    #[arg(long, action(ArgAction::SetTrue), help_heading("Modes"))]
    pub(crate) server: bool,

    /// Outputs the configuration, then exits
    #[arg(long, help_heading("Configuration"))]
    pub(crate) show_config: bool,

    /// Outputs the paths to configuration file(s), then exits
    #[arg(long, help_heading("Configuration"))]
    pub(crate) config_files: bool,

    // CONFIGURABLE OPTIONS ================================================================
    #[command(flatten)]
    /// The set of options which may be set in a config file or via command-line.
    pub(crate) config: ConfigurationOverrides,

    // CLIENT-ONLY OPTIONS =================================================================
    #[command(flatten)]
    /// Options specific to running as the host
    pub(crate) client_params: Parameters,

    /// Sends a local file to the remote. Without this, a remote file is received.
    #[arg(short, long, action, conflicts_with("server"), display_order(0))]
    pub(crate) send: bool,

    /// When receiving, the remote file name; when sending (`-s`), the local file
    #[arg(
        value_name = "FILE1",
        required_unless_present_any(["server", "show_config", "config_files"])
    )]
    pub(crate) first: Option<String>,

    /// When receiving, the local file to write; when sending (`-s`), the remote file name
    #[arg(
        value_name = "FILE2",
        required_unless_present_any(["server", "show_config", "config_files"])
    )]
    pub(crate) second: Option<String>,
}

impl CliArgs {
    /// Sets up and executes our parser
    pub(crate) fn custom_parse<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        CliArgs::try_parse_from(args)
    }

    /// Works out the session the user asked for
    pub(crate) fn session(&self) -> Result<Session> {
        let (Some(first), Some(second)) = (&self.first, &self.second) else {
            anyhow::bail!("two file arguments are required");
        };
        Ok(Session::from_args(self.send, first, second)?)
    }
}

/// Top-level operating mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MainMode {
    Server,
    Client,
    ShowConfig,
    ShowConfigFiles,
}

impl From<&CliArgs> for MainMode {
    fn from(args: &CliArgs) -> Self {
        if args.server {
            MainMode::Server
        } else if args.show_config {
            MainMode::ShowConfig
        } else if args.config_files {
            MainMode::ShowConfigFiles
        } else {
            MainMode::Client
        }
    }
}
