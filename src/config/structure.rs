//! Configuration structure
// (c) 2025 Ross Younger

use std::num::NonZeroU32;
use std::sync::LazyLock;
use std::time::Duration;

use anyhow::Result;
use clap::Args;
use figment::{providers::Serialized, Metadata, Provider};
use serde::{Deserialize, Serialize};
use struct_field_names_as_array::FieldNamesAsSlice;

use crate::cli::styles::{INFO, RESET};
use crate::util::TimeFormat;

/// The set of configurable options.
///
/// In configuration files these are TOML keys, e.g. `handshake_attempts = 10`.
/// In the environment they are upper case with an `FTC_` prefix, e.g. `FTC_DEVICE=/dev/ttyS1`.
/// On the command line they are kebab-case, e.g. `--handshake-attempts 10`.
///
/// [More details about the configuration mechanism](crate::config).
///
/// There is no `default()`.
/// The hard-wired defaults are available through [`Configuration::system_default()`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, FieldNamesAsSlice)]
pub struct Configuration {
    /// The serial device the remote is attached to
    pub device: String,

    /// How many handshake probes to send before giving up. 0 means keep trying forever.
    pub handshake_attempts: u32,

    /// Overall limit on the duration of a session, in seconds. 0 means no limit.
    pub deadline: u64,

    /// Time format to use in log messages
    pub time_format: TimeFormat,
}

static SYSTEM_DEFAULT_CONFIG: LazyLock<Configuration> = LazyLock::new(|| Configuration {
    device: "/dev/ttyUSB0".into(),
    handshake_attempts: 0,
    deadline: 0,
    time_format: TimeFormat::Local,
});

impl Configuration {
    /// Returns the system default settings
    #[must_use]
    pub fn system_default() -> &'static Self {
        &SYSTEM_DEFAULT_CONFIG
    }

    /// The handshake attempt limit, if there is one
    #[must_use]
    pub fn handshake_limit(&self) -> Option<NonZeroU32> {
        NonZeroU32::new(self.handshake_attempts)
    }

    /// The session deadline, if there is one
    #[must_use]
    pub fn deadline_duration(&self) -> Option<Duration> {
        (self.deadline != 0).then(|| Duration::from_secs(self.deadline))
    }

    /// Performs additional validation checks on a configuration object
    pub(crate) fn try_validate(&self) -> Result<()> {
        if self.device.trim().is_empty() {
            anyhow::bail!("The serial device ({INFO}device{RESET}) must not be empty");
        }
        Ok(())
    }

    /// Performs additional validation checks on the configuration.
    pub(crate) fn validate(self) -> Result<Self> {
        self.try_validate()?;
        Ok(self)
    }
}

/// Configuration options given on the command line.
///
/// Anything not given here falls through to the configuration files, the environment
/// and the system defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Args, Serialize)]
pub struct ConfigurationOverrides {
    /// The serial device the remote is attached to
    /// [default: /dev/ttyUSB0]
    #[arg(short = 'D', long, value_name = "PATH", help_heading("Configuration"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,

    /// Gives up after this many unanswered handshake probes. 0 means keep trying forever.
    /// [default: 0]
    #[arg(long, value_name = "N", help_heading("Configuration"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handshake_attempts: Option<u32>,

    /// Aborts the session if it has not completed within this many seconds. 0 means no limit.
    /// [default: 0]
    #[arg(long, value_name = "SECONDS", help_heading("Configuration"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<u64>,

    /// Time format to use in log messages
    /// [default: local]
    #[arg(long, value_name = "FORMAT", help_heading("Configuration"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_format: Option<TimeFormat>,
}

impl Provider for ConfigurationOverrides {
    fn metadata(&self) -> Metadata {
        Metadata::named("command line")
    }

    fn data(
        &self,
    ) -> std::result::Result<
        figment::value::Map<figment::Profile, figment::value::Dict>,
        figment::Error,
    > {
        Serialized::defaults(self).data()
    }
}
