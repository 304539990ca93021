// (c) 2025 Ross Younger
//! # 📖 Configuration management
//!
//! ftc obtains run-time configuration from the following sources, in order of precedence:
//! 1. Command-line options
//! 2. Environment variables, named for the option in upper case with an `FTC_` prefix
//!    (e.g. `FTC_DEVICE`, `FTC_HANDSHAKE_ATTEMPTS`)
//! 3. The user's configuration file (on Linux, `~/.config/ftc/ftc.toml`)
//! 4. The system-wide configuration file, `/etc/ftc.toml`
//! 5. Hard-wired defaults
//!
//! Run `ftc --config-files` for a list of which files we read,
//! and `ftc --show-config` to see the resulting settings and where each came from.
//!
//! ## File format
//!
//! Configuration files are TOML. Keys are the option names in `snake_case`.
//! See [`Configuration`] for the available options.
//!
//! ```toml
//! # The remote is on the Pi's primary UART
//! device = "/dev/ttyAMA0"
//!
//! # Give up if the remote doesn't answer within 30 probes (about a minute)
//! handshake_attempts = 30
//!
//! # Never let a session run for more than an hour
//! deadline = 3600
//!
//! time_format = "utc"
//! ```
//!
//! Unknown keys are ignored.
//!
//! The serial line settings themselves (19200 baud, 8N1, no flow control) are fixed by the
//! protocol and cannot be configured.

mod structure;
pub use structure::{Configuration, ConfigurationOverrides};

mod manager;
pub use manager::Manager;

mod prettyprint;
pub use prettyprint::DisplayAdapter;

use figment::{providers::Serialized, Metadata, Provider};

/// A [`figment::Provider`](https://docs.rs/figment/latest/figment/trait.Provider.html) that holds
/// the set of system default options
struct SystemDefault {}

impl SystemDefault {
    const META_NAME: &str = "default";
}

impl Provider for SystemDefault {
    fn metadata(&self) -> Metadata {
        figment::Metadata::named(Self::META_NAME)
    }

    fn data(
        &self,
    ) -> std::result::Result<
        figment::value::Map<figment::Profile, figment::value::Dict>,
        figment::Error,
    > {
        Serialized::defaults(Configuration::system_default()).data()
    }
}
