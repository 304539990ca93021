//! Log output: console (optionally threaded through the progress bars) and log file
// (c) 2025 Ross Younger

use std::{
    fs::File,
    io::Write,
    path::Path,
    sync::atomic::{AtomicBool, Ordering},
    sync::{Arc, Mutex},
};

use anyhow::Context as _;
use indicatif::MultiProgress;
use serde::{de, Deserialize, Serialize};
use strum::VariantNames as _;
use tracing_subscriber::{
    fmt::{
        format::Writer,
        time::{ChronoLocal, ChronoUtc, FormatTime},
        MakeWriter,
    },
    prelude::*,
    EnvFilter, Layer, Registry,
};

static INITIALISED: AtomicBool = AtomicBool::new(false);

/// Filter for console output; also the file filter unless [`FILE_FILTER_VAR`] is set
const CONSOLE_FILTER_VAR: &str = "RUST_LOG";
/// Filter for the log file
const FILE_FILTER_VAR: &str = "RUST_LOG_FILE_DETAIL";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// The default level implied by `-d` / `-q`
pub(crate) fn trace_level(args: &crate::client::Parameters) -> &str {
    if args.debug {
        "debug"
    } else if args.quiet {
        "error"
    } else {
        "info"
    }
}

/// Selects the format of time stamps in output messages
#[derive(
    Copy,
    Clone,
    Debug,
    Default,
    Eq,
    PartialEq,
    strum::Display,
    strum::EnumString,
    strum::VariantNames,
    clap::ValueEnum,
    Serialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "kebab-case")]
pub enum TimeFormat {
    /// Local time, `2025-01-31 17:04:51L`
    #[default]
    Local,
    /// UTC, `2025-01-31 17:04:51Z`
    Utc,
    /// Local time in [RFC 3339](https://datatracker.ietf.org/doc/html/rfc3339) form, `2025-01-31T17:04:51.123456+00:00`
    Rfc3339,
}

impl<'de> Deserialize<'de> for TimeFormat {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.to_ascii_lowercase()
            .parse()
            .map_err(|_| de::Error::unknown_variant(&s, TimeFormat::VARIANTS))
    }
}

/// Timestamp writer for a [`TimeFormat`]
#[derive(Debug)]
enum Timer {
    Local(ChronoLocal),
    Utc(ChronoUtc),
}

impl From<TimeFormat> for Timer {
    fn from(format: TimeFormat) -> Self {
        match format {
            TimeFormat::Local => Timer::Local(ChronoLocal::new("%Y-%m-%d %H:%M:%SL".into())),
            TimeFormat::Utc => Timer::Utc(ChronoUtc::new("%Y-%m-%d %H:%M:%SZ".into())),
            TimeFormat::Rfc3339 => Timer::Local(ChronoLocal::rfc_3339()),
        }
    }
}

impl FormatTime for Timer {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        match self {
            Timer::Local(t) => t.format_time(w),
            Timer::Utc(t) => t.format_time(w),
        }
    }
}

/// Reads a filter from `var`, falling back to `ftc=<level>` when it is unset.
///
/// # Return
/// The filter, and whether it came from the environment
fn env_filter(var: &str, level: &str) -> anyhow::Result<(EnvFilter, bool)> {
    match std::env::var(var) {
        Ok(spec) => {
            let filter = EnvFilter::try_new(&spec)
                .with_context(|| format!("{var} (set in environment) was not understood"))?;
            Ok((filter, true))
        }
        Err(_) => Ok((EnvFilter::try_new(format!("ftc={level}"))?, false)),
    }
}

/// One formatted output. Log targets are shown only when the user chose the filter,
/// since otherwise every event is ours.
fn fmt_layer<W>(
    writer: W,
    (filter, show_target): (EnvFilter, bool),
    time_format: TimeFormat,
    ansi: bool,
) -> BoxedLayer
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    tracing_subscriber::fmt::layer()
        .compact()
        .with_target(show_target)
        .with_ansi(ansi)
        .with_timer(Timer::from(time_format))
        .with_writer(writer)
        .with_filter(filter)
        .boxed()
}

/// Where console output goes
#[derive(Debug)]
pub(crate) enum ConsoleTraceType {
    /// Straight to stderr (responder)
    Standard,
    /// Above the progress bars (host)
    Indicatif(MultiProgress),
}

/// Installs the global subscriber.
///
/// Only our own events are logged, at `level`, unless `RUST_LOG` says otherwise.
/// If this fails nothing has been installed, so the caller must report the error itself.
/// Second and later calls log a warning and do nothing.
pub(crate) fn setup(
    level: &str,
    display: ConsoleTraceType,
    log_file: Option<&Path>,
    time_format: TimeFormat,
) -> anyhow::Result<()> {
    if is_initialized() {
        tracing::warn!("tracing is already set up (ignoring)");
        return Ok(());
    }
    let layers = build_layers(
        level,
        display,
        log_file,
        time_format,
        console::colors_enabled_stderr(),
    )?;
    tracing_subscriber::registry().with(layers).init();
    INITIALISED.store(true, Ordering::Relaxed);
    Ok(())
}

fn build_layers(
    level: &str,
    console: ConsoleTraceType,
    log_file: Option<&Path>,
    time_format: TimeFormat,
    ansi: bool,
) -> anyhow::Result<Vec<BoxedLayer>> {
    let filter = env_filter(CONSOLE_FILTER_VAR, level)?;
    let mut layers = vec![match console {
        ConsoleTraceType::Standard => fmt_layer(std::io::stderr, filter, time_format, ansi),
        ConsoleTraceType::Indicatif(mp) => {
            fmt_layer(ProgressWriter::wrap(mp), filter, time_format, ansi)
        }
    }];

    if let Some(path) = log_file {
        let file = File::create(path)
            .with_context(|| format!("failed to open log file {}", path.display()))?;
        let filter = if std::env::var_os(FILE_FILTER_VAR).is_some() {
            env_filter(FILE_FILTER_VAR, level)?
        } else {
            env_filter(CONSOLE_FILTER_VAR, level)?
        };
        layers.push(fmt_layer(Arc::new(file), filter, time_format, false));
    }
    Ok(layers)
}

/// Has [`setup`] succeeded?
pub(crate) fn is_initialized() -> bool {
    INITIALISED.load(Ordering::Relaxed)
}

/// Writes log lines above the progress bars instead of through them
struct ProgressWriter(MultiProgress);

impl ProgressWriter {
    fn wrap(display: MultiProgress) -> Mutex<Self> {
        Mutex::new(Self(display))
    }
}

impl Write for ProgressWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let line = String::from_utf8_lossy(buf);
        let line = line.trim_end_matches('\n');
        if self.0.is_hidden() {
            eprintln!("{line}");
        } else {
            self.0.println(line)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use indicatif::{MultiProgress, ProgressDrawTarget};
    use pretty_assertions::assert_eq;
    use rusty_fork::rusty_fork_test;
    use serde::Deserialize;

    use super::{build_layers, setup, ConsoleTraceType, TimeFormat};
    use crate::client::Parameters;

    #[test]
    fn trace_levels() {
        use super::trace_level;
        let p = Parameters {
            debug: true,
            quiet: true,
            ..Default::default()
        };
        assert_eq!(trace_level(&p), "debug");
        let p = Parameters {
            quiet: true,
            ..Default::default()
        };
        assert_eq!(trace_level(&p), "error");
        assert_eq!(trace_level(&Parameters::default()), "info");
    }

    #[test]
    fn time_format_is_case_insensitive() {
        #[derive(Deserialize)]
        struct Test {
            tf: TimeFormat,
        }
        let t: Test = figment::Figment::from(figment::providers::Serialized::defaults(
            std::collections::HashMap::from([("tf", "UTC")]),
        ))
        .extract()
        .unwrap();
        assert_eq!(t.tf, TimeFormat::Utc);
        assert_eq!(TimeFormat::Rfc3339.to_string(), "rfc3339");
    }

    #[test]
    fn console_layer() {
        let layers = build_layers(
            "info",
            ConsoleTraceType::Indicatif(MultiProgress::new()),
            None,
            TimeFormat::Local,
            false,
        )
        .unwrap();
        assert_eq!(layers.len(), 1);
    }

    #[test]
    fn file_layer() {
        let dir = tempfile::tempdir().unwrap();
        let filename = dir.path().join("ftc.log");
        let layers = build_layers(
            "info",
            ConsoleTraceType::Standard,
            Some(&filename),
            TimeFormat::Utc,
            false,
        )
        .unwrap();
        assert_eq!(layers.len(), 2);
        assert!(filename.exists());
    }

    #[test]
    fn invalid_level() {
        let result = build_layers(
            "invalid_level",
            ConsoleTraceType::Standard,
            None,
            TimeFormat::Rfc3339,
            false,
        );
        assert!(result.is_err());
    }

    #[test]
    fn progress_writer_hidden() {
        use std::io::Write as _;
        let mp = MultiProgress::with_draw_target(ProgressDrawTarget::hidden());
        let mux = super::ProgressWriter::wrap(mp);
        let mut writer = mux.lock().unwrap();
        let msg = "remote:x -> y\n";
        assert_eq!(writer.write(msg.as_bytes()).unwrap(), msg.len());
        writer.flush().unwrap();
    }

    // global state, so these run in forks
    rusty_fork_test! {
        #[test]
        fn setup_twice() {
            setup("debug", ConsoleTraceType::Standard, None, TimeFormat::Utc).unwrap();
            assert!(super::is_initialized());
            setup("debug", ConsoleTraceType::Standard, None, TimeFormat::Utc).unwrap();
        }

        #[test]
        fn bad_rust_log_is_reported() {
            std::env::set_var("RUST_LOG", "ftc=bogus");
            assert!(setup("info", ConsoleTraceType::Standard, None, TimeFormat::Local).is_err());
            assert!(!super::is_initialized());
        }
    }
}
