//! Options specific to client mode
// (c) 2025 Ross Younger

use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser, Clone, Default)]
/// Client-side options which may be provided on the command line, but are not persistent configuration options.
pub struct Parameters {
    /// Enable detailed debug output
    ///
    /// This has the same effect as setting `RUST_LOG=ftc=debug` in the environment.
    /// If present, `RUST_LOG` overrides this option.
    #[arg(short, long, action, help_heading("Debug"), display_order(0))]
    pub debug: bool,

    /// Log to a file
    ///
    /// By default the log receives everything printed to stderr.
    /// To override this behaviour, set the environment variable `RUST_LOG_FILE_DETAIL` (same semantics as `RUST_LOG`).
    #[arg(
        short('l'),
        long,
        action,
        value_name("FILE"),
        help_heading("Output"),
        next_line_help(true),
        display_order(0)
    )]
    pub log_file: Option<PathBuf>,

    /// Quiet mode
    ///
    /// Switches off progress display and statistics; reports only errors
    #[arg(short, long, action, conflicts_with("debug"), help_heading("Output"))]
    pub quiet: bool,

    /// Show additional transfer statistics
    #[arg(
        long("stats"),
        alias("statistics"),
        action,
        conflicts_with("quiet"),
        help_heading("Output"),
        display_order(0)
    )]
    pub statistics: bool,
}

#[cfg(test)]
mod test {
    use super::Parameters;
    use clap::Parser as _;
    use std::path::Path;

    #[test]
    fn output_options() {
        let p = Parameters::try_parse_from(["ftc", "-d", "--stats", "-l", "/tmp/ftc.log"]).unwrap();
        assert!(p.debug);
        assert!(p.statistics);
        assert!(!p.quiet);
        assert_eq!(p.log_file.as_deref(), Some(Path::new("/tmp/ftc.log")));
    }

    #[test]
    fn quiet_conflicts() {
        assert!(Parameters::try_parse_from(["ftc", "-q", "--stats"]).is_err());
        assert!(Parameters::try_parse_from(["ftc", "-q", "-d"]).is_err());
    }
}
