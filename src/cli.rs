use std::path::PathBuf;
use structopt::StructOpt;

use crate::logging::LogLevel;

/// Options for the CLI.
#[derive(StructOpt, Debug)]
#[structopt(name = "trellis", about = "Hierarchical test runner.")]
pub struct Opts {
    /// Test folder containing a trellis.toml.
    #[structopt(name = "TEST_DIR", parse(from_os_str))]
    pub dir: PathBuf,

    /// Include tests whose `<suite>:<path>` matches this regex.
    #[structopt(short = "i", long = "include")]
    pub include_filter: Option<String>,

    /// Exclude tests whose `<suite>:<path>` matches this regex.
    #[structopt(short = "e", long = "exclude")]
    pub exclude_filter: Option<String>,

    /// Send report lines over TCP instead of printing them.
    #[structopt(long)]
    pub network: bool,

    /// Host receiving report lines in network mode.
    #[structopt(long)]
    pub host: Option<String>,

    /// Port receiving report lines in network mode.
    #[structopt(long)]
    pub port: Option<u16>,

    /// Log level for diagnostics on stderr.
    #[structopt(long, default_value = "warn")]
    pub log_level: LogLevel,

    /// Disable colored output.
    #[structopt(long)]
    pub no_color: bool,

    /// Print the discovered tree without running anything.
    #[structopt(short = "n", long)]
    pub dry_run: bool,
}

/// Highest status a process can report.
pub const MAX_EXIT_CODE: i32 = 255;

/// Exit status for a run with `failed` failing cases: the count itself,
/// saturated at 255 so a failing run never wraps to 0.
pub fn exit_code(failed: usize) -> i32 {
    if failed > MAX_EXIT_CODE as usize {
        MAX_EXIT_CODE
    } else {
        failed as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_code_saturates() {
        assert_eq!(exit_code(0), 0);
        assert_eq!(exit_code(3), 3);
        assert_eq!(exit_code(255), 255);
        assert_eq!(exit_code(256), 255);
        assert_eq!(exit_code(100_000), 255);
    }

    #[test]
    fn parses_filters_and_network() {
        let opts = Opts::from_iter(&[
            "trellis", "tests", "-i", "Cat", "--network", "--port", "9000",
        ]);
        assert_eq!(opts.dir, PathBuf::from("tests"));
        assert_eq!(opts.include_filter.as_deref(), Some("Cat"));
        assert!(opts.network);
        assert_eq!(opts.port, Some(9000));
        assert_eq!(opts.log_level, LogLevel::Warn);
    }
}
