//! Cases and fixtures backed by shell commands.
//!
//! A command case runs `cmd` with `{}` replaced by its input path and compares
//! what it printed against a `.expect` file.
use std::{
    fs,
    path::{Path, PathBuf},
    process::Output,
    time::Duration,
};
use tokio::{process::Command, runtime, time};

use super::CaseScope;
use crate::{
    printer,
    test::{Failure, Fixture, TestCase},
};

/// Configuration of a test to be executed.
#[derive(Debug, Clone)]
pub struct CommandCase {
    /// Path of the test input.
    pub path: PathBuf,
    /// Command to be executed for the test.
    pub cmd: String,
    /// Directory to save/check the expect results for.
    /// If set to `None`, defaults to the directory containing `path`.
    pub expect_dir: Option<PathBuf>,
    pub timeout: Duration,
}

impl CommandCase {
    /// Format the output of the test into an expect string.
    /// An expect string is of the form:
    /// <contents of STDOUT>
    /// ---CODE---
    /// <exit code>
    /// ---STDERR---
    /// <contents of STDERR>
    pub fn format_expect_string(
        status: i32,
        stdout: &str,
        stderr: &str,
    ) -> String {
        let mut buf = String::new();
        buf.push_str(stdout);

        if status != 0 {
            buf.push_str("---CODE---\n");
            buf.push_str(&status.to_string());
            buf.push('\n');
        }

        if !stderr.is_empty() {
            buf.push_str("---STDERR---\n");
            buf.push_str(stderr);
        }

        buf
    }

    fn base(&self) -> PathBuf {
        match (&self.expect_dir, self.path.file_name()) {
            (Some(dir), Some(file)) => dir.join(file),
            _ => self.path.clone(),
        }
    }

    /// Path of the expect file.
    pub fn expect_file(&self) -> PathBuf {
        self.base().with_extension("expect")
    }

    /// Path of the skip file. Its presence marks the case as ignored.
    pub fn skip_file(&self) -> PathBuf {
        self.base().with_extension("skip")
    }

    /// The command line with every `{}` replaced by the input path.
    pub fn command_line(&self) -> String {
        self.cmd.replace("{}", &self.path.to_string_lossy())
    }

    /// Wrap this command into a test case named `name`. Relative paths are
    /// resolved against `root` when looking for the skip file.
    pub fn into_case(self, name: impl Into<String>, root: &Path) -> TestCase {
        let skip = self.skip_file();
        if root.join(&skip).exists() {
            TestCase::new(name, |_| Ok(())).ignore(format!("{} exists", skip.display()))
        } else {
            TestCase::new(name, move |scope| self.execute(scope))
        }
    }

    /// Run the command and compare its output with the expect file.
    pub fn execute(&self, scope: &mut CaseScope<'_, '_>) -> Result<(), Failure> {
        let out = run_shell(&self.command_line(), scope.work_directory(), self.timeout)?;

        let status = out.status.code().unwrap_or(-1);
        let stdout = String::from_utf8(out.stdout)
            .map_err(|err| Failure::error(format!("stdout is not utf-8: {}", err)))?;
        let stderr = String::from_utf8(out.stderr)
            .map_err(|err| Failure::error(format!("stderr is not utf-8: {}", err)))?;
        if !stdout.is_empty() {
            scope.write(&stdout);
        }

        let expect_string = Self::format_expect_string(status, &stdout, &stderr);
        let expect_path = scope.work_directory().join(self.expect_file());
        match fs::read_to_string(&expect_path) {
            Ok(contents) if contents == expect_string => Ok(()),
            Ok(contents) => Err(Failure::error(format!(
                "output does not match {}",
                self.expect_file().display()
            ))
            .with_trace(printer::gen_diff(&contents, &expect_string))),
            Err(_) => Err(Failure::inconclusive(format!(
                "{} is missing",
                self.expect_file().display()
            ))
            .with_trace(expect_string)),
        }
    }
}

/// A fixture that runs `cmd` and fails when it exits with a non-zero code.
pub fn command_fixture(cmd: String, timeout: Duration) -> Fixture {
    Fixture::new(move |work_directory| {
        let out = run_shell(&cmd, work_directory, timeout)?;
        if out.status.success() {
            return Ok(());
        }
        let failure = Failure::error(format!(
            "`{}` exited with {}",
            cmd,
            out.status.code().unwrap_or(-1)
        ));
        let stderr = String::from_utf8_lossy(&out.stderr);
        Err(if stderr.is_empty() {
            failure
        } else {
            failure.with_trace(stderr.into_owned())
        })
    })
}

/// Run `sh -c cmd` in `dir`, giving up after `timeout`.
fn run_shell(cmd: &str, dir: &Path, timeout: Duration) -> Result<Output, Failure> {
    let rt = runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| Failure::error(format!("cannot start runtime: {}", err)))?;

    let mut command = Command::new("sh");
    command.arg("-c").arg(cmd).current_dir(dir).kill_on_drop(true);

    rt.block_on(async { time::timeout(timeout, command.output()).await })
        .map_err(|_| Failure::error(format!("timeout after {}s", timeout.as_secs())))?
        .map_err(|err| Failure::error(format!("{}: {}", cmd, err)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn case(path: &str, expect_dir: Option<&str>) -> CommandCase {
        CommandCase {
            path: PathBuf::from(path),
            cmd: "cat {}".to_string(),
            expect_dir: expect_dir.map(PathBuf::from),
            timeout: Duration::from_secs(10),
        }
    }

    #[test]
    fn expect_string_layout() {
        assert_eq!(CommandCase::format_expect_string(0, "hi\n", ""), "hi\n");
        assert_eq!(
            CommandCase::format_expect_string(2, "", "oops\n"),
            "---CODE---\n2\n---STDERR---\noops\n"
        );
    }

    #[test]
    fn expect_file_location() {
        assert_eq!(
            case("cat-test/a.txt", None).expect_file(),
            PathBuf::from("cat-test/a.expect")
        );
        assert_eq!(
            case("cat-test/a.txt", Some("out")).expect_file(),
            PathBuf::from("out/a.expect")
        );
        assert_eq!(
            case("cat-test/a.txt", Some("out")).skip_file(),
            PathBuf::from("out/a.skip")
        );
    }

    #[test]
    fn command_line_substitutes_path() {
        assert_eq!(case("x.txt", None).command_line(), "cat x.txt");
    }

    #[test]
    fn fixture_reports_exit_code() {
        let dir = tempfile::tempdir().unwrap();
        let fixture = command_fixture("echo bad >&2; exit 3".to_string(), Duration::from_secs(10));
        let failure = fixture.run(dir.path()).unwrap_err();
        assert!(failure.message.contains("exited with 3"));
        assert_eq!(failure.stack_trace.as_deref(), Some("bad\n"));
        assert!(command_fixture("true".to_string(), Duration::from_secs(10))
            .run(dir.path())
            .is_ok());
    }

    #[test]
    fn slow_command_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let failure = run_shell("sleep 5", dir.path(), Duration::from_millis(100)).unwrap_err();
        assert!(failure.message.starts_with("timeout"));
    }
}
