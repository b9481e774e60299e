//! The default picker: gathers command-backed tests from a `trellis.toml`
//! file.
use regex::Regex;
use serde::Deserialize;
use std::{
    path::{Path, PathBuf},
    time::Duration,
};
use tracing::debug;

use super::{Discover, Settings};
use crate::{
    config::Options,
    errors::TrellisError,
    executor::command::{command_fixture, CommandCase},
    test::TestSuite,
};

/// Name of the configuration file looked up in a module directory.
pub const CONFIG_FILE: &str = "trellis.toml";

/// Seconds a command may run when the suite does not say otherwise.
pub const DEFAULT_TIMEOUT: u64 = 1200;

/// Configuration for a single trellis run.
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Version of the trellis tool this configuration is compatible with.
    pub ver: String,
    /// Runner options, overridable from the environment.
    #[serde(default)]
    pub runner: Options,
    /// Test suite configurations.
    #[serde(default)]
    pub suites: Vec<SuiteConfig>,
}

/// Configuration for a test suite.
#[derive(Debug, Clone, Deserialize)]
pub struct SuiteConfig {
    /// Name of this suite.
    pub name: String,
    /// Paths of input files. Globs are expanded relative to the config file.
    #[serde(default)]
    pub paths: Vec<String>,
    /// Command to execute. The pattern `{}` in this string is replaced with
    /// the matching path.
    pub cmd: Option<String>,
    /// Optional directory to store the generated .expect files.
    pub expect_dir: Option<PathBuf>,
    /// Optional timeout in seconds.
    pub timeout: Option<u64>,
    /// Command run before any case of the suite.
    pub setup: Option<String>,
    /// Command run after every case of the suite.
    pub teardown: Option<String>,
    /// Nested suites.
    #[serde(default)]
    pub suites: Vec<SuiteConfig>,
}

impl SuiteConfig {
    fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout.unwrap_or(DEFAULT_TIMEOUT))
    }
}

impl Config {
    /// Create a configuration by reading the `trellis.toml` file in
    /// `conf_dir`. Ensures that the version number it names matches the
    /// version of this crate.
    pub fn from_path(conf_dir: &Path) -> Result<Self, TrellisError> {
        let conf_path = conf_dir.join(CONFIG_FILE);
        let contents =
            std::fs::read_to_string(&conf_path).map_err(|_| TrellisError::Config {
                path: conf_path.clone(),
                msg: format!(
                    "file is missing. Trellis expects a directory with a {} file.",
                    CONFIG_FILE
                ),
            })?;

        let conf: Config = toml::from_str(&contents).map_err(|err| TrellisError::Config {
            path: conf_path.clone(),
            msg: err.to_string(),
        })?;

        if env!("CARGO_PKG_VERSION") != conf.ver {
            return Err(TrellisError::Config {
                path: conf_path,
                msg: format!(
                    "version mismatch. Configuration requires: {}, tool version: {}.",
                    conf.ver,
                    env!("CARGO_PKG_VERSION")
                ),
            });
        }

        Ok(conf)
    }
}

/// Include and exclude regexes matched against `<suite full name>:<path>`.
#[derive(Debug, Default)]
struct Filter {
    include: Option<Regex>,
    exclude: Option<Regex>,
}

impl Filter {
    fn from_settings(settings: Option<&Settings>) -> Result<Self, TrellisError> {
        let regex = |key: &str| -> Result<Option<Regex>, TrellisError> {
            match settings.and_then(|s| s.get(key)) {
                Some(pattern) => Ok(Some(Regex::new(pattern)?)),
                None => Ok(None),
            }
        };
        Ok(Filter {
            include: regex("include")?,
            exclude: regex("exclude")?,
        })
    }

    fn is_active(&self) -> bool {
        self.include.is_some() || self.exclude.is_some()
    }

    fn keep(&self, name: &str) -> bool {
        self.include.as_ref().map_or(true, |re| re.is_match(name))
            && self.exclude.as_ref().map_or(true, |re| !re.is_match(name))
    }
}

/// Reads `<module>/trellis.toml` and builds one suite per `[[suites]]` entry.
///
/// Recognised settings: `name` (root suite name, defaults to the directory
/// name), `include` and `exclude` (regexes).
#[derive(Debug, Default)]
pub struct Picker {
    config: Option<Config>,
}

impl Picker {
    pub fn new() -> Self {
        Picker { config: None }
    }

    /// Use an already parsed configuration instead of reading
    /// `<module>/trellis.toml`. The module is still the root for paths.
    pub fn with_config(config: Config) -> Self {
        Picker {
            config: Some(config),
        }
    }

    fn build_suite(
        &self,
        conf: &SuiteConfig,
        parent: &str,
        root: &Path,
        filter: &Filter,
    ) -> Result<TestSuite, TrellisError> {
        let full_name = format!("{}.{}", parent, conf.name);
        let timeout = conf.timeout();
        let mut suite = TestSuite::new(conf.name.clone());
        if let Some(cmd) = &conf.setup {
            suite = suite.with_set_up(command_fixture(cmd.clone(), timeout));
        }
        if let Some(cmd) = &conf.teardown {
            suite = suite.with_tear_down(command_fixture(cmd.clone(), timeout));
        }

        let paths = expand_paths(root, &conf.paths)?;
        let cmd = match (&conf.cmd, paths.is_empty()) {
            (Some(cmd), _) => cmd.clone(),
            (None, true) => String::new(),
            (None, false) => {
                return Err(TrellisError::discovery(format!(
                    "suite `{}` lists paths but no cmd",
                    full_name
                )))
            }
        };

        for path in paths {
            let name = path.to_string_lossy().into_owned();
            if !filter.keep(&format!("{}:{}", full_name, name)) {
                debug!("filtered out {}:{}", full_name, name);
                continue;
            }
            let case = CommandCase {
                path,
                cmd: cmd.clone(),
                expect_dir: conf.expect_dir.clone(),
                timeout,
            };
            suite.add(case.into_case(name, root));
        }

        for nested in &conf.suites {
            let nested = self.build_suite(nested, &full_name, root, filter)?;
            if filter.is_active() && nested.test_case_count() == 0 {
                continue;
            }
            suite.add(nested);
        }
        Ok(suite)
    }
}

impl Discover for Picker {
    fn discover(
        &self,
        module: &str,
        settings: Option<&Settings>,
    ) -> Result<TestSuite, TrellisError> {
        let root = Path::new(module);
        let read;
        let conf = match &self.config {
            Some(conf) => conf,
            None => {
                read = Config::from_path(root)?;
                &read
            }
        };
        let filter = Filter::from_settings(settings)?;

        let name = match settings.and_then(|s| s.get("name")) {
            Some(name) => name.clone(),
            None => root_name(root),
        };

        let mut suite = TestSuite::new(name.clone());
        for entry in &conf.suites {
            let child = self.build_suite(entry, &name, root, &filter)?;
            if filter.is_active() && child.test_case_count() == 0 {
                continue;
            }
            suite.add(child);
        }
        Ok(suite)
    }
}

fn root_name(root: &Path) -> String {
    root.canonicalize()
        .ok()
        .and_then(|dir| dir.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "trellis".to_string())
}

/// Expand glob patterns below `root` into paths relative to `root`.
fn expand_paths(root: &Path, patterns: &[String]) -> Result<Vec<PathBuf>, TrellisError> {
    let mut out = Vec::new();
    for pattern in patterns {
        let full = root.join(pattern);
        for entry in glob::glob(&full.to_string_lossy())? {
            let path = entry.map_err(|err| TrellisError::Io(err.into()))?;
            let rel = path.strip_prefix(root).map(Path::to_path_buf).unwrap_or(path);
            out.push(rel);
        }
    }
    Ok(out)
}
