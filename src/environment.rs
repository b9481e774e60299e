//! Banner lines describing the machine a run happens on.
use chrono::Local;
use std::{env, path::PathBuf};

/// Supplies `(label, value)` pairs printed before the first test.
pub trait Environment {
    fn describe(&self) -> Vec<(String, String)>;
}

/// Facts about the current host and process.
pub struct HostEnvironment {
    pub work_directory: Option<PathBuf>,
}

impl Environment for HostEnvironment {
    fn describe(&self) -> Vec<(String, String)> {
        let work_directory = self
            .work_directory
            .clone()
            .or_else(|| env::current_dir().ok())
            .map(|dir| dir.display().to_string())
            .unwrap_or_default();

        vec![
            ("Trellis Version", env!("CARGO_PKG_VERSION").to_string()),
            ("OS", env::consts::OS.to_string()),
            ("Family", env::consts::FAMILY.to_string()),
            ("Arch", env::consts::ARCH.to_string()),
            ("Work Directory", work_directory),
            (
                "Date/Time",
                Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            ),
        ]
        .into_iter()
        .map(|(label, value)| (label.to_string(), value))
        .collect()
    }
}

/// Format one banner line.
pub fn banner_line(label: &str, value: &str) -> String {
    format!("[{}:\t{}]", label, value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn banner_format() {
        assert_eq!(banner_line("OS", "linux"), "[OS:\tlinux]");
    }

    #[test]
    fn host_environment_reports_work_directory() {
        let host = HostEnvironment {
            work_directory: Some(PathBuf::from("/tmp/suite")),
        };
        let facts = host.describe();
        assert!(facts
            .iter()
            .any(|(label, value)| label == "Work Directory" && value == "/tmp/suite"));
        assert!(facts.iter().any(|(label, _)| label == "Date/Time"));
    }
}
