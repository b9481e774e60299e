//! Observers of a run.
//!
//! The dispatcher only knows about [Listener]. A [Reporter] also gets told
//! when suites start and finish; [crate::runner::ReporterBridge] derives those
//! events from the plain listener stream.
use colored::*;
use tracing::warn;

use crate::{
    executor::results::{FailureSite, Status, SuiteResult, TestResult},
    sink::Writer,
    test::{TestNode, TestSuite},
};

/// A chunk of text emitted by a running case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestOutput {
    /// Full name of the case that produced the text.
    pub test_name: String,
    pub text: String,
}

/// Lifecycle events of a run.
pub trait Listener {
    /// Fired once per dispatched node, before it runs.
    fn test_started(&mut self, test: &TestNode);
    /// Fired once per dispatched node with its final result.
    fn test_finished(&mut self, result: &TestResult);
    /// Fired for every chunk of text a case emits.
    fn test_output(&mut self, output: &TestOutput);
}

/// A listener that also wants suite boundaries.
pub trait Reporter: Listener {
    fn test_suite_started(&mut self, suite: &TestSuite);
    fn test_suite_finished(&mut self, suite: &TestSuite, result: &SuiteResult);
}

impl<L: Listener + ?Sized> Listener for &mut L {
    fn test_started(&mut self, test: &TestNode) {
        (**self).test_started(test)
    }

    fn test_finished(&mut self, result: &TestResult) {
        (**self).test_finished(result)
    }

    fn test_output(&mut self, output: &TestOutput) {
        (**self).test_output(output)
    }
}

impl<L: Listener + ?Sized> Listener for Box<L> {
    fn test_started(&mut self, test: &TestNode) {
        (**self).test_started(test)
    }

    fn test_finished(&mut self, result: &TestResult) {
        (**self).test_finished(result)
    }

    fn test_output(&mut self, output: &TestOutput) {
        (**self).test_output(output)
    }
}

impl<R: Reporter + ?Sized> Reporter for &mut R {
    fn test_suite_started(&mut self, suite: &TestSuite) {
        (**self).test_suite_started(suite)
    }

    fn test_suite_finished(&mut self, suite: &TestSuite, result: &SuiteResult) {
        (**self).test_suite_finished(suite, result)
    }
}

impl<R: Reporter + ?Sized> Reporter for Box<R> {
    fn test_suite_started(&mut self, suite: &TestSuite) {
        (**self).test_suite_started(suite)
    }

    fn test_suite_finished(&mut self, suite: &TestSuite, result: &SuiteResult) {
        (**self).test_suite_finished(suite, result)
    }
}

/// Delivers every event to `A` and then to `B`.
pub struct Fanout<A, B>(pub A, pub B);

impl<A: Listener, B: Listener> Listener for Fanout<A, B> {
    fn test_started(&mut self, test: &TestNode) {
        self.0.test_started(test);
        self.1.test_started(test);
    }

    fn test_finished(&mut self, result: &TestResult) {
        self.0.test_finished(result);
        self.1.test_finished(result);
    }

    fn test_output(&mut self, output: &TestOutput) {
        self.0.test_output(output);
        self.1.test_output(output);
    }
}

/// The default reporter: human readable lines on a [Writer].
pub struct TextReporter {
    writer: Writer,
    color: bool,
}

impl TextReporter {
    pub fn new(writer: Writer) -> Self {
        Self {
            writer,
            color: true,
        }
    }

    /// Do not emit terminal escape codes.
    pub fn plain(mut self) -> Self {
        self.color = false;
        self
    }

    fn line(&self, text: &str) {
        if let Err(err) = self.writer.write_line(text) {
            warn!("reporter could not write: {}", err);
        }
    }

    fn paint(&self, text: &str, status: Status) -> String {
        if !self.color {
            return text.to_string();
        }
        match status {
            Status::Passed => text.green().to_string(),
            Status::Failed => text.red().to_string(),
            Status::Skipped | Status::Inconclusive => text.yellow().to_string(),
        }
    }

    fn symbol(status: Status) -> &'static str {
        match status {
            Status::Passed => "✓",
            Status::Failed => "✗",
            Status::Skipped => "○",
            Status::Inconclusive => "?",
        }
    }

    fn indent(text: &str, prefix: &str) -> String {
        text.lines()
            .map(|line| format!("{}{}", prefix, line))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Listener for TextReporter {
    fn test_started(&mut self, _test: &TestNode) {}

    fn test_finished(&mut self, result: &TestResult) {
        let status = result.status();
        let mut buf = self.paint(
            &format!("{} {}", Self::symbol(status), result.full_name()),
            status,
        );
        let explain = match (result, result.site()) {
            (_, None) => false,
            (TestResult::Case(_), Some(_)) => true,
            (TestResult::Suite(_), Some(site)) => site != FailureSite::Child,
        };
        if !explain {
            // Passing cases and suites whose status came from their children
            // are summarised elsewhere.
            if let TestResult::Case(_) = result {
                self.line(&buf);
            }
            return;
        }
        buf.push_str(&format!(" - {}", result.display_message()));
        self.line(&buf);
        if let Some(trace) = result.stack_trace() {
            self.line(&Self::indent(trace, "    "));
        }
    }

    fn test_output(&mut self, output: &TestOutput) {
        let text = output.text.trim_end_matches('\n');
        if !text.is_empty() {
            self.line(&Self::indent(text, "  | "));
        }
    }
}

impl Reporter for TextReporter {
    fn test_suite_started(&mut self, suite: &TestSuite) {
        let header = format!("{} ({} tests)", suite.full_name(), suite.test_case_count());
        if self.color {
            self.line(&header.bold().to_string());
        } else {
            self.line(&header);
        }
    }

    fn test_suite_finished(&mut self, suite: &TestSuite, result: &SuiteResult) {
        let summary = format!(
            "  {}: {} passing / {} failing / {} skipped / {} inconclusive",
            suite.full_name(),
            result.pass_count(),
            result.fail_count(),
            result.skip_count(),
            result.inconclusive_count()
        );
        self.line(&self.paint(&summary, result.state.status));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        executor::results::{CaseResult, ResultState},
        sink::CaptureSink,
        test::TestCase,
    };

    fn reporter() -> (TextReporter, CaptureSink) {
        let sink = CaptureSink::default();
        let reporter = TextReporter::new(Writer::new(sink.clone())).plain();
        (reporter, sink)
    }

    fn case_result(state: ResultState, message: Option<&str>) -> TestResult {
        let node: TestNode = TestCase::new("Math.adds", |_| Ok(())).into();
        let mut result = CaseResult::new(node.info());
        result.state = state;
        result.message = message.map(String::from);
        TestResult::Case(result)
    }

    #[test]
    fn passing_case_is_one_line() {
        let (mut reporter, sink) = reporter();
        reporter.test_finished(&case_result(ResultState::PASSED, None));
        assert_eq!(sink.lines(), vec!["✓ Math.adds"]);
    }

    #[test]
    fn failing_case_reports_message() {
        let (mut reporter, sink) = reporter();
        reporter.test_finished(&case_result(
            ResultState::new(Status::Failed, FailureSite::Test),
            Some("expected 4, got 5"),
        ));
        assert_eq!(sink.lines(), vec!["✗ Math.adds - expected 4, got 5"]);
    }

    #[test]
    fn output_is_indented() {
        let (mut reporter, sink) = reporter();
        reporter.test_output(&TestOutput {
            test_name: "a".to_string(),
            text: "one\ntwo\n".to_string(),
        });
        assert_eq!(sink.lines(), vec!["  | one\n  | two"]);
    }

    #[test]
    fn fanout_delivers_to_both_in_order() {
        let (first, first_sink) = reporter();
        let (second, second_sink) = reporter();
        let mut fanout = Fanout(first, second);
        fanout.test_finished(&case_result(ResultState::PASSED, None));
        assert_eq!(first_sink.lines().len(), 1);
        assert_eq!(second_sink.lines().len(), 1);
    }
}
