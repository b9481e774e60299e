//! Results of dispatched nodes and their bottom-up aggregation.
use std::{fmt, time::Duration};

use crate::test::{Failure, FailureKind, TestInfo};

/// Prefix of messages produced by the framework itself.
const FRAMEWORK_PREFIX: &str = "trellis::";

/// Message recorded on a suite when one of its children failed.
pub const CHILD_ERRORS: &str = "One or more child tests had errors";

/// Outcome of a test node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Passed,
    Failed,
    Skipped,
    Inconclusive,
}

impl From<FailureKind> for Status {
    fn from(kind: FailureKind) -> Self {
        match kind {
            FailureKind::Error => Status::Failed,
            FailureKind::Ignored => Status::Skipped,
            FailureKind::Inconclusive => Status::Inconclusive,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Status::Passed => write!(f, "PASS"),
            Status::Failed => write!(f, "FAIL"),
            Status::Skipped => write!(f, "SKIP"),
            Status::Inconclusive => write!(f, "INCONCLUSIVE"),
        }
    }
}

/// The dispatch phase in which a failure originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureSite {
    /// Failure in the test itself.
    Test,
    /// Failure in the suite set-up.
    SetUp,
    /// Failure in the suite tear-down.
    TearDown,
    /// Failure of a parent test.
    Parent,
    /// Failure of a child test.
    Child,
}

/// Status together with the site that produced it. `site` is `None` for
/// passing results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResultState {
    pub status: Status,
    pub site: Option<FailureSite>,
}

impl ResultState {
    pub const PASSED: ResultState = ResultState {
        status: Status::Passed,
        site: None,
    };

    pub const INCONCLUSIVE: ResultState = ResultState {
        status: Status::Inconclusive,
        site: None,
    };

    pub fn new(status: Status, site: FailureSite) -> Self {
        Self {
            status,
            site: Some(site),
        }
    }
}

/// Counts of cases by status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counts {
    pub pass: usize,
    pub fail: usize,
    pub skip: usize,
    pub inconclusive: usize,
}

impl Counts {
    fn single(status: Status) -> Self {
        let mut counts = Counts::default();
        match status {
            Status::Passed => counts.pass = 1,
            Status::Failed => counts.fail = 1,
            Status::Skipped => counts.skip = 1,
            Status::Inconclusive => counts.inconclusive = 1,
        }
        counts
    }

    pub fn total(&self) -> usize {
        self.pass + self.fail + self.skip + self.inconclusive
    }
}

/// Result of a single case.
#[derive(Debug, Clone)]
pub struct CaseResult {
    pub test: TestInfo,
    pub state: ResultState,
    pub message: Option<String>,
    pub stack_trace: Option<String>,
    /// Text the case emitted while running.
    pub output: String,
    pub duration: Duration,
}

impl CaseResult {
    pub fn new(test: TestInfo) -> Self {
        Self {
            test,
            state: ResultState::INCONCLUSIVE,
            message: None,
            stack_trace: None,
            output: String::new(),
            duration: Duration::default(),
        }
    }

    /// Record a failure raised by the case body.
    pub fn record_failure(&mut self, failure: Failure) {
        self.state =
            ResultState::new(failure.kind.into(), FailureSite::Test);
        self.message = Some(failure.message);
        self.stack_trace = failure.stack_trace;
    }
}

/// Result of a suite, aggregating the counts of its children.
#[derive(Debug, Clone)]
pub struct SuiteResult {
    pub test: TestInfo,
    pub state: ResultState,
    pub message: Option<String>,
    pub stack_trace: Option<String>,
    pub duration: Duration,
    counts: Counts,
    children: Vec<TestResult>,
}

impl SuiteResult {
    pub fn new(test: TestInfo) -> Self {
        Self {
            test,
            state: ResultState::INCONCLUSIVE,
            message: None,
            stack_trace: None,
            duration: Duration::default(),
            counts: Counts::default(),
            children: Vec::new(),
        }
    }

    pub fn pass_count(&self) -> usize {
        self.counts.pass
    }

    pub fn fail_count(&self) -> usize {
        self.counts.fail
    }

    pub fn skip_count(&self) -> usize {
        self.counts.skip
    }

    pub fn inconclusive_count(&self) -> usize {
        self.counts.inconclusive
    }

    pub fn counts(&self) -> Counts {
        self.counts
    }

    pub fn children(&self) -> &[TestResult] {
        &self.children
    }

    /// Add the result of a finished child. Counts are summed and the suite
    /// status is re-derived: a failed child fails the suite, otherwise a
    /// passing child passes it, otherwise a skipped child skips it.
    pub fn add_result(&mut self, result: TestResult) {
        let counts = result.counts();
        self.counts.pass += counts.pass;
        self.counts.fail += counts.fail;
        self.counts.skip += counts.skip;
        self.counts.inconclusive += counts.inconclusive;

        let current = self.state.status;
        match result.status() {
            Status::Failed if current != Status::Failed => {
                self.state = ResultState::new(Status::Failed, FailureSite::Child);
                self.message = Some(CHILD_ERRORS.to_string());
            }
            Status::Passed if current == Status::Inconclusive || current == Status::Skipped => {
                self.state = ResultState::PASSED;
            }
            Status::Skipped if current == Status::Inconclusive => {
                self.state = ResultState::new(Status::Skipped, FailureSite::Child);
            }
            _ => (),
        }
        self.children.push(result);
    }

    /// Record a fixture failure. A failing set-up marks every contained case
    /// with the resulting status without running it.
    pub fn record_failure(&mut self, failure: Failure, site: FailureSite) {
        let status: Status = failure.kind.into();
        self.state = ResultState::new(status, site);
        self.message = Some(failure.message);
        self.stack_trace = failure.stack_trace;

        if site == FailureSite::SetUp {
            let total = self.test.test_case_count;
            match status {
                Status::Skipped => self.counts.skip = total,
                Status::Failed => self.counts.fail = total,
                Status::Inconclusive => self.counts.inconclusive = total,
                Status::Passed => (),
            }
        }
    }

    /// A tear-down failure fails the suite but leaves the child counts alone.
    pub fn record_tear_down_failure(&mut self, failure: Failure) {
        self.state = ResultState::new(Status::Failed, FailureSite::TearDown);
        self.message = Some(format!("TearDown : {}", failure.message));
        self.stack_trace = failure.stack_trace;
    }
}

/// Result of a test node.
#[derive(Debug, Clone)]
pub enum TestResult {
    Case(CaseResult),
    Suite(SuiteResult),
}

impl TestResult {
    pub fn test(&self) -> &TestInfo {
        match self {
            TestResult::Case(r) => &r.test,
            TestResult::Suite(r) => &r.test,
        }
    }

    pub fn full_name(&self) -> &str {
        &self.test().full_name
    }

    pub fn state(&self) -> ResultState {
        match self {
            TestResult::Case(r) => r.state,
            TestResult::Suite(r) => r.state,
        }
    }

    pub fn status(&self) -> Status {
        self.state().status
    }

    pub fn site(&self) -> Option<FailureSite> {
        self.state().site
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            TestResult::Case(r) => r.message.as_deref(),
            TestResult::Suite(r) => r.message.as_deref(),
        }
    }

    pub fn stack_trace(&self) -> Option<&str> {
        match self {
            TestResult::Case(r) => r.stack_trace.as_deref(),
            TestResult::Suite(r) => r.stack_trace.as_deref(),
        }
    }

    pub fn duration(&self) -> Duration {
        match self {
            TestResult::Case(r) => r.duration,
            TestResult::Suite(r) => r.duration,
        }
    }

    /// Case counts by status. A case counts itself once.
    pub fn counts(&self) -> Counts {
        match self {
            TestResult::Case(r) => Counts::single(r.state.status),
            TestResult::Suite(r) => r.counts,
        }
    }

    pub fn as_suite(&self) -> Option<&SuiteResult> {
        match self {
            TestResult::Suite(r) => Some(r),
            TestResult::Case(_) => None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status() == Status::Passed
    }

    pub fn is_failure(&self) -> bool {
        self.status() == Status::Failed
    }

    pub fn is_ignored(&self) -> bool {
        self.status() == Status::Skipped
    }

    pub fn is_inconclusive(&self) -> bool {
        self.status() == Status::Inconclusive
    }

    /// Message suitable for display, with the framework's own prefix removed.
    pub fn display_message(&self) -> &str {
        match self.message() {
            None => "Unknown error",
            Some(m) if !m.starts_with(FRAMEWORK_PREFIX) => m,
            Some(m) => m.find(" : ").map(|idx| &m[idx + 3..]).unwrap_or(m),
        }
    }
}
