//! Orchestration of a run: the session registries, the reporter and the
//! output sink.
use std::{
    collections::HashMap,
    env,
    path::PathBuf,
    sync::{Arc, Mutex, MutexGuard},
};
use tracing::{error, info};

use crate::{
    config::Options,
    environment::{banner_line, Environment, HostEnvironment},
    errors::TrellisError,
    executor::{self, results::TestResult, ExecutionContext},
    listener::{Fanout, Listener, Reporter, TestOutput, TextReporter},
    picker::{Discover, Settings},
    sink::{TcpSink, Writer},
    test::{TestNode, TestSuite},
};

#[derive(Default)]
struct Registries {
    suites: HashMap<String, Arc<TestSuite>>,
    top_level: Vec<Arc<TestSuite>>,
    results: HashMap<String, TestResult>,
}

/// Suites and results collected across runs. Clones share the same
/// registries, so runners on different threads may report into one session.
#[derive(Clone, Default)]
pub struct Session {
    inner: Arc<Mutex<Registries>>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Registries> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// The most recent result recorded for `full_name`.
    pub fn result(&self, full_name: &str) -> Option<TestResult> {
        self.lock().results.get(full_name).cloned()
    }

    pub fn suite(&self, full_name: &str) -> Option<Arc<TestSuite>> {
        self.lock().suites.get(full_name).cloned()
    }

    /// Top-level suites in the order they were registered.
    pub fn top_level(&self) -> Vec<Arc<TestSuite>> {
        self.lock().top_level.clone()
    }

    pub fn result_count(&self) -> usize {
        self.lock().results.len()
    }

    /// Register a top-level suite and every suite nested in it. A suite with
    /// the same full name replaces the earlier one.
    pub fn register(&self, suite: &Arc<TestSuite>) {
        let mut registries = self.lock();
        registries
            .top_level
            .retain(|s| s.full_name() != suite.full_name());
        registries.top_level.push(Arc::clone(suite));
        for nested in suite.suites() {
            registries
                .suites
                .insert(nested.full_name().to_string(), nested);
        }
    }

    pub fn record(&self, result: &TestResult) {
        self.lock()
            .results
            .insert(result.full_name().to_string(), result.clone());
    }
}

/// Listener that writes finished results into a [Session].
pub struct RegistryWriter {
    session: Session,
}

impl RegistryWriter {
    pub fn new(session: Session) -> Self {
        Self { session }
    }
}

impl Listener for RegistryWriter {
    fn test_started(&mut self, _test: &TestNode) {}

    fn test_finished(&mut self, result: &TestResult) {
        self.session.record(result);
    }

    fn test_output(&mut self, _output: &TestOutput) {}
}

/// Listener that forwards to a [Reporter], adding the suite events.
pub struct ReporterBridge<R> {
    reporter: R,
    open: Vec<Arc<TestSuite>>,
}

impl<R: Reporter> ReporterBridge<R> {
    pub fn new(reporter: R) -> Self {
        Self {
            reporter,
            open: Vec::new(),
        }
    }
}

impl<R: Reporter> Listener for ReporterBridge<R> {
    fn test_started(&mut self, test: &TestNode) {
        self.reporter.test_started(test);
        if let TestNode::Suite(suite) = test {
            self.open.push(Arc::clone(suite));
            self.reporter.test_suite_started(suite);
        }
    }

    fn test_finished(&mut self, result: &TestResult) {
        self.reporter.test_finished(result);
        if let TestResult::Suite(suite_result) = result {
            if let Some(suite) = self.open.pop() {
                self.reporter.test_suite_finished(&suite, suite_result);
            }
        }
    }

    fn test_output(&mut self, output: &TestOutput) {
        self.reporter.test_output(output);
    }
}

/// Runs test trees and keeps track of what happened.
pub struct Runner {
    options: Options,
    session: Session,
    reporter: Option<Box<dyn Reporter>>,
    /// The reporter was created by [Runner::reporter] over the writer
    /// active at the time, and must follow later writer changes.
    default_reporter: bool,
    writer: Option<Writer>,
    environment: Box<dyn Environment>,
    next_run: u64,
}

impl Runner {
    pub fn new(options: Options) -> Self {
        let environment = HostEnvironment {
            work_directory: options.work_directory.clone(),
        };
        Self {
            options,
            session: Session::new(),
            reporter: None,
            default_reporter: false,
            writer: None,
            environment: Box::new(environment),
            next_run: 0,
        }
    }

    /// Report into an existing session instead of a fresh one.
    pub fn with_session(mut self, session: Session) -> Self {
        self.session = session;
        self
    }

    pub fn with_environment(mut self, environment: impl Environment + 'static) -> Self {
        self.environment = Box::new(environment);
        self
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn set_reporter(&mut self, reporter: impl Reporter + 'static) {
        self.reporter = Some(Box::new(reporter));
        self.default_reporter = false;
    }

    /// Forget a default reporter bound to a writer that is going away.
    fn release_default_reporter(&mut self) {
        if self.default_reporter {
            self.reporter = None;
            self.default_reporter = false;
        }
    }

    /// Use an application provided writer. [Runner::open_writer] will then
    /// only print the banner.
    pub fn set_writer(&mut self, writer: Writer) {
        self.release_default_reporter();
        self.writer = Some(writer);
    }

    pub fn writer(&self) -> Option<&Writer> {
        self.writer.as_ref()
    }

    /// The configured reporter, or a [TextReporter] on the active writer.
    pub fn reporter(&mut self) -> &mut dyn Reporter {
        let writer = self.writer.clone();
        let network = self.options.network;
        if self.reporter.is_none() {
            self.default_reporter = true;
        }
        let reporter = self.reporter.get_or_insert_with(|| {
            let reporter = match writer {
                Some(writer) if network => TextReporter::new(writer).plain(),
                Some(writer) => TextReporter::new(writer),
                None => TextReporter::new(Writer::console()),
            };
            Box::new(reporter) as Box<dyn Reporter>
        });
        &mut **reporter
    }

    /// Discover a suite and register it with the session.
    pub fn load(
        &mut self,
        picker: &dyn Discover,
        module: &str,
        settings: Option<&Settings>,
    ) -> Result<Arc<TestSuite>, TrellisError> {
        let suite = Arc::new(picker.discover(module, settings)?);
        info!(
            "loaded {} ({} tests) from {}",
            suite.full_name(),
            suite.test_case_count(),
            module
        );
        self.session.register(&suite);
        Ok(suite)
    }

    /// Register a suite that was built without a picker.
    pub fn load_suite(&mut self, suite: TestSuite) -> Arc<TestSuite> {
        let suite = Arc::new(suite);
        info!(
            "loaded {} ({} tests)",
            suite.full_name(),
            suite.test_case_count()
        );
        self.session.register(&suite);
        suite
    }

    /// Open the output sink if none is set and print the banner. Connection
    /// failures are returned so the caller can show them and skip the run.
    pub fn try_open_writer(&mut self, message: &str) -> Result<(), TrellisError> {
        if self.writer.is_none() {
            let writer = if self.options.network {
                info!(
                    "sending '{}' results to {}:{}",
                    message, self.options.host_name, self.options.host_port
                );
                Writer::new(TcpSink::connect(
                    &self.options.host_name,
                    self.options.host_port,
                    self.options.connect_timeout(),
                )?)
            } else {
                Writer::console()
            };
            self.release_default_reporter();
            self.writer = Some(writer);
        }

        if let Some(writer) = &self.writer {
            writer.write_line(&banner_line("Runner executing", message))?;
            for (label, value) in self.environment.describe() {
                writer.write_line(&banner_line(&label, &value))?;
            }
        }
        Ok(())
    }

    /// Like [Runner::try_open_writer], logging the error and reporting
    /// `false` on failure.
    pub fn open_writer(&mut self, message: &str) -> bool {
        match self.try_open_writer(message) {
            Ok(()) => true,
            Err(err) => {
                error!("{}", err);
                false
            }
        }
    }

    pub fn close_writer(&mut self) -> Result<(), TrellisError> {
        self.release_default_reporter();
        match self.writer.take() {
            Some(writer) => writer.close(),
            None => Ok(()),
        }
    }

    /// Execute `node` in a fresh context and return its result.
    pub fn run(&mut self, node: &TestNode) -> TestResult {
        let run_id = self.next_run;
        self.next_run += 1;

        let work_directory = self
            .options
            .work_directory
            .clone()
            .or_else(|| env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."));

        info!(
            run = run_id,
            "running {} ({} tests)",
            node.full_name(),
            node.test_case_count()
        );

        let mut registry = RegistryWriter::new(self.session.clone());
        let mut bridge = ReporterBridge::new(self.reporter());
        let mut listener = Fanout(&mut registry, &mut bridge);
        let mut context = ExecutionContext::new(run_id, work_directory, &mut listener);
        let result = executor::execute(node, &mut context);

        info!(run = run_id, "finished {} with {}", result.full_name(), result.status());
        result
    }
}

/// Summary counts of a finished run.
pub fn summary(result: &TestResult) -> String {
    let counts = result.counts();
    format!(
        "{} passing / {} failing / {} skipped / {} inconclusive",
        counts.pass, counts.fail, counts.skip, counts.inconclusive
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{sink::CaptureSink, test::TestCase};

    struct FixedEnvironment;

    impl Environment for FixedEnvironment {
        fn describe(&self) -> Vec<(String, String)> {
            vec![("Board".to_string(), "test".to_string())]
        }
    }

    #[test]
    fn banner_goes_to_provided_writer() {
        let sink = CaptureSink::default();
        let mut runner = Runner::new(Options::default()).with_environment(FixedEnvironment);
        runner.set_writer(Writer::new(sink.clone()));
        assert!(runner.open_writer("unit tests"));
        assert_eq!(
            sink.lines(),
            vec!["[Runner executing:\tunit tests]", "[Board:\ttest]"]
        );
    }

    #[test]
    fn session_register_replaces_same_name() {
        let session = Session::new();
        let first = Arc::new(TestSuite::new("A").with(TestSuite::new("Inner")));
        let second = Arc::new(TestSuite::new("A"));
        session.register(&first);
        session.register(&second);
        assert_eq!(session.top_level().len(), 1);
        assert_eq!(session.suite("A").unwrap().test_case_count(), 0);
        assert!(session.suite("A.Inner").is_some());
    }

    #[test]
    fn summary_line() {
        let mut runner = Runner::new(Options::default());
        runner.set_writer(Writer::new(CaptureSink::default()));
        let suite = TestSuite::new("S")
            .with(TestCase::new("a", |_| Ok(())))
            .with(TestCase::new("b", |_| Err(crate::test::Failure::error("no"))));
        let result = runner.run(&suite.into());
        assert_eq!(
            summary(&result),
            "1 passing / 1 failing / 0 skipped / 0 inconclusive"
        );
    }

    #[test]
    fn load_suite_registers_prebuilt_tree() {
        let mut runner = Runner::new(Options::default());
        let suite = runner.load_suite(
            TestSuite::new("Pre").with(TestSuite::new("Inner").with(TestCase::new("a", |_| Ok(())))),
        );
        assert_eq!(suite.test_case_count(), 1);
        assert_eq!(runner.session().top_level().len(), 1);
        assert!(runner.session().suite("Pre.Inner").is_some());
    }
}
