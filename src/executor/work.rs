//! Depth-first dispatch of a test tree.
use std::{
    any::Any,
    panic::{self, AssertUnwindSafe},
    time::Instant,
};
use tracing::{debug, warn};

use super::{
    context::{CaseScope, ExecutionContext},
    results::{CaseResult, FailureSite, ResultState, Status, SuiteResult, TestResult},
};
use crate::test::{Failure, Fixture, TestCase, TestNode, TestSuite};

/// Execute `node` and everything below it, returning its finished result.
///
/// The context's listener sees `test_started` before and `test_finished`
/// after every node that is dispatched, whatever the outcome.
pub fn execute(node: &TestNode, context: &mut ExecutionContext<'_>) -> TestResult {
    debug!(run = context.run_id(), test = node.full_name(), "dispatching");
    context.listener().test_started(node);

    let result = match node {
        TestNode::Case(case) => TestResult::Case(execute_case(case, node, context)),
        TestNode::Suite(suite) => {
            TestResult::Suite(execute_suite(suite, node, context))
        }
    };

    context.listener().test_finished(&result);
    result
}

fn execute_case(
    case: &TestCase,
    node: &TestNode,
    context: &mut ExecutionContext<'_>,
) -> CaseResult {
    let start = Instant::now();
    let mut result = CaseResult::new(node.info());

    if let Some(reason) = case.ignore_reason() {
        result.state = ResultState::new(Status::Skipped, FailureSite::Test);
        result.message = Some(reason.to_string());
        return result;
    }

    let mut output = String::new();
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        context.set_test_object(case.construct());
        let mut scope = CaseScope::new(context, case.full_name(), &mut output);
        case.invoke(&mut scope)
    }));
    context.set_test_object(None);

    match outcome {
        Ok(Ok(())) => result.state = ResultState::PASSED,
        Ok(Err(failure)) => result.record_failure(failure),
        Err(payload) => result.record_failure(panic_failure(payload)),
    }
    result.output = output;
    result.duration = start.elapsed();
    result
}

fn execute_suite(
    suite: &TestSuite,
    node: &TestNode,
    context: &mut ExecutionContext<'_>,
) -> SuiteResult {
    let start = Instant::now();
    let mut result = SuiteResult::new(node.info());

    if let Some(set_up) = suite.set_up() {
        if let Err(failure) = run_fixture(set_up, context) {
            warn!(suite = suite.full_name(), "set-up failed: {}", failure);
            result.record_failure(failure, FailureSite::SetUp);
            result.duration = start.elapsed();
            return result;
        }
    }

    context.enter(suite.full_name());
    for child in suite.children() {
        let child_result = execute(child, context);
        result.add_result(child_result);
    }
    context.leave();

    if let Some(tear_down) = suite.tear_down() {
        if let Err(failure) = run_fixture(tear_down, context) {
            warn!(suite = suite.full_name(), "tear-down failed: {}", failure);
            result.record_tear_down_failure(failure);
        }
    }

    result.duration = start.elapsed();
    result
}

fn run_fixture(
    fixture: &Fixture,
    context: &ExecutionContext<'_>,
) -> Result<(), Failure> {
    let work_directory = context.work_directory();
    panic::catch_unwind(AssertUnwindSafe(|| fixture.run(work_directory)))
        .unwrap_or_else(|payload| Err(panic_failure(payload)))
}

fn panic_failure(payload: Box<dyn Any + Send>) -> Failure {
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "test panicked".to_string());
    Failure::error(format!("panicked: {}", message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        listener::{Listener, TestOutput},
        test::ensure,
    };
    use std::path::PathBuf;

    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
    }

    impl Listener for Recorder {
        fn test_started(&mut self, test: &TestNode) {
            self.events.push(format!("start {}", test.full_name()));
        }

        fn test_finished(&mut self, result: &TestResult) {
            self.events
                .push(format!("finish {} {}", result.full_name(), result.status()));
        }

        fn test_output(&mut self, output: &TestOutput) {
            self.events.push(format!("output {}", output.text));
        }
    }

    fn run(node: &TestNode) -> (TestResult, Vec<String>) {
        let mut recorder = Recorder::default();
        let result = {
            let mut context =
                ExecutionContext::new(0, PathBuf::from("."), &mut recorder);
            execute(node, &mut context)
        };
        (result, recorder.events)
    }

    #[derive(Default)]
    struct Counter {
        hits: u32,
    }

    #[test]
    fn case_runs_against_fresh_object() {
        let case = TestCase::new("counts", |scope| {
            let counter = scope.object::<Counter>()?;
            counter.hits += 1;
            let hits = counter.hits;
            ensure(hits == 1, format!("object was reused: {}", hits))
        })
        .with_object(Counter::default);
        let suite = TestSuite::new("S").with(case.clone()).with(case);

        let (result, _) = run(&suite.into());
        assert_eq!(result.counts().pass, 2);
    }

    #[test]
    fn static_case_has_no_object() {
        let case = TestCase::new("static", |scope| {
            scope.object::<Counter>().map(|_| ())
        });
        let (result, _) = run(&case.into());
        assert_eq!(result.state(), ResultState::new(Status::Failed, FailureSite::Test));
        assert!(result.message().unwrap().contains("no test object"));
    }

    #[test]
    fn panics_are_failures_at_test_site() {
        let case = TestCase::new("boom", |_| panic!("kaboom"));
        let (result, events) = run(&case.into());
        assert!(result.is_failure());
        assert_eq!(result.site(), Some(FailureSite::Test));
        assert_eq!(result.message(), Some("panicked: kaboom"));
        assert_eq!(events, vec!["start boom", "finish boom FAIL"]);
    }

    #[test]
    fn ignored_case_is_never_invoked() {
        let case = TestCase::new("later", |_| panic!("should not run")).ignore("not yet");
        let (result, _) = run(&case.into());
        assert_eq!(result.state(), ResultState::new(Status::Skipped, FailureSite::Test));
        assert_eq!(result.message(), Some("not yet"));
    }

    #[test]
    fn failure_kinds_map_to_status() {
        let suite = TestSuite::new("S")
            .with(TestCase::new("skip", |_| Err(Failure::ignored("skip me"))))
            .with(TestCase::new("unsure", |_| Err(Failure::inconclusive("?"))));
        let (result, _) = run(&suite.into());
        let suite = result.as_suite().unwrap();
        assert_eq!(suite.skip_count(), 1);
        assert_eq!(suite.inconclusive_count(), 1);
        assert_eq!(suite.state.status, Status::Skipped);
    }

    #[test]
    fn output_is_forwarded_and_kept() {
        let case = TestCase::new("talk", |scope| {
            scope.write("hello ");
            scope.write("world");
            Ok(())
        });
        let (result, events) = run(&case.into());
        match result {
            TestResult::Case(case) => assert_eq!(case.output, "hello world"),
            TestResult::Suite(_) => panic!("expected a case result"),
        }
        assert_eq!(
            events,
            vec!["start talk", "output hello ", "output world", "finish talk PASS"]
        );
    }

    #[test]
    fn children_finish_before_parent_in_order() {
        fn pass(_: &mut CaseScope<'_, '_>) -> Result<(), Failure> {
            Ok(())
        }
        let tree = TestSuite::new("Root")
            .with(TestSuite::new("A").with(TestCase::new("a1", pass)))
            .with(TestCase::new("b", pass));
        let (_, events) = run(&tree.into());
        assert_eq!(
            events,
            vec![
                "start Root",
                "start Root.A",
                "start Root.A.a1",
                "finish Root.A.a1 PASS",
                "finish Root.A PASS",
                "start Root.b",
                "finish Root.b PASS",
                "finish Root PASS",
            ]
        );
    }

    #[test]
    fn fixture_panic_is_a_set_up_failure() {
        let suite = TestSuite::new("S")
            .with(TestCase::new("a", |_| Ok(())))
            .with_set_up(Fixture::new(|_| panic!("no database")));
        let (result, events) = run(&suite.into());
        assert_eq!(result.site(), Some(FailureSite::SetUp));
        assert_eq!(result.counts().fail, 1);
        assert_eq!(events, vec!["start S", "finish S FAIL"]);
    }

    #[test]
    fn cases_see_enclosing_suites() {
        let case = TestCase::new("deep", |scope| {
            let ancestors = scope.ancestors().join(">");
            ensure(ancestors == "Root>Root.Inner", ancestors)
        });
        let tree = TestSuite::new("Root").with(TestSuite::new("Inner").with(case));
        let (result, _) = run(&tree.into());
        assert!(result.is_success());
    }
}
