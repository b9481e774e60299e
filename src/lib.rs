//! Trellis is a hierarchical test runner: it executes a tree of suites and
//! cases depth first, aggregates results bottom up and reports lifecycle
//! events to listeners while the run is in progress.
//!
//! ## Testing Model
//! A [TestCase] is a leaf unit of verification. A [TestSuite] groups cases
//! and nested suites in order, with optional set-up and tear-down fixtures.
//! Every node has a name and a dot-qualified full name:
//! ```
//! use trellis::{Failure, TestCase, TestSuite};
//!
//! let suite = TestSuite::new("Math")
//!     .with(TestCase::new("adds", |_| {
//!         trellis::ensure(2 + 2 == 4, "2 + 2 should be 4")
//!     }))
//!     .with(TestCase::new("later", |_| Err(Failure::ignored("not ready"))));
//! assert_eq!(suite.children()[0].full_name(), "Math.adds");
//! assert_eq!(suite.test_case_count(), 2);
//! ```
//!
//! ## Running
//! A [Runner] executes a node and records every result in its [Session]:
//! ```
//! use trellis::{config::Options, sink::{CaptureSink, Writer}, Runner, TestCase, TestSuite};
//!
//! let mut runner = Runner::new(Options::default());
//! runner.set_writer(Writer::new(CaptureSink::default()));
//! let suite = TestSuite::new("S").with(TestCase::new("a", |_| Ok(())));
//! let result = runner.run(&suite.into());
//! assert!(result.is_success());
//! assert!(runner.session().result("S.a").unwrap().is_success());
//! ```
//!
//! ## Aggregation
//! A suite fails when any child fails, otherwise passes when any child
//! passes, otherwise is skipped when any child is skipped. A suite whose
//! set-up fails runs none of its children; every case below it is counted
//! with the set-up's status instead.
//!
//! ## Command suites
//! The `trellis` binary reads a `trellis.toml` and turns every file matched
//! by a suite's `paths` into a case that runs `cmd` and compares its output
//! with a `.expect` file:
//! ```toml
//! ver = "0.1.0"
//!
//! [[suites]]
//! name = "Cat tests"
//! paths = [ "cat-test/*.txt" ]
//! cmd = "cat {}"
//! # (Optional) Directory to store the generated .expect files.
//! expect_dir = "cat-out/"
//! # (Optional) Timeout for tests in seconds. Defaults to 1200 seconds.
//! timeout = 120
//! ```
pub mod cli;
pub mod config;
pub mod environment;
pub mod errors;
pub mod executor;
pub mod listener;
pub mod logging;
pub mod picker;
pub mod printer;
pub mod runner;
pub mod sink;

pub use errors::TrellisError;
pub use executor::{
    results::{CaseResult, FailureSite, ResultState, Status, SuiteResult, TestResult},
    CaseScope, ExecutionContext,
};
pub use listener::{Listener, Reporter, TestOutput};
pub use runner::{Runner, Session};
pub use test::{ensure, Failure, FailureKind, Fixture, TestCase, TestNode, TestSuite};
