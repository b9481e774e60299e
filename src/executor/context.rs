use std::{
    any::{self, Any},
    path::{Path, PathBuf},
};

use crate::{
    listener::{Listener, TestOutput},
    test::{Failure, TestObject},
};

/// Mutable state of a single run: where tests execute, who is listening,
/// and the object backing the case currently being invoked.
///
/// A context is created per call to [crate::Runner::run] and is never shared
/// between runs.
pub struct ExecutionContext<'l> {
    run_id: u64,
    work_directory: PathBuf,
    listener: &'l mut dyn Listener,
    test_object: Option<TestObject>,
    /// Full names of the suites enclosing the node being dispatched.
    ancestors: Vec<String>,
}

impl<'l> ExecutionContext<'l> {
    pub fn new(
        run_id: u64,
        work_directory: PathBuf,
        listener: &'l mut dyn Listener,
    ) -> Self {
        Self {
            run_id,
            work_directory,
            listener,
            test_object: None,
            ancestors: Vec::new(),
        }
    }

    pub fn run_id(&self) -> u64 {
        self.run_id
    }

    pub fn work_directory(&self) -> &Path {
        &self.work_directory
    }

    pub fn listener(&mut self) -> &mut (dyn Listener + 'l) {
        &mut *self.listener
    }

    /// The object of the case being invoked. `None` while a suite or a static
    /// case is dispatched.
    pub fn test_object(&self) -> Option<&dyn Any> {
        self.test_object.as_deref()
    }

    pub fn ancestors(&self) -> &[String] {
        &self.ancestors
    }

    pub(crate) fn set_test_object(&mut self, object: Option<TestObject>) {
        self.test_object = object;
    }

    pub(crate) fn enter(&mut self, suite: &str) {
        self.ancestors.push(suite.to_string());
    }

    pub(crate) fn leave(&mut self) {
        self.ancestors.pop();
    }
}

/// What a case body sees while it runs.
pub struct CaseScope<'c, 'l> {
    context: &'c mut ExecutionContext<'l>,
    full_name: &'c str,
    output: &'c mut String,
}

impl<'c, 'l> CaseScope<'c, 'l> {
    pub(crate) fn new(
        context: &'c mut ExecutionContext<'l>,
        full_name: &'c str,
        output: &'c mut String,
    ) -> Self {
        Self {
            context,
            full_name,
            output,
        }
    }

    pub fn full_name(&self) -> &str {
        self.full_name
    }

    pub fn work_directory(&self) -> &Path {
        self.context.work_directory()
    }

    /// Full names of the enclosing suites, outermost first.
    pub fn ancestors(&self) -> &[String] {
        self.context.ancestors()
    }

    /// The object constructed for this invocation.
    pub fn object<T: Any>(&mut self) -> Result<&mut T, Failure> {
        self.context
            .test_object
            .as_mut()
            .and_then(|obj| (**obj).downcast_mut::<T>())
            .ok_or_else(|| {
                Failure::error(format!(
                    "trellis::TestObject : no test object of type {}",
                    any::type_name::<T>()
                ))
            })
    }

    /// Emit text from the running test. It is kept on the case result and
    /// forwarded to the listener as it arrives.
    pub fn write(&mut self, text: impl AsRef<str>) {
        let text = text.as_ref();
        self.output.push_str(text);
        let output = TestOutput {
            test_name: self.full_name.to_string(),
            text: text.to_string(),
        };
        self.context.listener().test_output(&output);
    }

    pub fn write_line(&mut self, text: impl AsRef<str>) {
        self.write(format!("{}\n", text.as_ref()));
    }
}
