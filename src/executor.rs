use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use thiserror::Error;
use tracing::{debug, warn};

use crate::execution::{ExecutionResult, ThrownException};
use crate::statement::PrimitiveStatement;
use crate::testcase::TestCase;

/// Infrastructure failures only. Faults raised by target code never surface
/// here; they are recorded in the [`ExecutionResult`] instead.
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("failed to load target module `{module}`: {reason}")]
    LoadFailed { module: String, reason: String },
}

/// An error raised by target code while invoking one statement.
#[derive(Debug, Clone)]
pub struct TargetFault {
    pub kind: String,
    pub message: String,
}

impl TargetFault {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        TargetFault {
            kind: kind.into(),
            message: message.into(),
        }
    }
}

/// A target program loaded under instrumentation. The executor only needs
/// to invoke it per statement and to release the instrumentation afterward;
/// trace contents are the collaborator's business.
pub trait TargetModule {
    fn invoke(&mut self, statement: &PrimitiveStatement) -> Result<(), TargetFault>;

    /// Uninstall instrumentation. Called exactly once, on executor teardown.
    fn teardown(&mut self) {}
}

/// Loads and instruments a target module by identifier.
pub trait TargetLoader {
    type Target: TargetModule;

    fn load(&mut self, module: &str) -> Result<Self::Target, ExecutorError>;
}

/// Runs batches of test cases against one loaded target.
///
/// Execution is single-threaded and strictly sequential: the tracing
/// collaborator keeps process-wide state and must never observe interleaved
/// runs. The loaded target lives as long as the executor and is torn down
/// on drop, on every exit path.
pub struct TestCaseExecutor<T: TargetModule> {
    target: T,
}

impl<T: TargetModule> TestCaseExecutor<T> {
    /// Wrap an already-instrumented target.
    pub fn new(target: T) -> Self {
        TestCaseExecutor { target }
    }

    /// Load `module` through `loader` and build an executor around it.
    /// Load failures are fatal; nothing can be executed without a target.
    pub fn load<L>(loader: &mut L, module: &str) -> Result<Self, ExecutorError>
    where
        L: TargetLoader<Target = T>,
    {
        let target = loader.load(module)?;
        Ok(TestCaseExecutor { target })
    }

    /// Execute the batch in submission order and aggregate one result.
    ///
    /// Every statement invocation sits behind a fault boundary: an error in
    /// target code is caught, classified, and recorded at that statement's
    /// index, and the run continues with the next statement. A statement
    /// depending on a variable from a failed one is expected to fail too;
    /// that failure is recorded as well, never short-circuited.
    pub fn execute(&mut self, test_cases: &[TestCase]) -> ExecutionResult {
        let mut result = ExecutionResult::new();
        for (case_no, test_case) in test_cases.iter().enumerate() {
            debug!(case = case_no, statements = test_case.size(), "executing test case");
            for (idx, statement) in test_case.statements().enumerate() {
                if let Some(exception) = self.invoke_guarded(statement) {
                    warn!(statement = idx, kind = %exception.kind, "statement raised");
                    result.report_new_thrown_exception(idx, exception);
                }
            }
        }
        result
    }

    // The boundary catches both the trait's error channel and panics, so a
    // fault in target code can never derail the executor's control flow.
    fn invoke_guarded(&mut self, statement: &PrimitiveStatement) -> Option<ThrownException> {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.target.invoke(statement)));
        match outcome {
            Ok(Ok(())) => None,
            Ok(Err(fault)) => Some(ThrownException::new(fault.kind, fault.message)),
            Err(payload) => Some(classify_panic(payload)),
        }
    }
}

impl<T: TargetModule> Drop for TestCaseExecutor<T> {
    fn drop(&mut self) {
        self.target.teardown();
    }
}

fn classify_panic(payload: Box<dyn Any + Send>) -> ThrownException {
    let message = if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "opaque panic payload".to_string()
    };
    ThrownException::new("panic", message)
}
