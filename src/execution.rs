use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A classified fault captured at a statement boundary: the error's type
/// name and its message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThrownException {
    pub kind: String,
    pub message: String,
}

impl ThrownException {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        ThrownException {
            kind: kind.into(),
            message: message.into(),
        }
    }
}

/// Result of one execution run: which statement indices raised, and what.
///
/// At most one exception is retained per index; a later report at an
/// already-recorded index overwrites the earlier one.
#[derive(Debug, Default, Serialize)]
pub struct ExecutionResult {
    exceptions: BTreeMap<usize, ThrownException>,
}

impl ExecutionResult {
    pub fn new() -> Self {
        ExecutionResult::default()
    }

    /// Statement indices that raised, mapped to the captured exception.
    pub fn exceptions(&self) -> &BTreeMap<usize, ThrownException> {
        &self.exceptions
    }

    /// True iff at least one statement raised during the run.
    pub fn has_test_exceptions(&self) -> bool {
        !self.exceptions.is_empty()
    }

    /// Record an exception thrown while executing the statement at
    /// `stmt_idx`. Last write wins.
    pub fn report_new_thrown_exception(&mut self, stmt_idx: usize, ex: ThrownException) {
        self.exceptions.insert(stmt_idx, ex);
    }
}
