use std::sync::atomic::{AtomicU64, Ordering};

use crate::statement::PrimitiveStatement;

static NEXT_TEST_CASE_ID: AtomicU64 = AtomicU64::new(0);

/// Opaque handle identifying a test case. Statements and variable
/// references carry this instead of a strong back-pointer, so the test case
/// exclusively owns its statements without an ownership cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TestCaseId(u64);

/// An ordered sequence of statements; insertion order is execution order.
#[derive(Debug)]
pub struct TestCase {
    id: TestCaseId,
    statements: Vec<PrimitiveStatement>,
}

impl TestCase {
    pub fn new() -> Self {
        TestCase {
            id: TestCaseId(NEXT_TEST_CASE_ID.fetch_add(1, Ordering::Relaxed)),
            statements: Vec::new(),
        }
    }

    pub fn id(&self) -> TestCaseId {
        self.id
    }

    /// Append a statement. The statement must have been constructed against
    /// this test case; anything else is an internal logic error.
    pub fn add_statement(&mut self, statement: PrimitiveStatement) {
        assert_eq!(
            statement.owner(),
            self.id,
            "statement belongs to a different test case"
        );
        self.statements.push(statement);
    }

    pub fn size(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn get_statement(&self, index: usize) -> Option<&PrimitiveStatement> {
        self.statements.get(index)
    }

    pub fn get_statement_mut(&mut self, index: usize) -> Option<&mut PrimitiveStatement> {
        self.statements.get_mut(index)
    }

    pub fn statements(&self) -> impl Iterator<Item = &PrimitiveStatement> {
        self.statements.iter()
    }

    /// Remove and return the statement at `index`, shifting later ones down.
    pub fn remove_statement(&mut self, index: usize) -> Option<PrimitiveStatement> {
        if index < self.statements.len() {
            Some(self.statements.remove(index))
        } else {
            None
        }
    }

    /// Deep, independent copy: every statement is recloned onto the new
    /// test case at its original position, with fresh variable identities.
    /// Mutating the copy never touches the original.
    pub fn deep_clone(&self) -> TestCase {
        let mut clone = TestCase::new();
        for (position, statement) in self.statements.iter().enumerate() {
            let cloned = statement.clone_onto(&clone, position);
            clone.statements.push(cloned);
        }
        clone
    }
}

impl Default for TestCase {
    fn default() -> Self {
        TestCase::new()
    }
}
