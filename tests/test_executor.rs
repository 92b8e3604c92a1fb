use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use testgen::executor::{ExecutorError, TargetFault, TargetLoader, TargetModule, TestCaseExecutor};
use testgen::statement::{GenContext, PrimitiveStatement, PrimitiveValue};
use testgen::testcase::TestCase;

/// Scripted stand-in for an instrumented target: raises on negative ints,
/// panics on strings containing '!', succeeds otherwise.
struct ScriptedTarget {
    teardowns: Arc<AtomicUsize>,
}

impl ScriptedTarget {
    fn new() -> (Self, Arc<AtomicUsize>) {
        let teardowns = Arc::new(AtomicUsize::new(0));
        (
            ScriptedTarget {
                teardowns: Arc::clone(&teardowns),
            },
            teardowns,
        )
    }
}

impl TargetModule for ScriptedTarget {
    fn invoke(&mut self, statement: &PrimitiveStatement) -> Result<(), TargetFault> {
        match statement.value() {
            PrimitiveValue::Int(v) if *v < 0 => {
                Err(TargetFault::new("ValueError", format!("negative input: {v}")))
            }
            PrimitiveValue::Str(s) if s.contains('!') => panic!("target blew up on {s}"),
            _ => Ok(()),
        }
    }

    fn teardown(&mut self) {
        self.teardowns.fetch_add(1, Ordering::SeqCst);
    }
}

struct FixtureLoader;

impl TargetLoader for FixtureLoader {
    type Target = ScriptedTarget;

    fn load(&mut self, module: &str) -> Result<ScriptedTarget, ExecutorError> {
        if module == "fixtures.accessible" {
            Ok(ScriptedTarget::new().0)
        } else {
            Err(ExecutorError::LoadFailed {
                module: module.to_string(),
                reason: "module not found".to_string(),
            })
        }
    }
}

fn silence_panic_output() {
    // Intentional target panics would otherwise spam the test output.
    std::panic::set_hook(Box::new(|_| {}));
}

#[test]
fn clean_case_yields_no_exceptions() {
    let mut ctx = GenContext::with_seed(0);
    let mut tc = TestCase::new();
    let stmt = PrimitiveStatement::int(&tc, Some(5), &mut ctx);
    tc.add_statement(stmt);

    let mut executor = TestCaseExecutor::load(&mut FixtureLoader, "fixtures.accessible").unwrap();
    let result = executor.execute(&[tc]);
    assert!(!result.has_test_exceptions());
    assert!(result.exceptions().is_empty());
}

#[test]
fn fault_is_recorded_at_the_raising_index_only() {
    let mut ctx = GenContext::with_seed(0);
    let mut tc = TestCase::new();
    let ok = PrimitiveStatement::int(&tc, Some(5), &mut ctx);
    let bad = PrimitiveStatement::int(&tc, Some(-3), &mut ctx);
    tc.add_statement(ok);
    tc.add_statement(bad);

    let (target, _) = ScriptedTarget::new();
    let mut executor = TestCaseExecutor::new(target);
    let result = executor.execute(&[tc]);

    assert!(result.has_test_exceptions());
    let indices: Vec<usize> = result.exceptions().keys().copied().collect();
    assert_eq!(indices, vec![1]);
    let ex = result.exceptions().get(&1).unwrap();
    assert_eq!(ex.kind, "ValueError");
    assert!(ex.message.contains("-3"));
}

#[test]
fn execution_continues_past_a_failing_statement() {
    let mut ctx = GenContext::with_seed(0);
    let mut tc = TestCase::new();
    let bad = PrimitiveStatement::int(&tc, Some(-1), &mut ctx);
    let also_bad = PrimitiveStatement::int(&tc, Some(-2), &mut ctx);
    let ok = PrimitiveStatement::int(&tc, Some(3), &mut ctx);
    tc.add_statement(bad);
    tc.add_statement(also_bad);
    tc.add_statement(ok);

    let (target, _) = ScriptedTarget::new();
    let mut executor = TestCaseExecutor::new(target);
    let result = executor.execute(&[tc]);

    let indices: Vec<usize> = result.exceptions().keys().copied().collect();
    assert_eq!(indices, vec![0, 1]);
}

#[test]
fn target_panic_is_caught_and_classified() {
    silence_panic_output();
    let mut ctx = GenContext::with_seed(0);
    let mut tc = TestCase::new();
    let stmt = PrimitiveStatement::string(&tc, Some("boom!".to_string()), &mut ctx);
    tc.add_statement(stmt);

    let (target, _) = ScriptedTarget::new();
    let mut executor = TestCaseExecutor::new(target);
    let result = executor.execute(&[tc]);

    let ex = result.exceptions().get(&0).unwrap();
    assert_eq!(ex.kind, "panic");
    assert!(ex.message.contains("boom!"));
}

#[test]
fn batch_aggregates_into_one_result_last_write_wins() {
    let mut ctx = GenContext::with_seed(0);
    let mut first = TestCase::new();
    let s = PrimitiveStatement::int(&first, Some(-10), &mut ctx);
    first.add_statement(s);
    let mut second = TestCase::new();
    let s = PrimitiveStatement::int(&second, Some(-20), &mut ctx);
    second.add_statement(s);

    let (target, _) = ScriptedTarget::new();
    let mut executor = TestCaseExecutor::new(target);
    let result = executor.execute(&[first, second]);

    assert_eq!(result.exceptions().len(), 1);
    assert!(result.exceptions().get(&0).unwrap().message.contains("-20"));
}

#[test]
fn unknown_module_fails_to_load() {
    let loaded = TestCaseExecutor::load(&mut FixtureLoader, "no.such.module");
    match loaded {
        Err(ExecutorError::LoadFailed { module, .. }) => assert_eq!(module, "no.such.module"),
        Ok(_) => panic!("load should have failed"),
    }
}

// --- teardown ---

#[test]
fn teardown_runs_once_on_drop() {
    let (target, teardowns) = ScriptedTarget::new();
    let mut executor = TestCaseExecutor::new(target);

    let mut ctx = GenContext::with_seed(0);
    let mut tc = TestCase::new();
    let stmt = PrimitiveStatement::int(&tc, Some(-1), &mut ctx);
    tc.add_statement(stmt);
    let _ = executor.execute(&[tc]);

    assert_eq!(teardowns.load(Ordering::SeqCst), 0);
    drop(executor);
    assert_eq!(teardowns.load(Ordering::SeqCst), 1);
}

#[test]
fn teardown_runs_even_when_nothing_was_executed() {
    let (target, teardowns) = ScriptedTarget::new();
    let executor = TestCaseExecutor::new(target);
    drop(executor);
    assert_eq!(teardowns.load(Ordering::SeqCst), 1);
}

// --- fuzz ---

/// Raises or panics depending on the statement's value; only even ints and
/// short strings survive.
struct HostileTarget;

impl TargetModule for HostileTarget {
    fn invoke(&mut self, statement: &PrimitiveStatement) -> Result<(), TargetFault> {
        match statement.value() {
            PrimitiveValue::Int(v) if v % 2 != 0 => {
                Err(TargetFault::new("ArithmeticError", format!("odd: {v}")))
            }
            PrimitiveValue::Float(f) if *f < 0.0 => panic!("negative float {f}"),
            PrimitiveValue::Str(s) if s.len() > 10 => {
                Err(TargetFault::new("OverflowError", "too long"))
            }
            PrimitiveValue::Bool(true) => panic!("true is unacceptable"),
            PrimitiveValue::None => Err(TargetFault::new("TypeError", "NoneType")),
            _ => Ok(()),
        }
    }
}

#[test]
fn executor_survives_a_thousand_hostile_runs() {
    silence_panic_output();
    let mut executor = TestCaseExecutor::new(HostileTarget);
    for seed in 0..1000u64 {
        let mut ctx = GenContext::with_seed(seed);
        let mut tc = TestCase::new();
        let s = PrimitiveStatement::int(&tc, None, &mut ctx);
        tc.add_statement(s);
        let s = PrimitiveStatement::float(&tc, None, &mut ctx);
        tc.add_statement(s);
        let s = PrimitiveStatement::string(&tc, None, &mut ctx);
        tc.add_statement(s);
        let s = PrimitiveStatement::boolean(&tc, None, &mut ctx);
        tc.add_statement(s);
        let s = PrimitiveStatement::none(&tc, testgen::statement::VariableType::Int);
        tc.add_statement(s);

        // Must never raise for target faults, whatever the seed produced.
        let result = executor.execute(&[tc]);
        for index in result.exceptions().keys() {
            assert!(*index < 5);
        }
    }
}
