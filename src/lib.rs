pub mod config;
pub mod execution;
pub mod executor;
pub mod randomness;
pub mod statement;
pub mod statistics;
pub mod testcase;

pub use config::Configuration;
pub use execution::{ExecutionResult, ThrownException};
pub use executor::{ExecutorError, TargetFault, TargetLoader, TargetModule, TestCaseExecutor};
pub use randomness::Randomness;
pub use statement::{GenContext, PrimitiveStatement, PrimitiveValue, VariableReference, VariableType};
pub use testcase::{TestCase, TestCaseId};
