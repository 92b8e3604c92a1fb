use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::config::Configuration;
use crate::randomness::Randomness;
use crate::testcase::{TestCase, TestCaseId};

/// Everything statement construction and mutation needs: the knobs and the
/// random stream. Passed explicitly into every call that draws randomness.
#[derive(Debug)]
pub struct GenContext {
    pub config: Configuration,
    pub randomness: Randomness,
}

impl GenContext {
    pub fn new(config: Configuration, randomness: Randomness) -> Self {
        GenContext { config, randomness }
    }

    /// Default knobs with a seeded random stream, for reproducible runs.
    pub fn with_seed(seed: u64) -> Self {
        GenContext {
            config: Configuration::default(),
            randomness: Randomness::with_seed(seed),
        }
    }
}

impl Default for GenContext {
    fn default() -> Self {
        GenContext {
            config: Configuration::default(),
            randomness: Randomness::new(),
        }
    }
}

/// Static type tag carried by a variable reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VariableType {
    Int,
    Float,
    String,
    Bool,
    None,
}

static NEXT_VARIABLE_ID: AtomicU64 = AtomicU64::new(0);

/// Symbolic handle to the value a statement produces. Carries no value of
/// its own; equality is identity (two handles are equal only when they name
/// the same produced value in the same test case).
#[derive(Debug, Clone)]
pub struct VariableReference {
    id: u64,
    owner: TestCaseId,
    variable_type: VariableType,
}

impl VariableReference {
    fn fresh(owner: TestCaseId, variable_type: VariableType) -> Self {
        VariableReference {
            id: NEXT_VARIABLE_ID.fetch_add(1, Ordering::Relaxed),
            owner,
            variable_type,
        }
    }

    pub fn owner(&self) -> TestCaseId {
        self.owner
    }

    pub fn variable_type(&self) -> VariableType {
        self.variable_type
    }
}

impl PartialEq for VariableReference {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.owner == other.owner
    }
}

impl Eq for VariableReference {}

impl Hash for VariableReference {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
        self.owner.hash(state);
    }
}

/// Literal payload of a primitive statement. Closed union: every consumer
/// matches exhaustively, so a new variant is a compile-time obligation in
/// the executor and every emitter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PrimitiveValue {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    None,
}

impl PrimitiveValue {
    pub fn variable_type(&self) -> VariableType {
        match self {
            PrimitiveValue::Int(_) => VariableType::Int,
            PrimitiveValue::Float(_) => VariableType::Float,
            PrimitiveValue::Str(_) => VariableType::String,
            PrimitiveValue::Bool(_) => VariableType::Bool,
            PrimitiveValue::None => VariableType::None,
        }
    }
}

// Structural hash; floats hash by bit pattern.
impl Eq for PrimitiveValue {}

impl Hash for PrimitiveValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        core::mem::discriminant(self).hash(state);
        match self {
            PrimitiveValue::Int(v) => v.hash(state),
            PrimitiveValue::Float(v) => v.to_bits().hash(state),
            PrimitiveValue::Str(v) => v.hash(state),
            PrimitiveValue::Bool(v) => v.hash(state),
            PrimitiveValue::None => {}
        }
    }
}

/// One instruction in a test case, holding a literal value and producing a
/// variable later statements may refer to.
#[derive(Debug)]
pub struct PrimitiveStatement {
    ret_val: VariableReference,
    value: PrimitiveValue,
}

impl PrimitiveStatement {
    fn create(test_case: &TestCase, value: PrimitiveValue) -> Self {
        let variable_type = value.variable_type();
        PrimitiveStatement {
            ret_val: VariableReference::fresh(test_case.id(), variable_type),
            value,
        }
    }

    /// An integer statement. With `None`, a fresh value is randomized.
    pub fn int(test_case: &TestCase, value: Option<i64>, ctx: &mut GenContext) -> Self {
        let mut stmt = Self::create(test_case, PrimitiveValue::Int(value.unwrap_or(0)));
        if value.is_none() {
            stmt.randomize_value(ctx);
        }
        stmt
    }

    /// A float statement. With `None`, a fresh value is randomized.
    pub fn float(test_case: &TestCase, value: Option<f64>, ctx: &mut GenContext) -> Self {
        let mut stmt = Self::create(test_case, PrimitiveValue::Float(value.unwrap_or(0.0)));
        if value.is_none() {
            stmt.randomize_value(ctx);
        }
        stmt
    }

    /// A string statement. With `None`, a fresh value is randomized.
    pub fn string(test_case: &TestCase, value: Option<String>, ctx: &mut GenContext) -> Self {
        let randomize = value.is_none();
        let mut stmt = Self::create(test_case, PrimitiveValue::Str(value.unwrap_or_default()));
        if randomize {
            stmt.randomize_value(ctx);
        }
        stmt
    }

    /// A boolean statement. With `None`, a fresh value is randomized.
    pub fn boolean(test_case: &TestCase, value: Option<bool>, ctx: &mut GenContext) -> Self {
        let mut stmt = Self::create(test_case, PrimitiveValue::Bool(value.unwrap_or(false)));
        if value.is_none() {
            stmt.randomize_value(ctx);
        }
        stmt
    }

    /// A none statement standing in for a missing value of `declared` type.
    pub fn none(test_case: &TestCase, declared: VariableType) -> Self {
        PrimitiveStatement {
            ret_val: VariableReference::fresh(test_case.id(), declared),
            value: PrimitiveValue::None,
        }
    }

    pub fn return_value(&self) -> &VariableReference {
        &self.ret_val
    }

    pub fn value(&self) -> &PrimitiveValue {
        &self.value
    }

    /// Replace the literal value. The new value must stay in the same domain.
    pub fn set_value(&mut self, value: PrimitiveValue) {
        assert_eq!(
            value.variable_type(),
            self.value.variable_type(),
            "value replacement must not change the statement's domain"
        );
        self.value = value;
    }

    pub fn owner(&self) -> TestCaseId {
        self.ret_val.owner()
    }

    /// Overwrite the current value with a fresh stochastic draw.
    pub fn randomize_value(&mut self, ctx: &mut GenContext) {
        match &mut self.value {
            PrimitiveValue::Int(v) => {
                *v = (ctx.randomness.next_gaussian() * f64::from(ctx.config.max_int)) as i64;
            }
            PrimitiveValue::Float(v) => {
                let raw = ctx.randomness.next_gaussian() * f64::from(ctx.config.max_int);
                let precision = ctx.randomness.next_int(0, 7);
                *v = round_to(raw, precision);
            }
            PrimitiveValue::Str(v) => {
                let length = ctx.randomness.next_int(0, ctx.config.string_length as i64 + 1);
                *v = ctx.randomness.next_string(length as usize);
            }
            PrimitiveValue::Bool(v) => {
                *v = ctx.randomness.next_bit();
            }
            PrimitiveValue::None => {}
        }
    }

    /// Perturb the existing value in place.
    ///
    /// Precondition for the int/float/string variants: the value must be
    /// set (nonzero, non-empty). Violations are internal logic errors and
    /// fail fast; they are never attributed to the target program.
    pub fn delta(&mut self, ctx: &mut GenContext) {
        match &mut self.value {
            PrimitiveValue::Int(v) => {
                assert!(*v != 0, "delta() on an unset integer value");
                let step = (ctx.randomness.next_gaussian() * f64::from(ctx.config.max_delta))
                    .floor() as i64;
                // Saturate at the i64 boundary; the step must stay total.
                *v = v.saturating_add(step);
            }
            PrimitiveValue::Float(v) => {
                assert!(*v != 0.0, "delta() on an unset float value");
                let probability = ctx.randomness.next_float();
                if probability < 1.0 / 3.0 {
                    *v += ctx.randomness.next_gaussian() * f64::from(ctx.config.max_delta);
                } else if probability < 2.0 / 3.0 {
                    *v += ctx.randomness.next_gaussian();
                } else {
                    *v = round_to(*v, ctx.randomness.next_int(0, 7));
                }
            }
            PrimitiveValue::Str(v) => {
                assert!(!v.is_empty(), "delta() on an unset string value");
                let mut working_on: Vec<char> = v.chars().collect();
                let p_perform_action = 1.0 / 3.0;
                if ctx.randomness.next_float() < p_perform_action && !working_on.is_empty() {
                    working_on = random_deletion(working_on, &mut ctx.randomness);
                }
                if ctx.randomness.next_float() < p_perform_action && !working_on.is_empty() {
                    working_on = random_replacement(working_on, &mut ctx.randomness);
                }
                if ctx.randomness.next_float() < p_perform_action {
                    working_on = random_insertion(working_on, ctx);
                }
                *v = working_on.into_iter().collect();
            }
            PrimitiveValue::Bool(v) => {
                *v = !*v;
            }
            PrimitiveValue::None => {}
        }
    }

    /// Clone this statement onto `target`, same literal value but a fresh
    /// variable identity. `offset` is the positional shift the caller uses
    /// for remapping; primitive statements reference no earlier variables,
    /// so it is unused here.
    pub fn clone_onto(&self, target: &TestCase, _offset: usize) -> PrimitiveStatement {
        PrimitiveStatement {
            ret_val: VariableReference::fresh(target.id(), self.ret_val.variable_type()),
            value: self.value.clone(),
        }
    }
}

// Structural equality, used by mutation bookkeeping to de-duplicate
// candidate mutants.
impl PartialEq for PrimitiveStatement {
    fn eq(&self, other: &Self) -> bool {
        self.ret_val == other.ret_val && self.value == other.value
    }
}

impl Eq for PrimitiveStatement {}

impl Hash for PrimitiveStatement {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.ret_val.hash(state);
        self.value.hash(state);
    }
}

impl fmt::Display for PrimitiveStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            PrimitiveValue::Int(v) => write!(f, "{v}: int"),
            PrimitiveValue::Float(v) => write!(f, "{v}: float"),
            PrimitiveValue::Str(v) => write!(f, "{v}: str"),
            PrimitiveValue::Bool(v) => write!(f, "{v}: bool"),
            PrimitiveValue::None => write!(f, "None: none"),
        }
    }
}

fn round_to(value: f64, precision: i64) -> f64 {
    let factor = 10f64.powi(precision as i32);
    (value * factor).round() / factor
}

fn random_deletion(working_on: Vec<char>, randomness: &mut Randomness) -> Vec<char> {
    let p_per_char = 1.0 / working_on.len() as f64;
    working_on
        .into_iter()
        .filter(|_| randomness.next_float() >= p_per_char)
        .collect()
}

fn random_replacement(working_on: Vec<char>, randomness: &mut Randomness) -> Vec<char> {
    let p_per_char = 1.0 / working_on.len() as f64;
    working_on
        .into_iter()
        .map(|ch| {
            if randomness.next_float() < p_per_char {
                randomness.next_char()
            } else {
                ch
            }
        })
        .collect()
}

// Inserts at one fixed random position while a geometric continuation test
// passes, never growing past the configured maximum length.
fn random_insertion(mut working_on: Vec<char>, ctx: &mut GenContext) -> Vec<char> {
    let pos = if working_on.is_empty() {
        0
    } else {
        ctx.randomness.next_int(0, working_on.len() as i64) as usize
    };
    let alpha: f64 = 0.5;
    let mut exponent = 1;
    while ctx.randomness.next_float() <= alpha.powi(exponent)
        && working_on.len() < ctx.config.string_length
    {
        exponent += 1;
        working_on.insert(pos, ctx.randomness.next_char());
    }
    working_on
}
