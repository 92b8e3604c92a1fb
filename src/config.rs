use serde::{Deserialize, Serialize};

/// Numeric knobs consumed by the statement mutation operators.
///
/// Always passed in explicitly (usually inside a [`GenContext`]) so runs
/// stay reproducible; there is no process-wide instance.
///
/// [`GenContext`]: crate::statement::GenContext
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Configuration {
    /// Magnitude scale for freshly randomized integers and floats.
    pub max_int: u32,
    /// Step scale for incremental (delta) perturbations.
    pub max_delta: u32,
    /// Maximum length of generated or mutated strings.
    pub string_length: usize,
}

impl Default for Configuration {
    fn default() -> Self {
        Configuration {
            max_int: 2048,
            max_delta: 20,
            string_length: 20,
        }
    }
}
