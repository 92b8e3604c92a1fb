/// Seedable randomness source backing all statement randomization and
/// mutation. Wraps a `fastrand::Rng` so two sources built with the same seed
/// produce identical draw sequences.
#[derive(Debug, Clone)]
pub struct Randomness {
    rng: fastrand::Rng,
    // Box-Muller produces samples in pairs; the second is kept for the next call.
    spare_gaussian: Option<f64>,
}

/// Printable ASCII range used for random characters, space through tilde.
const CHAR_LO: u8 = 0x20;
const CHAR_HI: u8 = 0x7e;

impl Randomness {
    pub fn new() -> Self {
        Randomness {
            rng: fastrand::Rng::new(),
            spare_gaussian: None,
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Randomness {
            rng: fastrand::Rng::with_seed(seed),
            spare_gaussian: None,
        }
    }

    /// Uniform float in `[0, 1)`.
    pub fn next_float(&mut self) -> f64 {
        self.rng.f64()
    }

    /// Standard normal sample via the polar Box-Muller transform.
    pub fn next_gaussian(&mut self) -> f64 {
        if let Some(spare) = self.spare_gaussian.take() {
            return spare;
        }
        loop {
            let u = 2.0 * self.rng.f64() - 1.0;
            let v = 2.0 * self.rng.f64() - 1.0;
            let s = u * u + v * v;
            if s > 0.0 && s < 1.0 {
                let factor = (-2.0 * s.ln() / s).sqrt();
                self.spare_gaussian = Some(v * factor);
                return u * factor;
            }
        }
    }

    /// Uniform integer in `[lower, upper)`. Panics if the range is empty.
    pub fn next_int(&mut self, lower: i64, upper: i64) -> i64 {
        assert!(lower < upper, "empty range [{lower}, {upper})");
        self.rng.i64(lower..upper)
    }

    /// One printable ASCII character.
    pub fn next_char(&mut self) -> char {
        self.rng.u8(CHAR_LO..=CHAR_HI) as char
    }

    /// A string of `length` printable ASCII characters.
    pub fn next_string(&mut self, length: usize) -> String {
        (0..length).map(|_| self.next_char()).collect()
    }

    /// A uniformly random bit.
    pub fn next_bit(&mut self) -> bool {
        self.rng.bool()
    }
}

impl Default for Randomness {
    fn default() -> Self {
        Randomness::new()
    }
}
