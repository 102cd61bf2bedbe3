//! Random coupon codes, unique against a set of codes already issued
use std::collections::HashSet;

use failure::Error as FailureError;
use rand::Rng;

use errors::Error;
use models::Coupon;

/// Symbols a coupon code is drawn from
pub const CODE_ALPHABET: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789@#$%&*!?";
/// Whole-code draws attempted before giving up
pub const MAX_ATTEMPTS: usize = 1000;

#[derive(Clone, Debug)]
pub struct CodeGenerator {
    alphabet: Vec<char>,
    length: usize,
    max_attempts: usize,
}

impl Default for CodeGenerator {
    fn default() -> Self {
        Self::new(CODE_ALPHABET, Coupon::CODE_LENGTH, MAX_ATTEMPTS)
    }
}

impl CodeGenerator {
    pub fn new(alphabet: &str, length: usize, max_attempts: usize) -> Self {
        Self {
            alphabet: alphabet.chars().collect(),
            length,
            max_attempts,
        }
    }

    fn draw<R: Rng>(&self, rng: &mut R) -> String {
        (0..self.length)
            .map(|_| self.alphabet[rng.gen_range(0, self.alphabet.len())])
            .collect()
    }

    /// Draws codes until one is not in `existing`.
    /// Fails with `Error::GenerationExhausted` after `max_attempts` draws.
    pub fn generate<R: Rng>(&self, rng: &mut R, existing: &HashSet<String>) -> Result<String, FailureError> {
        self.first_free(|| self.draw(rng), existing)
    }

    fn first_free<D>(&self, mut draw: D, existing: &HashSet<String>) -> Result<String, FailureError>
    where
        D: FnMut() -> String,
    {
        for _ in 0..self.max_attempts {
            let code = draw();
            if !existing.contains(&code) {
                return Ok(code);
            }
        }

        Err(format_err!("No free code among {} draws", self.max_attempts)
            .context(Error::GenerationExhausted(self.max_attempts))
            .into())
    }

    /// Generates `count` codes, none in `existing` and no two alike
    pub fn generate_batch<R: Rng>(&self, rng: &mut R, count: usize, existing: &HashSet<String>) -> Result<Vec<String>, FailureError> {
        let mut taken = existing.clone();
        let mut codes = Vec::with_capacity(count);
        for _ in 0..count {
            let code = self.generate(rng, &taken)?;
            taken.insert(code.clone());
            codes.push(code);
        }
        Ok(codes)
    }
}
