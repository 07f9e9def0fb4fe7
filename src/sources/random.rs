//! Uniform random draws in `[0, 1)`.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Mutex;

use rand::Rng;

/// Source of uniformly distributed values in `[0, 1)`.
pub trait RandomSource: Send + Sync + fmt::Debug {
    fn next_f64(&self) -> f64;
}

/// Thread-local RNG from `rand`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn next_f64(&self) -> f64 {
        rand::thread_rng().gen::<f64>()
    }
}

/// Replays a fixed script of values, then repeats `fallback` forever.
///
/// Values are clamped into `[0, 1)` so a script can never produce a draw a
/// real RNG could not.
#[derive(Debug)]
pub struct SequenceRandom {
    script: Mutex<VecDeque<f64>>,
    fallback: f64,
}

impl SequenceRandom {
    pub fn new(script: impl IntoIterator<Item = f64>, fallback: f64) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            fallback,
        }
    }

    /// A source that always returns `value`.
    pub fn constant(value: f64) -> Self {
        Self::new(std::iter::empty(), value)
    }

    /// Number of scripted values not yet consumed.
    pub fn remaining(&self) -> usize {
        self.script.lock().expect("random script mutex poisoned").len()
    }
}

impl RandomSource for SequenceRandom {
    fn next_f64(&self) -> f64 {
        let next = self
            .script
            .lock()
            .expect("random script mutex poisoned")
            .pop_front()
            .unwrap_or(self.fallback);
        next.clamp(0.0, 1.0 - f64::EPSILON)
    }
}
