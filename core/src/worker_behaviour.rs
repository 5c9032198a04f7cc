// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Simulated unreliability of a worker.
//!
//! Whether a batch is refused, answered dishonestly or computed for real is
//! decided by [`decide`], a pure function of the batch size, the worker's
//! profile and a [`DrawSource`]. Production workers draw from the thread RNG;
//! tests inject scripted draws.

use rand::Rng;

/// Batches larger than `HARD_CEILING_FACTOR * capacity` are always refused
pub const HARD_CEILING_FACTOR: usize = 5;

/// Fabricated results are drawn uniformly from `[0, DISHONEST_CEILING)`
pub const DISHONEST_CEILING: u32 = 1234;

/// Source of uniform random draws
pub trait DrawSource: Send {
    /// Uniform value in `[0, 1)`
    fn next_unit(&mut self) -> f64;

    /// Uniform integer in `[0, bound)`; `bound` is never 0
    fn below(&mut self, bound: u32) -> u32;
}

/// Draws from the thread-local RNG
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadDraws;

impl DrawSource for ThreadDraws {
    fn next_unit(&mut self) -> f64 {
        rand::rng().random::<f64>()
    }

    fn below(&mut self, bound: u32) -> u32 {
        rand::rng().random_range(0..bound)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BehaviourProfile {
    pub capacity: usize,
    pub malicious_rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Overloaded,
    /// Answer with this value instead of computing
    Dishonest(u32),
    Honest,
}

/// Probability of refusing a batch of `batch_len` operations.
/// Grows linearly from 0 at `capacity` to 1 at `5 * capacity`.
pub fn refusal_rate(batch_len: usize, capacity: usize) -> f64 {
    if batch_len <= capacity {
        return 0.0;
    }
    let excess = (batch_len - capacity) as f64;
    (excess / (4.0 * capacity as f64)).min(1.0)
}

pub fn decide(batch_len: usize, profile: &BehaviourProfile, draws: &mut dyn DrawSource) -> Verdict {
    let capacity = profile.capacity;

    if batch_len > capacity.saturating_mul(HARD_CEILING_FACTOR) {
        return Verdict::Overloaded;
    }

    // only batches above capacity consume an overload draw
    if batch_len > capacity && draws.next_unit() <= refusal_rate(batch_len, capacity) {
        return Verdict::Overloaded;
    }

    if draws.next_unit() < profile.malicious_rate {
        return Verdict::Dishonest(draws.below(DISHONEST_CEILING));
    }

    Verdict::Honest
}
