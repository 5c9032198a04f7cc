// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use compute_farm_core::worker_behaviour::DrawSource;
use std::collections::VecDeque;

/// Replays a fixed sequence of draws. Once the script runs out, unit draws
/// return `fallback_unit` and bounded draws return 0.
#[derive(Debug, Clone)]
pub struct ScriptedDraws {
    units: VecDeque<f64>,
    bounded: VecDeque<u32>,
    fallback_unit: f64,
    consumed: usize,
}

impl ScriptedDraws {
    pub fn new(units: Vec<f64>, bounded: Vec<u32>) -> Self {
        Self {
            units: units.into(),
            bounded: bounded.into(),
            fallback_unit: 0.999,
            consumed: 0,
        }
    }

    /// Every unit draw returns `value`
    pub fn constant(value: f64) -> Self {
        let mut draws = Self::new(Vec::new(), Vec::new());
        draws.fallback_unit = value;
        draws
    }

    /// Number of unit draws consumed so far
    pub fn consumed(&self) -> usize {
        self.consumed
    }
}

impl DrawSource for ScriptedDraws {
    fn next_unit(&mut self) -> f64 {
        self.consumed += 1;
        self.units.pop_front().unwrap_or(self.fallback_unit)
    }

    fn below(&mut self, bound: u32) -> u32 {
        self.bounded.pop_front().unwrap_or(0) % bound
    }
}
