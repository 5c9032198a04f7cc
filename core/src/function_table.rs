// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::operation::{Operation, OperationKind};
use crate::MODULUS;

/// Pluggable, deterministic mapping from an operation to its value.
/// Implementations must return values already reduced into `[0, MODULUS)`.
pub trait FunctionTable: Send + Sync {
    fn evaluate(&self, operation: &Operation) -> u32;

    /// Modular sum of every operation in the batch. Order does not matter.
    fn evaluate_batch(&self, batch: &[Operation]) -> u32 {
        batch
            .iter()
            .fold(0, |acc, op| (acc + self.evaluate(op) % MODULUS) % MODULUS)
    }
}

/// The `pell` / `prime` functions served by every worker
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardFunctions;

impl FunctionTable for StandardFunctions {
    fn evaluate(&self, operation: &Operation) -> u32 {
        match operation.kind {
            OperationKind::Pell => pell(operation.parameter),
            OperationKind::Prime => prime(operation.parameter) % MODULUS,
        }
    }
}

/// n-th Pell number modulo `MODULUS` (P0 = 0, P1 = 1, Pn = 2Pn-1 + Pn-2)
pub fn pell(n: u32) -> u32 {
    let (mut previous, mut current) = (0u32, 1u32);
    if n == 0 {
        return 0;
    }
    for _ in 1..n {
        let next = (2 * current + previous) % MODULUS;
        previous = current;
        current = next;
    }
    current
}

/// Largest prime not greater than `n`, or 0 when there is none
pub fn prime(n: u32) -> u32 {
    (2..=n).rev().find(|&candidate| is_prime(candidate)).unwrap_or(0)
}

fn is_prime(n: u32) -> bool {
    if n < 2 {
        return false;
    }
    if n % 2 == 0 {
        return n == 2;
    }
    let n = n as u64;
    let mut divisor = 3u64;
    while divisor * divisor <= n {
        if n % divisor == 0 {
            return false;
        }
        divisor += 2;
    }
    true
}
