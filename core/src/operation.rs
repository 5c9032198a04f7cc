// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Closed vocabulary of integer functions a worker knows how to evaluate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationKind {
    Pell,
    Prime,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Pell => "pell",
            OperationKind::Prime => "prime",
        }
    }
}

impl FromStr for OperationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pell" => Ok(OperationKind::Pell),
            "prime" => Ok(OperationKind::Prime),
            other => Err(format!("unknown operation '{}'", other)),
        }
    }
}

/// A single `(kind, parameter)` descriptor, immutable once parsed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Operation {
    pub kind: OperationKind,
    pub parameter: u32,
}

impl Operation {
    pub fn new(kind: OperationKind, parameter: u32) -> Self {
        Self { kind, parameter }
    }
}

/// Wire format: `<kind> <parameter>`
impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind.as_str(), self.parameter)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed operation at line {line}: {reason}")]
pub struct MalformedOperation {
    /// 1-based line number, 0 when the text did not come from a file
    pub line: usize,
    pub reason: String,
}

impl FromStr for Operation {
    type Err = MalformedOperation;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = |reason: String| MalformedOperation { line: 0, reason };

        let mut parts = s.split_whitespace();
        let kind = parts
            .next()
            .ok_or_else(|| malformed("empty line".to_string()))?
            .parse::<OperationKind>()
            .map_err(malformed)?;
        let parameter = parts
            .next()
            .ok_or_else(|| malformed(format!("missing parameter for '{}'", kind.as_str())))?;
        if !parameter.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed(format!(
                "invalid parameter '{}': expected a non-negative decimal integer",
                parameter
            )));
        }
        let parameter = parameter
            .parse::<u32>()
            .map_err(|e| malformed(format!("invalid parameter '{}': {}", parameter, e)))?;

        if let Some(extra) = parts.next() {
            return Err(malformed(format!("unexpected token '{}'", extra)));
        }

        Ok(Operation { kind, parameter })
    }
}

/// How ingestion reacts to a line that does not parse
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParsePolicy {
    /// Skip the line and log a warning
    #[default]
    Lenient,
    /// Abort ingestion at the first bad line
    Strict,
}

/// Parses newline-delimited operations. Blank lines are ignored under both policies.
pub fn parse_operations(text: &str, policy: ParsePolicy) -> Result<Vec<Operation>, MalformedOperation> {
    let mut operations = Vec::new();

    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match line.parse::<Operation>() {
            Ok(operation) => operations.push(operation),
            Err(mut e) => {
                e.line = index + 1;
                match policy {
                    ParsePolicy::Strict => return Err(e),
                    ParsePolicy::Lenient => {
                        tracing::warn!(line = e.line, reason = %e.reason, "skipping malformed operation");
                    }
                }
            }
        }
    }

    Ok(operations)
}
