use std::fmt;

use thiserror::Error;

/// Push-relabel invariants verified after termination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Invariant {
    /// Outgoing flows of a vertex sum to the negation of its excess.
    Conservation,
    /// No edge carries more flow than its capacity.
    CapacityBound,
    /// Paired edges carry opposite flows.
    ResidualPairing,
    /// No unsaturated edge is steeper than one level.
    LabelValidity,
    /// No vertex below height `n` keeps excess.
    LeftoverExcess,
}

impl fmt::Display for Invariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Invariant::Conservation => "flow conservation",
            Invariant::CapacityBound => "capacity bound",
            Invariant::ResidualPairing => "residual pairing",
            Invariant::LabelValidity => "label validity",
            Invariant::LeftoverExcess => "leftover excess",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum FlowError {
    #[error("malformed input: {0}")]
    MalformedInput(String),
    #[error("{invariant} violated at vertex {vertex}: {detail}")]
    CorrectnessViolation {
        vertex: usize,
        invariant: Invariant,
        detail: String,
    },
}

impl FlowError {
    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        FlowError::MalformedInput(msg.into())
    }

    pub(crate) fn violation(
        vertex: usize,
        invariant: Invariant,
        detail: impl Into<String>,
    ) -> Self {
        FlowError::CorrectnessViolation {
            vertex,
            invariant,
            detail: detail.into(),
        }
    }
}
