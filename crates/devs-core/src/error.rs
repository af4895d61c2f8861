//! Error types for the DEVS simulator
//!
//! Every error is fatal: a simulation either runs to its end time or aborts
//! with a diagnostic naming the model path and, where it applies, the phase,
//! message kind and simulated time.

use thiserror::Error;

use crate::{MessageKind, Operation, SimTime};

/// Core DEVS errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DevsError {
    // Behavior errors
    #[error("{path}: missing {operation} behavior for phase \"{phase}\"")]
    MissingBehavior {
        path: String,
        phase: String,
        operation: Operation,
    },

    #[error("{path}: time advance {value} for phase \"{phase}\" is not a non-negative duration")]
    InvalidTimeAdvance {
        path: String,
        phase: String,
        value: SimTime,
    },

    #[error("{path}: transition from phase \"{from}\" produced an empty phase")]
    EmptyPhase { path: String, from: String },

    // Protocol errors
    #[error("{path}: {kind} requested at invalid time {time} (time_last={time_last}, time_next={time_next})")]
    ProtocolTimingViolation {
        path: String,
        kind: MessageKind,
        time: SimTime,
        time_last: SimTime,
        time_next: SimTime,
    },

    #[error("{path}: unexpected {kind} message")]
    UnexpectedMessage { path: String, kind: MessageKind },

    #[error("simulation stalled at {time}: no DONE reached the root")]
    Stalled { time: SimTime },

    // Build errors
    #[error("{path}: invalid coupling spec '{spec}': {reason}")]
    CouplingResolution {
        path: String,
        spec: String,
        reason: String,
    },

    #[error("{path}: invalid select pattern '{pattern}': {reason}")]
    InvalidSelectPattern {
        path: String,
        pattern: String,
        reason: String,
    },

    #[error("unknown model type '{0}'")]
    UnknownModelType(String),

    #[error("{path}: type mismatch: {reason}")]
    TypeMismatch { path: String, reason: String },

    #[error("{path}: a model named '{name}' exists already")]
    DuplicateModel { path: String, name: String },

    // Selection errors
    #[error("{path}: no select spec matches imminent set {candidates:?} at {time}")]
    SelectionFailure {
        path: String,
        candidates: Vec<String>,
        time: SimTime,
    },

    #[error("{path}: select winner '{winner}' is not among candidates {candidates:?}")]
    InvalidWinner {
        path: String,
        winner: String,
        candidates: Vec<String>,
    },

    // Configuration errors
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl DevsError {
    /// Model path the error refers to, when it has one
    pub fn path(&self) -> Option<&str> {
        match self {
            DevsError::MissingBehavior { path, .. }
            | DevsError::InvalidTimeAdvance { path, .. }
            | DevsError::EmptyPhase { path, .. }
            | DevsError::ProtocolTimingViolation { path, .. }
            | DevsError::UnexpectedMessage { path, .. }
            | DevsError::CouplingResolution { path, .. }
            | DevsError::InvalidSelectPattern { path, .. }
            | DevsError::TypeMismatch { path, .. }
            | DevsError::DuplicateModel { path, .. }
            | DevsError::SelectionFailure { path, .. }
            | DevsError::InvalidWinner { path, .. } => Some(path),
            DevsError::UnknownModelType(_) | DevsError::Stalled { .. } | DevsError::Config(_) => None,
        }
    }

    /// True for errors raised while building the model tree
    pub fn is_build_error(&self) -> bool {
        matches!(
            self,
            DevsError::CouplingResolution { .. }
                | DevsError::InvalidSelectPattern { .. }
                | DevsError::UnknownModelType(_)
                | DevsError::TypeMismatch { .. }
                | DevsError::DuplicateModel { .. }
        )
    }
}

/// Result type for DEVS operations
pub type DevsResult<T> = Result<T, DevsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_behavior_message() {
        let err = DevsError::MissingBehavior {
            path: "/top/x".into(),
            phase: "x".into(),
            operation: Operation::TimeAdvance,
        };
        assert_eq!(
            err.to_string(),
            "/top/x: missing time-advance behavior for phase \"x\""
        );
        assert_eq!(err.path(), Some("/top/x"));
        assert!(!err.is_build_error());
    }

    #[test]
    fn test_timing_violation_message() {
        let err = DevsError::ProtocolTimingViolation {
            path: "/c/proc".into(),
            kind: MessageKind::Star,
            time: SimTime::new(2.0),
            time_last: SimTime::ZERO,
            time_next: SimTime::new(3.0),
        };
        assert_eq!(
            err.to_string(),
            "/c/proc: STAR requested at invalid time 2 (time_last=0, time_next=3)"
        );
    }

    #[test]
    fn test_build_errors() {
        assert!(DevsError::UnknownModelType("Nope".into()).is_build_error());
        assert_eq!(DevsError::Config("x".into()).path(), None);
    }
}
