use thiserror::Error;

use crate::step::StepType;

/// Navigation and flow-table errors.
///
/// These are either programmer errors (fail fast, never retried) or
/// structurally fatal to the wizard session and surfaced to the host for
/// fallback handling.
#[derive(Error, Debug)]
pub enum FlowError {
    #[error("step position {position} out of range (flow has {count} steps)")]
    OutOfRange { position: usize, count: usize },

    #[error("no step factory registered for type: {step_type}")]
    UnknownStepType { step_type: StepType },

    #[error("failed to construct step: {step_type}")]
    StepConstruction {
        step_type: StepType,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("step type not found in flow: {step_type}")]
    StepNotFound { step_type: StepType },
}

/// Snapshot file-layer errors.
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("could not determine config directory")]
    NoConfigDir,

    #[error("failed to create snapshot directory: {path}")]
    DirectoryCreationFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to save wizard snapshot to {path}")]
    SaveFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("failed to load wizard snapshot from {path}")]
    LoadFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("failed to delete wizard snapshot at {path}")]
    DeleteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_error_display() {
        let err = FlowError::OutOfRange {
            position: 4,
            count: 3,
        };
        assert_eq!(
            err.to_string(),
            "step position 4 out of range (flow has 3 steps)"
        );

        let err = FlowError::StepNotFound {
            step_type: StepType::new("billing"),
        };
        assert_eq!(err.to_string(), "step type not found in flow: billing");
    }

    #[test]
    fn test_error_source_chain() {
        use std::io;

        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err = PersistenceError::LoadFailed {
            path: "/test/wizard.json".to_string(),
            source: Box::new(io_err),
        };

        assert!(err.source().is_some());
        assert_eq!(
            err.to_string(),
            "failed to load wizard snapshot from /test/wizard.json"
        );
    }
}
