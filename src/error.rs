use thiserror::Error;

/// Exit status used for any failed, missing or unlaunchable step.
pub const EXIT_FAILURE: u8 = 1;

/// Conventional status for a run terminated by SIGINT.
pub const EXIT_INTERRUPTED: u8 = 130;

/// Reasons a deploy run stops before every step has succeeded.
#[derive(Debug, Error)]
pub enum DeployError {
    #[error("command `{command}` failed with exit code {code}")]
    StepFailed { command: String, code: i32 },

    #[error("executable '{program}' not found")]
    ExecutableNotFound { program: String },

    #[error("could not run '{program}': {reason}")]
    Launch { program: String, reason: String },

    #[error("execution interrupted by user")]
    Interrupted,
}

impl DeployError {
    pub fn exit_code(&self) -> u8 {
        match self {
            DeployError::Interrupted => EXIT_INTERRUPTED,
            DeployError::StepFailed { .. }
            | DeployError::ExecutableNotFound { .. }
            | DeployError::Launch { .. } => EXIT_FAILURE,
        }
    }
}
