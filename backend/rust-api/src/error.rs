use thiserror::Error;

/// Failure to obtain a usable set of questions. Terminal for one start attempt.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SupplyError {
    #[error("No questions available for topic {topic}")]
    Empty { topic: String },

    #[error("Invalid question data: {0}")]
    Invalid(String),

    #[error("Malformed supply response: {0}")]
    Malformed(String),

    #[error("Question generator returned error {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("Question generator request failed: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for SupplyError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Malformed(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

/// Failure to persist a finished session. Logged, never surfaced to gameplay.
#[derive(Error, Debug)]
pub enum RecorderError {
    #[error("Recorder rejected result with status {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("Recorder request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Recorder timed out after {0}ms")]
    Timeout(u64),

    #[error("Recorder does not support {0}")]
    Unsupported(&'static str),
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostError {
    #[error("Game host is no longer running")]
    Closed,
}
