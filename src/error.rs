use crate::status::Status;

pub type Result<T> = std::result::Result<T, ComputeError>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ComputeError {
    #[error("no compute platform available")]
    NoPlatform,

    #[error("no matching compute device on any platform")]
    NoDevice,

    #[error("{call} failed with {status}")]
    NativeApiFailure { call: &'static str, status: Status },

    #[error("program build failed:\n{log}")]
    BuildFailure { log: String },

    #[error("invalid lifecycle state: {0}")]
    InvalidState(&'static str),

    #[error("config error: {0}")]
    Config(String),
}

impl ComputeError {
    pub fn native(call: &'static str, status: Status) -> Self {
        ComputeError::NativeApiFailure { call, status }
    }

    pub fn build<S: Into<String>>(log: S) -> Self {
        ComputeError::BuildFailure { log: log.into() }
    }

    pub fn config<S: Into<String>>(msg: S) -> Self {
        ComputeError::Config(msg.into())
    }

    /// Status code carried by a native failure.
    pub fn status(&self) -> Option<Status> {
        match self {
            ComputeError::NativeApiFailure { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Aborts on a lifecycle contract violation.
#[track_caller]
pub(crate) fn invalid_state(what: &'static str) -> ! {
    let err = ComputeError::InvalidState(what);
    tracing::error!(%err, "compute context lifecycle violated");
    panic!("{err}")
}
