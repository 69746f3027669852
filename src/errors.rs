use thiserror::Error;

/// Coarse failure classes surfaced to the user.
///
/// Transport errors and non-2xx responses are not told apart: reads collapse
/// into `Load`, writes into `Save`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Load,
    Save,
    Validation,
}

#[derive(Debug, Error)]
#[error("{message}")]
pub struct ClientError {
    pub kind: ErrorKind,
    pub message: String,
}

impl ClientError {
    pub fn load(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Load,
            message: message.into(),
        }
    }

    pub fn save(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Save,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Validation,
            message: message.into(),
        }
    }

    pub fn is_validation(&self) -> bool {
        self.kind == ErrorKind::Validation
    }
}
