use thiserror::Error;

/// Rule violations detected before anything is persisted.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("invalid `{field}`: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },
}

impl DomainError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            DomainError::Validation { message, .. } => message,
        }
    }

    /// Form field the message belongs next to.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            DomainError::Validation { field, .. } => Some(field),
        }
    }
}
