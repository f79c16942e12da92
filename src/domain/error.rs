use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("domain validation failed: `{field}` must not be empty")]
    EmptyField { field: &'static str },
}

impl DomainError {
    pub fn empty_field(field: &'static str) -> Self {
        Self::EmptyField { field }
    }

    pub fn field(&self) -> &'static str {
        match self {
            Self::EmptyField { field } => field,
        }
    }
}
