use thiserror::Error;

use crate::domain::quote::QuoteStatus;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid status transition from {from:?} to {to:?}")]
    InvalidStatusTransition { from: QuoteStatus, to: QuoteStatus },
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("system templates cannot be modified or deleted")]
    SystemTemplateProtected,
    #[error("quote {0} is no longer editable")]
    NotEditable(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

impl ApplicationError {
    /// Message safe to surface to an end user without leaking internals.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Domain(DomainError::InvalidStatusTransition { .. }) => {
                "This quote is not in a state that allows that action."
            }
            Self::Domain(DomainError::SystemTemplateProtected) => {
                "Built-in templates cannot be changed. Duplicate the template first."
            }
            Self::Domain(_) => "The request could not be processed. Check inputs and try again.",
            Self::NotFound(_) => "The requested record does not exist.",
            Self::Persistence(_) => "The service is temporarily unavailable. Please retry shortly.",
            Self::Configuration(_) => "An unexpected internal error occurred.",
        }
    }
}
