use thiserror::Error;

use crate::types::DiagnosticKind;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValuationError {
    #[error("Missing data: {0}")]
    MissingData(String),

    #[error("Invalid assumption: {0}")]
    InvalidAssumption(String),

    #[error("No applicable valuation: {0}")]
    AggregateFailure(String),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

impl ValuationError {
    /// Diagnostic tag used when the error is folded into a result.
    pub fn kind(&self) -> DiagnosticKind {
        match self {
            ValuationError::MissingData(_) => DiagnosticKind::MissingData,
            ValuationError::InvalidAssumption(_) | ValuationError::InvalidConfig(_) => {
                DiagnosticKind::InvalidAssumption
            }
            ValuationError::AggregateFailure(_) => DiagnosticKind::AggregateFailure,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ValuationError::MissingData(m)
            | ValuationError::InvalidAssumption(m)
            | ValuationError::AggregateFailure(m)
            | ValuationError::InvalidConfig(m) => m,
        }
    }
}
