use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LeaseProjectionError {
    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Unknown rent model '{0}' (expected FixedEscalation, RevenueShare or PartnerInvestment)")]
    UnknownRentModel(String),

    #[error("Missing baseline: {0}")]
    MissingBaseline(String),

    #[error("Working-capital ratios locked from baseline year {baseline_year}; cannot re-derive")]
    RatiosLocked { baseline_year: i32 },

    #[error("Invalid period sequence: {0}")]
    InvalidSequence(String),

    #[error("Projection exceeded its latency budget of {budget_ms} ms")]
    Timeout { budget_ms: u64 },

    #[error("Computation abandoned: {0}")]
    ComputationAbandoned(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl LeaseProjectionError {
    /// Stable machine-readable code reported to callers.
    pub fn code(&self) -> &'static str {
        match self {
            LeaseProjectionError::InvalidInput { .. } => "INVALID_INPUT",
            LeaseProjectionError::UnknownRentModel(_) => "UNKNOWN_RENT_MODEL",
            LeaseProjectionError::MissingBaseline(_) => "MISSING_BASELINE",
            LeaseProjectionError::RatiosLocked { .. } => "RATIOS_LOCKED",
            LeaseProjectionError::InvalidSequence(_) => "INVALID_SEQUENCE",
            LeaseProjectionError::Timeout { .. } => "TIMEOUT",
            LeaseProjectionError::ComputationAbandoned(_) => "COMPUTATION_ABANDONED",
            LeaseProjectionError::SerializationError(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Configuration errors are fatal and never retried automatically.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            LeaseProjectionError::UnknownRentModel(_)
                | LeaseProjectionError::MissingBaseline(_)
                | LeaseProjectionError::RatiosLocked { .. }
                | LeaseProjectionError::InvalidSequence(_)
        )
    }

    /// A timed-out or abandoned run may succeed when attempted again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LeaseProjectionError::Timeout { .. } | LeaseProjectionError::ComputationAbandoned(_)
        )
    }
}

impl From<serde_json::Error> for LeaseProjectionError {
    fn from(e: serde_json::Error) -> Self {
        LeaseProjectionError::SerializationError(e.to_string())
    }
}
