pub mod capex;
pub mod config;
pub mod decimal;
pub mod error;
pub mod projection;
pub mod rent;
pub mod revenue;
pub mod time_value;
pub mod types;
pub mod validation;
pub mod working_capital;

#[cfg(feature = "cache")]
pub mod cache;

#[cfg(feature = "scenarios")]
pub mod scenarios;

pub use error::LeaseProjectionError;
pub use projection::deadline::run_with_deadline;
pub use projection::engine::{run_projection, CalculationEngineOutput};
pub use projection::input::{parse_engine_input, EngineInput};
pub use types::*;

/// Standard result type for all lease-projection operations
pub type LeaseProjectionResult<T> = Result<T, LeaseProjectionError>;
