use thiserror::Error;

// The four error kinds from the core's error handling design: all errors are
// fatal to the current encode() call, no automatic recovery, no partial
// bitstreams are ever emitted.
#[derive(Error, Debug, PartialEq, Eq, Clone)]
pub enum EncodeError {
  #[error("invalid input: {0}")]
  InvalidInput(String),

  #[error("invalid parameter: {0}")]
  InvalidParameter(String),

  #[error("geometry error: {0}")]
  GeometryError(String),

  #[error("internal invariant violated: {0}")]
  InternalInvariantViolated(String),
}

pub type EncodeResult<T> = Result<T, EncodeError>;
