//! Error types for the section generation engine.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Core(#[from] scribe_core::Error),

  #[error("section uses CSV data but no CSV has been uploaded for this report")]
  NoCsvBound,

  #[error("{what} responses: expected at most {expected}, got {got}")]
  ResponseCount {
    what:     &'static str,
    expected: usize,
    got:      usize,
  },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
