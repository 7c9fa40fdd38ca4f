//! Section generation for Scribe reports.
//!
//! [`generate`] fills a report section's outputs from submitted answers, the
//! report's bound CSV and a [`TextGenerator`](scribe_core::generator::TextGenerator).
//! [`apply_responses`] records answers and CSV/chart configuration without
//! generating. [`OpenAiGenerator`] is the production text generator.

pub mod error;
mod generate;
mod openai;
mod responses;

pub use error::{Error, Result};
pub use generate::{
  DatasetFailure, GenerateRequest, GenerationReport, GeneratorFailure, bind_answers, generate,
};
pub use openai::{OpenAiError, OpenAiGenerator};
pub use responses::{ChartOutputResponse, CsvDataResponse, DependentColumnResponse, apply_responses};
