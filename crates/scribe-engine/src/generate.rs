//! The generation pipeline for one report section.
//!
//! Phases run in order: answer binding, static substitution, CSV scalars
//! (followed by a second substitution pass that can see their results),
//! chart datasets, generator prompts. Label collisions and a missing CSV are
//! detected before the section is touched. A CSV aggregate, chart or
//! generator output that fails is reported and the rest still run.

use scribe_core::{
  generator::TextGenerator,
  report::{Answer, ReportQuestion, ReportSection, TextOutputType},
  substitute::{Bindings, ensure_unique_labels},
};
use scribe_csv::CsvTable;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Inputs to [`generate`] besides the section itself.
#[derive(Debug, Clone, Copy)]
pub struct GenerateRequest<'a> {
  pub answers:        &'a [Answer],
  /// Report-wide questions. Their answers fill placeholders no section
  /// question or CSV label claims.
  pub globals:        &'a [ReportQuestion],
  pub csv:            Option<&'a CsvTable>,
  /// Re-run generator outputs that already hold a result.
  pub regenerate_llm: bool,
}

/// A generator output whose prompt failed. Its previous `Result` is kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratorFailure {
  pub output_index: usize,
  pub title:        String,
  pub message:      String,
}

/// A `CSVData` entry or chart that could not be evaluated over the bound
/// CSV. Its result is cleared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetFailure {
  /// `CSVData` or `ChartOutputs`.
  pub list:    &'static str,
  pub index:   usize,
  /// The entry's label, or the chart's title.
  pub name:    String,
  pub message: String,
}

/// Non-fatal outcomes of a generation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationReport {
  /// Submitted answer labels that match no question in the section.
  pub unresolved_labels: Vec<String>,
  pub dataset_errors:    Vec<DatasetFailure>,
  pub generator_errors:  Vec<GeneratorFailure>,
}

/// Store each answer on the question it targets (see [`Answer::resolve`]).
/// Returns the answers that matched nothing, by label or `#index`.
pub fn bind_answers(section: &mut ReportSection, answers: &[Answer]) -> Vec<String> {
  let mut unresolved = Vec::new();
  for (position, answer) in answers.iter().enumerate() {
    match answer.resolve(&section.questions, position) {
      Some(index) => section.questions[index].answer = answer.answer.clone(),
      None => unresolved.push(answer.describe(position)),
    }
  }
  unresolved
}

fn answer_pairs(questions: &[ReportQuestion]) -> impl Iterator<Item = (&str, &str)> {
  questions
    .iter()
    .filter(|q| !q.answer.is_empty())
    .map(|q| (q.label.as_str(), q.answer.as_str()))
}

fn render_static(section: &mut ReportSection, bindings: &Bindings) {
  for output in &mut section.text_outputs {
    if output.kind == TextOutputType::Static {
      output.result = bindings.apply(&output.input);
    }
  }
}

/// Run every generation phase over `section`.
///
/// On `Err` the caller must discard the section; it may be partially
/// updated. Generator failures are not errors: they are collected in the
/// returned report and the affected outputs keep their previous result.
/// CSV aggregates and charts that fail are collected the same way, with
/// their results cleared.
pub async fn generate<G: TextGenerator>(
  section: &mut ReportSection,
  request: GenerateRequest<'_>,
  generator: &G,
) -> Result<GenerationReport> {
  ensure_unique_labels(
    section
      .questions
      .iter()
      .map(|q| q.label.as_str())
      .chain(section.csv_data.iter().map(|d| d.label.as_str())),
  )?;
  let needs_csv = !section.csv_data.is_empty() || !section.chart_outputs.is_empty();
  let table = match request.csv {
    Some(table) => Some(table),
    None if needs_csv => return Err(Error::NoCsvBound),
    None => None,
  };

  let mut report = GenerationReport {
    unresolved_labels: bind_answers(section, request.answers),
    ..Default::default()
  };

  let mut bindings = Bindings::new(answer_pairs(&section.questions));
  render_static(section, &bindings);

  if let Some(table) = table {
    for (index, data) in section.csv_data.iter_mut().enumerate() {
      match scribe_csv::scalar(table, data) {
        Ok(result) => data.result = result,
        Err(e) => {
          warn!(label = %data.label, error = %e, "CSV aggregate failed");
          data.result.clear();
          report.dataset_errors.push(DatasetFailure {
            list: "CSVData",
            index,
            name: data.label.clone(),
            message: e.to_string(),
          });
        }
      }
    }
    bindings.extend(
      section
        .csv_data
        .iter()
        .filter(|d| !d.result.is_empty())
        .map(|d| (d.label.as_str(), d.result.as_str())),
    );
    for (index, chart) in section.chart_outputs.iter_mut().enumerate() {
      match scribe_csv::chart_results(table, chart) {
        Ok(results) => chart.results = results,
        Err(e) => {
          warn!(chart = %chart.title, error = %e, "chart evaluation failed");
          chart.results.clear();
          report.dataset_errors.push(DatasetFailure {
            list: "ChartOutputs",
            index,
            name: chart.title.clone(),
            message: e.to_string(),
          });
        }
      }
    }
  }
  bindings.extend(answer_pairs(request.globals));
  render_static(section, &bindings);

  for (index, output) in section.text_outputs.iter_mut().enumerate() {
    if output.kind != TextOutputType::Generator {
      continue;
    }
    if !request.regenerate_llm && !output.result.is_empty() {
      continue;
    }
    let prompt = bindings.apply(&output.input);
    debug!(output = %output.title, "requesting generated text");
    match generator.complete(prompt).await {
      Ok(text) => output.result = text,
      Err(e) => {
        warn!(output = %output.title, error = %e, "text generation failed");
        report.generator_errors.push(GeneratorFailure {
          output_index: index,
          title:        output.title.clone(),
          message:      e.to_string(),
        });
      }
    }
  }

  section.output_generated = true;
  Ok(report)
}
