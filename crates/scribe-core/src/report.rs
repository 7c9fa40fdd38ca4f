//! Report documents: parts of sections holding questions, text outputs, CSV
//! scalar aggregates and chart definitions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::item::{Document, ItemKind, ItemMeta, Part, SectionLike};

/// Column name to the set of values a row must hold in that column.
pub type FilterColumns = BTreeMap<String, Vec<String>>;

// ─── Enumerations ────────────────────────────────────────────────────────────

/// How a text output's `Result` is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextOutputType {
  /// Placeholder substitution over `Input`.
  Static,
  /// `Input` is sent to the text generator as a prompt.
  Generator,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChartType {
  Line,
  Area,
  Bar,
  Scatter,
  Pie,
  Radar,
}

/// The reduction applied over the admitted rows of a CSV column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationType {
  NumericalSum,
  Average,
  UniqueOccurrences,
  #[serde(alias = "SetElementOccurences")]
  SetElementOccurrences,
}

// ─── Section contents ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ReportQuestion {
  pub label:    String,
  pub question: String,
  #[serde(default)]
  pub answer:   String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TextOutput {
  pub title:  String,
  #[serde(rename = "Type")]
  pub kind:   TextOutputType,
  pub input:  String,
  #[serde(default)]
  pub result: String,
}

/// A scalar aggregate over the report's CSV, exposed to text outputs as the
/// placeholder `**<Label>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CsvData {
  pub label:            String,
  #[serde(default)]
  pub description:      String,
  pub operation_type:   OperationType,
  pub operation_column: String,
  #[serde(default)]
  pub accepted_values:  Option<Vec<String>>,
  #[serde(default)]
  pub filter_columns:   Option<FilterColumns>,
  #[serde(default)]
  pub result:           String,
}

/// One dependent series of a chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OneDimensionalConfig {
  pub aggregate_value_label: String,
  pub column:                String,
  #[serde(default)]
  pub description:           String,
  pub operation_type:        OperationType,
  #[serde(default)]
  pub accepted_values:       Option<Vec<String>>,
  #[serde(default)]
  pub filter_columns:        Option<FilterColumns>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ChartOutput {
  pub title:                    String,
  #[serde(rename = "Type")]
  pub kind:                     ChartType,
  #[serde(default)]
  pub description:              String,
  #[serde(default)]
  pub x_axis_title:             String,
  #[serde(default)]
  pub y_axis_title:             String,
  #[serde(default)]
  pub cartesian_grid:           bool,
  pub independent_column_label: String,
  pub independent_column:       String,
  #[serde(default)]
  pub accepted_values:          Option<Vec<String>>,
  #[serde(default)]
  pub filter_columns:           Option<FilterColumns>,
  #[serde(default)]
  pub dependent_columns:        Vec<OneDimensionalConfig>,
  /// One record per independent value: the independent label plus one key
  /// per dependent `AggregateValueLabel`.
  #[serde(default)]
  pub results:                  Vec<Map<String, Value>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ReportSection {
  pub title:            String,
  #[serde(default)]
  pub index:            usize,
  #[serde(default)]
  pub output_generated: bool,
  #[serde(default)]
  pub questions:        Vec<ReportQuestion>,
  #[serde(default)]
  pub text_outputs:     Vec<TextOutput>,
  #[serde(rename = "CSVData", default)]
  pub csv_data:         Vec<CsvData>,
  #[serde(default)]
  pub chart_outputs:    Vec<ChartOutput>,
}

impl SectionLike for ReportSection {
  type Question = ReportQuestion;
  type TextOutput = TextOutput;

  fn new(title: String, questions: Vec<ReportQuestion>, text_outputs: Vec<TextOutput>) -> Self {
    Self {
      title,
      index: 0,
      output_generated: false,
      questions,
      text_outputs,
      csv_data: Vec::new(),
      chart_outputs: Vec::new(),
    }
  }

  fn title(&self) -> &str { &self.title }

  fn set_index(&mut self, index: usize) { self.index = index; }

  fn replace_contents(
    &mut self,
    title: String,
    questions: Vec<ReportQuestion>,
    text_outputs: Vec<TextOutput>,
  ) {
    self.title = title;
    self.questions = questions;
    self.text_outputs = text_outputs;
  }

  fn clear_generated(&mut self) {
    self.output_generated = false;
    for output in &mut self.text_outputs {
      output.result.clear();
    }
    for data in &mut self.csv_data {
      data.result.clear();
    }
    for chart in &mut self.chart_outputs {
      chart.results.clear();
    }
  }
}

// ─── Report ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Report {
  #[serde(rename = "ReportID")]
  pub report_id:          Uuid,
  #[serde(flatten)]
  pub meta:               ItemMeta,
  pub report_type:        String,
  #[serde(default)]
  pub city:               String,
  /// Set together with `csv_columns_s3_key` once an upload is indexed.
  #[serde(rename = "CSVID", default)]
  pub csv_id:             String,
  #[serde(rename = "CSVColumnsS3Key", default)]
  pub csv_columns_s3_key: String,
  /// Report-wide questions whose answers participate in every section's
  /// substitution at lower precedence than section answers.
  #[serde(default)]
  pub global_questions:   Vec<ReportQuestion>,
  #[serde(default)]
  pub parts:              Vec<Part<ReportSection>>,
}

impl Report {
  pub fn new(meta: ItemMeta, report_type: String, city: String) -> Self {
    Self {
      report_id: Uuid::new_v4(),
      meta,
      report_type,
      city,
      csv_id: String::new(),
      csv_columns_s3_key: String::new(),
      global_questions: Vec::new(),
      parts: Vec::new(),
    }
  }

  pub fn has_csv(&self) -> bool { !self.csv_id.is_empty() && !self.csv_columns_s3_key.is_empty() }

  /// Bind an indexed upload. Both fields always change together.
  pub fn bind_csv(&mut self, csv_id: String, columns_key: String) {
    self.csv_id = csv_id;
    self.csv_columns_s3_key = columns_key;
  }
}

impl Document for Report {
  type Section = ReportSection;

  const KIND: ItemKind = ItemKind::Report;

  fn id(&self) -> Uuid { self.report_id }

  fn meta(&self) -> &ItemMeta { &self.meta }

  fn meta_mut(&mut self) -> &mut ItemMeta { &mut self.meta }

  fn parts(&self) -> &[Part<ReportSection>] { &self.parts }

  fn parts_mut(&mut self) -> &mut Vec<Part<ReportSection>> { &mut self.parts }
}

/// An answer submitted for a section question.
///
/// The question is found by `Label` when one is given, otherwise by
/// `QuestionIndex`, otherwise by the answer's own position in the submitted
/// list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
  #[serde(rename = "Label", alias = "label", default, skip_serializing_if = "String::is_empty")]
  pub label:          String,
  #[serde(
    rename = "QuestionIndex",
    alias = "questionIndex",
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub question_index: Option<usize>,
  #[serde(rename = "Answer", alias = "answer")]
  pub answer:         String,
}

impl Answer {
  pub fn labelled(label: impl Into<String>, answer: impl Into<String>) -> Self {
    Self { label: label.into(), question_index: None, answer: answer.into() }
  }

  /// Index into `questions` of the question this answer targets, given its
  /// `position` in the submitted list.
  pub fn resolve(&self, questions: &[ReportQuestion], position: usize) -> Option<usize> {
    if self.label.is_empty() {
      let index = self.question_index.unwrap_or(position);
      (index < questions.len()).then_some(index)
    } else {
      questions.iter().position(|q| q.label == self.label)
    }
  }

  /// How the answer names its question, for warnings.
  pub fn describe(&self, position: usize) -> String {
    if self.label.is_empty() {
      format!("#{}", self.question_index.unwrap_or(position))
    } else {
      self.label.clone()
    }
  }
}
