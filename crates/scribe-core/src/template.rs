//! Templates: reusable report skeletons. Same part/section tree as a report,
//! but sections carry only unanswered questions and text-output inputs.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::item::{Document, ItemKind, ItemMeta, Part, SectionLike};
use crate::report::TextOutputType;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TemplateQuestion {
  pub label:    String,
  pub question: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TemplateTextOutput {
  pub title: String,
  #[serde(rename = "Type")]
  pub kind:  TextOutputType,
  pub input: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TemplateSection {
  pub title:        String,
  #[serde(default)]
  pub index:        usize,
  #[serde(default)]
  pub questions:    Vec<TemplateQuestion>,
  #[serde(default)]
  pub text_outputs: Vec<TemplateTextOutput>,
}

impl SectionLike for TemplateSection {
  type Question = TemplateQuestion;
  type TextOutput = TemplateTextOutput;

  fn new(
    title: String,
    questions: Vec<TemplateQuestion>,
    text_outputs: Vec<TemplateTextOutput>,
  ) -> Self {
    Self { title, index: 0, questions, text_outputs }
  }

  fn title(&self) -> &str { &self.title }

  fn set_index(&mut self, index: usize) { self.index = index; }

  fn replace_contents(
    &mut self,
    title: String,
    questions: Vec<TemplateQuestion>,
    text_outputs: Vec<TemplateTextOutput>,
  ) {
    self.title = title;
    self.questions = questions;
    self.text_outputs = text_outputs;
  }

  // Templates hold no generated results.
  fn clear_generated(&mut self) {}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Template {
  #[serde(rename = "TemplateID")]
  pub template_id: Uuid,
  #[serde(flatten)]
  pub meta:        ItemMeta,
  #[serde(default)]
  pub parts:       Vec<Part<TemplateSection>>,
}

impl Template {
  pub fn new(meta: ItemMeta) -> Self {
    Self { template_id: Uuid::new_v4(), meta, parts: Vec::new() }
  }
}

impl Document for Template {
  type Section = TemplateSection;

  const KIND: ItemKind = ItemKind::Template;

  fn id(&self) -> Uuid { self.template_id }

  fn meta(&self) -> &ItemMeta { &self.meta }

  fn meta_mut(&mut self) -> &mut ItemMeta { &mut self.meta }

  fn parts(&self) -> &[Part<TemplateSection>] { &self.parts }

  fn parts_mut(&mut self) -> &mut Vec<Part<TemplateSection>> { &mut self.parts }
}
