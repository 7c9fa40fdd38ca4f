//! Report ↔ template conversion.
//!
//! Converting a report strips everything tied to one report instance
//! (answers, generated results, CSV bindings, aggregates and charts).
//! Converting a template yields a report with empty answers and results.

use crate::{
  item::{Document, ItemMeta, Part, User},
  report::{Report, ReportQuestion, ReportSection, TextOutput},
  template::{Template, TemplateQuestion, TemplateSection, TemplateTextOutput},
};

fn map_parts<S, T>(parts: &[Part<S>], f: impl Fn(&S) -> T) -> Vec<Part<T>> {
  parts
    .iter()
    .map(|part| Part {
      title:    part.title.clone(),
      index:    part.index,
      sections: part.sections.iter().map(&f).collect(),
    })
    .collect()
}

fn template_section(section: &ReportSection) -> TemplateSection {
  TemplateSection {
    title:        section.title.clone(),
    index:        section.index,
    questions:    section
      .questions
      .iter()
      .map(|q| TemplateQuestion { label: q.label.clone(), question: q.question.clone() })
      .collect(),
    text_outputs: section
      .text_outputs
      .iter()
      .map(|o| TemplateTextOutput { title: o.title.clone(), kind: o.kind, input: o.input.clone() })
      .collect(),
  }
}

fn report_section(section: &TemplateSection) -> ReportSection {
  ReportSection {
    title:            section.title.clone(),
    index:            section.index,
    output_generated: false,
    questions:        section
      .questions
      .iter()
      .map(|q| ReportQuestion {
        label:    q.label.clone(),
        question: q.question.clone(),
        answer:   String::new(),
      })
      .collect(),
    text_outputs:     section
      .text_outputs
      .iter()
      .map(|o| TextOutput {
        title:  o.title.clone(),
        kind:   o.kind,
        input:  o.input.clone(),
        result: String::new(),
      })
      .collect(),
    csv_data:         Vec::new(),
    chart_outputs:    Vec::new(),
  }
}

/// Build a new template owned by `owner` from the structure of `report`.
pub fn report_to_template(report: &Report, title: String, owner: User, now: i64) -> Template {
  let mut template = Template::new(ItemMeta::new(title, owner, now));
  template.parts = map_parts(&report.parts, template_section);
  template.reindex();
  template
}

/// Build a new report owned by `owner` from `template`.
pub fn template_to_report(
  template: &Template,
  title: String,
  city: String,
  report_type: String,
  owner: User,
  now: i64,
) -> Report {
  let mut report = Report::new(ItemMeta::new(title, owner, now), report_type, city);
  report.parts = map_parts(&template.parts, report_section);
  report.reindex();
  report
}
