//! Core types and trait definitions for the Scribe report service.
//!
//! This crate holds the report/template document model, the structural
//! editing rules shared by both document kinds, and the traits implemented by
//! storage, blob and text-generation backends. It has no HTTP, database or
//! network dependencies.

// Native `async fn` in traits; the futures are declared `Send` explicitly.
#![allow(async_fn_in_trait)]

pub mod access;
pub mod blob;
pub mod convert;
pub mod error;
pub mod generator;
pub mod item;
pub mod operation;
pub mod report;
pub mod store;
pub mod structure;
pub mod substitute;
pub mod template;

pub use error::{Error, Result};
pub use item::{Document, ItemKind, ItemMeta, ItemSummary, Part, SectionLike, User};
pub use operation::Operation;
pub use report::{Report, ReportSection};
pub use template::{Template, TemplateSection};
