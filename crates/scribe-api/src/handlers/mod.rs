//! axum handlers, grouped by resource.
//!
//! Handlers decode the request, pick the document type from `itemType` where
//! the route serves both kinds, and forward to the workflows in
//! [`crate::service`].

pub mod csv;
pub mod generate;
pub mod hooks;
pub mod items;
pub mod structure;
pub mod users;
