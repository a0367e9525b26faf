//! Render Model - Conversion between the document and its views
//!
//! This crate turns the document tree into view trees (the persisted
//! markup form and the live editing form), reads view trees back into the
//! model, and keeps a live view in step with committed edits.

mod error;
mod live;
pub mod rules;
mod upcast;
mod view;

pub use error::*;
pub use live::*;
pub use rules::{downcast, Downcaster, ViewMode};
pub use upcast::*;
pub use view::*;
