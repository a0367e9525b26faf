//! Store - Footnote markup persistence and editor settings
//!
//! This crate reads and writes the canonical footnote markup, converts it
//! to and from the document tree, and persists editor settings.

mod data;
mod error;
mod markup;
mod settings;

pub use data::*;
pub use error::*;
pub use markup::*;
pub use settings::*;
