//! Document Model - Core document tree structure and types
//!
//! This crate provides the document tree the footnote engine operates on:
//! stable node ids, a schema governing nesting and attributes, detached
//! fragments, recorded operations and the footnote lookups and invariant
//! checks shared by the editing and conversion layers.

mod error;
mod fragment;
mod node;
mod operation;
mod query;
mod schema;
mod selection;
mod tree;
pub mod footnote;

pub use error::*;
pub use footnote::*;
pub use fragment::*;
pub use node::*;
pub use operation::*;
pub use query::*;
pub use schema::*;
pub use selection::*;
pub use tree::*;
