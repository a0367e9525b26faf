//! Edit Engine - Transactions, footnote commands and undo/redo
//!
//! This crate owns the document while it is being edited. All mutations
//! run inside transactions handed a [`Writer`]; follow-up changes queued by
//! a transaction run after it commits, strictly in order. The footnote
//! controller, the delete key rules and the typed markup detector are built
//! on top of that queue.

mod autodetect;
mod command;
mod config;
mod delete_key;
mod error;
mod executor;
mod input;
mod transaction;
mod undo;
pub mod footnote_commands;

pub use autodetect::*;
pub use command::*;
pub use config::*;
pub use delete_key::*;
pub use error::*;
pub use executor::*;
pub use footnote_commands::AutoInsert;
pub use input::*;
pub use transaction::*;
pub use undo::*;
