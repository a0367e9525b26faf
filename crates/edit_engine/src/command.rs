//! Named commands the host editor can register and invoke

use crate::{EditError, EditingEngine, Result};
use doc_model::{footnote_count, DocumentTree, Fragment, Position};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// What a command produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutput {
    None,
    /// Id of the footnote that was created or deleted
    FootnoteId(u32),
    /// Number of Items whose id was repaired
    Renumbered(usize),
}

/// Trait for all editing commands
pub trait Command: std::fmt::Debug {
    /// Run the command as one batch
    fn execute(&self, engine: &mut EditingEngine) -> Result<CommandOutput>;

    /// Whether the command could run against the current document
    fn is_enabled(&self, engine: &EditingEngine) -> bool;

    /// Get a display name for this command
    fn display_name(&self) -> &str;
}

/// The footnote commands, addressed by stable names
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all_fields = "camelCase")]
pub enum FootnoteCommand {
    InsertFootnote { position: Position },
    InsertReference { position: Position, footnote_id: u32 },
    DeleteItem { index: usize },
    RenumberFrom { index: usize },
}

impl FootnoteCommand {
    pub const NAMES: [&'static str; 4] = [
        "InsertFootnote",
        "InsertReference",
        "DeleteItem",
        "RenumberFrom",
    ];

    pub fn name(&self) -> &'static str {
        match self {
            FootnoteCommand::InsertFootnote { .. } => "InsertFootnote",
            FootnoteCommand::InsertReference { .. } => "InsertReference",
            FootnoteCommand::DeleteItem { .. } => "DeleteItem",
            FootnoteCommand::RenumberFrom { .. } => "RenumberFrom",
        }
    }

    /// Build a command from its registered name and a JSON object of
    /// arguments
    pub fn parse(name: &str, args: Value) -> Result<Self> {
        if !Self::NAMES.contains(&name) {
            return Err(EditError::InvalidCommand(format!("unknown command '{}'", name)));
        }
        let mut object = match args {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                return Err(EditError::InvalidCommand(format!(
                    "{} expects an object of arguments, got {}",
                    name, other
                )))
            }
        };
        object.insert("command".to_string(), Value::String(name.to_string()));
        serde_json::from_value(Value::Object(object))
            .map_err(|e| EditError::InvalidCommand(format!("{}: {}", name, e)))
    }
}

/// Whether a Reference may be placed at `position`
fn accepts_reference(tree: &DocumentTree, position: Position) -> bool {
    tree.locate(position).is_ok()
        && tree
            .check_insert(position.node_id, &Fragment::reference(1))
            .is_ok()
}

impl Command for FootnoteCommand {
    fn execute(&self, engine: &mut EditingEngine) -> Result<CommandOutput> {
        match *self {
            FootnoteCommand::InsertFootnote { position } => engine
                .insert_footnote(position)
                .map(CommandOutput::FootnoteId),
            FootnoteCommand::InsertReference {
                position,
                footnote_id,
            } => engine
                .insert_reference(position, footnote_id)
                .map(|_| CommandOutput::None),
            FootnoteCommand::DeleteItem { index } => {
                engine.delete_item(index).map(CommandOutput::FootnoteId)
            }
            FootnoteCommand::RenumberFrom { index } => {
                engine.renumber_from(index).map(CommandOutput::Renumbered)
            }
        }
    }

    fn is_enabled(&self, engine: &EditingEngine) -> bool {
        if engine.is_poisoned() {
            return false;
        }
        let Ok(tree) = engine.tree() else {
            return false;
        };
        let count = footnote_count(tree);
        match *self {
            FootnoteCommand::InsertFootnote { position } => accepts_reference(tree, position),
            FootnoteCommand::InsertReference {
                position,
                footnote_id,
            } => {
                (1..=count).contains(&(footnote_id as usize)) && accepts_reference(tree, position)
            }
            FootnoteCommand::DeleteItem { index } => index < count,
            FootnoteCommand::RenumberFrom { index } => index <= count,
        }
    }

    fn display_name(&self) -> &str {
        match self {
            FootnoteCommand::InsertFootnote { .. } => "Insert Footnote",
            FootnoteCommand::InsertReference { .. } => "Insert Footnote Reference",
            FootnoteCommand::DeleteItem { .. } => "Delete Footnote",
            FootnoteCommand::RenumberFrom { .. } => "Renumber Footnotes",
        }
    }
}

impl EditingEngine {
    /// Execute a command
    pub fn execute(&mut self, command: &dyn Command) -> Result<CommandOutput> {
        command.execute(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn engine() -> (EditingEngine, doc_model::NodeId) {
        let tree = DocumentTree::from_fragments(
            vec![Fragment::element("p").with_child(Fragment::text("abc"))],
            Default::default(),
        )
        .unwrap();
        let p = tree.children(tree.root_id())[0];
        (EditingEngine::with_tree(tree), p)
    }

    #[test]
    fn test_parse_by_name() {
        let (_, p) = engine();
        let position = serde_json::to_value(Position::new(p, 1)).unwrap();

        let command =
            FootnoteCommand::parse("InsertFootnote", json!({ "position": position })).unwrap();
        assert_eq!(command, FootnoteCommand::InsertFootnote { position: Position::new(p, 1) });
        assert_eq!(command.name(), "InsertFootnote");

        let command = FootnoteCommand::parse("DeleteItem", json!({ "index": 2 })).unwrap();
        assert_eq!(command, FootnoteCommand::DeleteItem { index: 2 });

        assert!(FootnoteCommand::parse("Bold", Value::Null).is_err());
        assert!(FootnoteCommand::parse("DeleteItem", json!([1])).is_err());
        assert!(FootnoteCommand::parse("RenumberFrom", Value::Null).is_err());
    }

    #[test]
    fn test_execute_and_enablement() {
        let (mut engine, p) = engine();
        let root = engine.tree().unwrap().root_id();

        let delete = FootnoteCommand::DeleteItem { index: 0 };
        assert!(!delete.is_enabled(&engine));
        assert!(!FootnoteCommand::InsertFootnote { position: Position::new(root, 0) }
            .is_enabled(&engine));

        let insert = FootnoteCommand::InsertFootnote { position: Position::new(p, 3) };
        assert!(insert.is_enabled(&engine));
        assert_eq!(engine.execute(&insert).unwrap(), CommandOutput::FootnoteId(1));

        let reference = FootnoteCommand::InsertReference {
            position: Position::new(p, 0),
            footnote_id: 1,
        };
        assert!(reference.is_enabled(&engine));
        assert_eq!(engine.execute(&reference).unwrap(), CommandOutput::None);

        assert!(delete.is_enabled(&engine));
        assert_eq!(engine.execute(&delete).unwrap(), CommandOutput::FootnoteId(1));
        assert_eq!(delete.display_name(), "Delete Footnote");
    }
}
