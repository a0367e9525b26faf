//! Document persistence as canonical footnote markup

use crate::{parse_markup, write_markup, Result, StoreError};
use doc_model::{DocumentTree, Schema};
use render_model::{downcast, upcast, UpcastOutput, ViewMode};
use std::path::Path;
use tracing::{debug, warn};

/// Serialize a document to its persisted markup
pub fn save_document(tree: &DocumentTree) -> Result<String> {
    let view = downcast(tree, ViewMode::Data)?;
    let markup = write_markup(&view)?;
    debug!(bytes = markup.len(), "serialized document");
    Ok(markup)
}

/// Parse persisted markup under the default schema
pub fn load_document(markup: &str) -> Result<UpcastOutput> {
    load_document_with_schema(markup, Schema::default())
}

pub fn load_document_with_schema(markup: &str, schema: Schema) -> Result<UpcastOutput> {
    let view = parse_markup(markup)?;
    let output = upcast(&view, schema)?;
    if !output.skipped.is_empty() {
        warn!(
            skipped = output.skipped.len(),
            "markup contained elements that could not be placed"
        );
    }
    Ok(output)
}

/// Load and re-save markup, producing its canonical form
pub fn normalize_markup(markup: &str) -> Result<String> {
    let loaded = load_document(markup)?;
    save_document(&loaded.tree)
}

// =============================================================================
// Files
// =============================================================================

/// Save a document to a file
pub async fn save_document_file(tree: &DocumentTree, path: impl AsRef<Path>) -> Result<()> {
    let markup = save_document(tree)?;
    tokio::fs::write(path, markup).await?;
    Ok(())
}

/// Load a document from a file
pub async fn load_document_file(path: impl AsRef<Path>) -> Result<UpcastOutput> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(StoreError::FileNotFound(path.display().to_string()));
    }
    let markup = tokio::fs::read_to_string(path).await?;
    load_document(&markup)
}

/// Save a document synchronously
pub fn save_document_file_sync(tree: &DocumentTree, path: impl AsRef<Path>) -> Result<()> {
    let markup = save_document(tree)?;
    std::fs::write(path, markup)?;
    Ok(())
}

/// Load a document synchronously
pub fn load_document_file_sync(path: impl AsRef<Path>) -> Result<UpcastOutput> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(StoreError::FileNotFound(path.display().to_string()));
    }
    let markup = std::fs::read_to_string(path)?;
    load_document(&markup)
}
