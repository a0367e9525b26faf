//! Error types for storage operations

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Markup error: {0}")]
    Xml(String),

    #[error("Document model error: {0}")]
    DocModel(#[from] doc_model::DocModelError),

    #[error("Conversion error: {0}")]
    Render(#[from] render_model::RenderError),

    #[error("File not found: {0}")]
    FileNotFound(String),
}

impl From<quick_xml::Error> for StoreError {
    fn from(err: quick_xml::Error) -> Self {
        StoreError::Xml(err.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for StoreError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        StoreError::Xml(format!("Attribute error: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
