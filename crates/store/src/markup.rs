//! Reading and writing view trees as markup

use crate::{Result, StoreError};
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use render_model::{ViewContent, ViewId, ViewTree};
use std::collections::BTreeMap;

fn xml_err(err: impl std::fmt::Display) -> StoreError {
    StoreError::Xml(err.to_string())
}

// =============================================================================
// Reading
// =============================================================================

/// Parse markup into a view tree. Several top-level elements are allowed.
pub fn parse_markup(markup: &str) -> Result<ViewTree> {
    let mut reader = Reader::from_str(markup);
    let mut view = ViewTree::new();
    let mut stack = vec![view.root()];

    loop {
        let parent = stack.last().copied().unwrap_or(view.root());
        match reader.read_event()? {
            Event::Start(ref e) => {
                let element = append_element(&mut view, parent, e)?;
                stack.push(element);
            }
            Event::Empty(ref e) => {
                append_element(&mut view, parent, e)?;
            }
            Event::End(ref e) => {
                if stack.len() <= 1 {
                    return Err(StoreError::Xml(format!(
                        "unexpected closing tag </{}>",
                        String::from_utf8_lossy(e.name().as_ref())
                    )));
                }
                stack.pop();
            }
            Event::Text(ref e) => {
                let text = e.unescape().map_err(xml_err)?;
                if !text.is_empty() {
                    view.append_text(parent, &text)?;
                }
            }
            Event::CData(ref e) => {
                let text = String::from_utf8_lossy(e);
                if !text.is_empty() {
                    view.append_text(parent, &text)?;
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if stack.len() > 1 {
        return Err(StoreError::Xml("markup ended inside an open element".to_string()));
    }
    Ok(view)
}

fn append_element(view: &mut ViewTree, parent: ViewId, start: &BytesStart<'_>) -> Result<ViewId> {
    let name = std::str::from_utf8(start.name().as_ref())
        .map_err(xml_err)?
        .to_string();

    let mut attributes = BTreeMap::new();
    for attr in start.attributes() {
        let attr = attr?;
        let key = std::str::from_utf8(attr.key.as_ref())
            .map_err(xml_err)?
            .to_string();
        let value = attr.unescape_value().map_err(xml_err)?.into_owned();
        attributes.insert(key, value);
    }

    let element = view.create_element(name, attributes);
    view.append_child(parent, element)?;
    Ok(element)
}

// =============================================================================
// Writing
// =============================================================================

/// Serialize a view tree. Attributes come out in key order and top-level
/// elements are separated by newlines.
pub fn write_markup(view: &ViewTree) -> Result<String> {
    let mut writer = Writer::new(Vec::new());
    for (index, &child) in view.children(view.root()).iter().enumerate() {
        if index > 0 {
            emit(&mut writer, Event::Text(BytesText::new("\n")))?;
        }
        write_node(&mut writer, view, child)?;
    }
    String::from_utf8(writer.into_inner()).map_err(xml_err)
}

fn write_node(writer: &mut Writer<Vec<u8>>, view: &ViewTree, id: ViewId) -> Result<()> {
    let node = view.node(id)?;
    match node.content() {
        ViewContent::Text(data) => emit(writer, Event::Text(BytesText::new(data))),
        ViewContent::Element { name, attributes } => {
            let mut start = BytesStart::new(name.as_str());
            for (key, value) in attributes {
                start.push_attribute((key.as_str(), value.as_str()));
            }
            // Explicit end tags even for empty elements
            emit(writer, Event::Start(start))?;
            for &child in node.children() {
                write_node(writer, view, child)?;
            }
            emit(writer, Event::End(BytesEnd::new(name.as_str())))
        }
    }
}

fn emit(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<()> {
    writer.write_event(event).map_err(xml_err)
}
