//! XMLTV serialization for the unified guide

use quick_xml::Writer;
use quick_xml::escape::partial_escape;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};

use crate::errors::{AppError, AppResult};
use crate::models::{GuideDocument, XmlElement, XmlNode};

pub const XML_DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>";
pub const XMLTV_DOCTYPE: &str = "<!DOCTYPE tv SYSTEM \"xmltv.dtd\">";

/// Indentation placed before each top-level child of an element-only root
const ROOT_CHILD_INDENT: &str = "\n  ";

/// Render the fixed two-line preamble followed by the element tree
///
/// Text is written exactly as parsed. Only an element-only root gets one
/// child per line; nothing below it is re-indented.
pub fn render_guide(document: &GuideDocument) -> AppResult<String> {
    let mut writer = Writer::new(Vec::new());
    write_root(&mut writer, &document.root)?;
    let body = String::from_utf8(writer.into_inner())
        .map_err(|e| AppError::parse("unified guide", format!("Serialized output is not UTF-8: {e}")))?;

    let mut xmltv = String::with_capacity(body.len() + 96);
    xmltv.push_str(XML_DECLARATION);
    xmltv.push('\n');
    xmltv.push_str(XMLTV_DOCTYPE);
    xmltv.push('\n');
    xmltv.push_str(&body);
    xmltv.push('\n');
    Ok(xmltv)
}

fn write_root<W: std::io::Write>(writer: &mut Writer<W>, root: &XmlElement) -> AppResult<()> {
    let element_only = root
        .children
        .iter()
        .all(|node| matches!(node, XmlNode::Element(_)));
    if root.children.is_empty() || !element_only {
        return write_element(writer, root);
    }

    emit(writer, Event::Start(start_tag(root)))?;
    for child in root.child_elements() {
        emit(writer, Event::Text(BytesText::from_escaped(ROOT_CHILD_INDENT)))?;
        write_element(writer, child)?;
    }
    emit(writer, Event::Text(BytesText::from_escaped("\n")))?;
    emit(writer, Event::End(BytesEnd::new(root.name.as_str())))
}

fn write_element<W: std::io::Write>(writer: &mut Writer<W>, element: &XmlElement) -> AppResult<()> {
    if element.children.is_empty() {
        return emit(writer, Event::Empty(start_tag(element)));
    }

    emit(writer, Event::Start(start_tag(element)))?;
    for child in &element.children {
        match child {
            XmlNode::Element(child) => write_element(writer, child)?,
            XmlNode::Text(text) => {
                emit(writer, Event::Text(BytesText::from_escaped(partial_escape(text.as_str()))))?
            }
        }
    }
    emit(writer, Event::End(BytesEnd::new(element.name.as_str())))
}

fn start_tag(element: &XmlElement) -> BytesStart<'_> {
    let mut start = BytesStart::new(element.name.as_str());
    for (key, value) in &element.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }
    start
}

fn emit<W: std::io::Write>(writer: &mut Writer<W>, event: Event<'_>) -> AppResult<()> {
    writer
        .write_event(event)
        .map_err(|e| AppError::parse("unified guide", format!("Failed to serialize XML: {e}")))
}
