//! Quick-XML based XMLTV parser
//!
//! Builds the full element tree of a guide document so that content the
//! merger does not understand is carried through verbatim, whitespace
//! included. The one exception is whitespace directly under the root: `<tv>`
//! holds only elements, and the writer lays those out itself.
//! Comments, processing instructions and the DOCTYPE are not retained.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::errors::{AppError, AppResult};
use crate::models::{GuideDocument, XmlElement, XmlNode};

/// Parse raw (already decompressed) bytes into a guide document
///
/// `context` names the input in error messages (a file name or URL).
pub fn parse_guide_bytes(bytes: &[u8], context: &str) -> AppResult<GuideDocument> {
    let content = std::str::from_utf8(bytes)
        .map_err(|e| AppError::parse(context, format!("Invalid UTF-8 in XML content: {e}")))?;
    parse_guide(content, context)
}

/// Parse XMLTV text into a guide document
pub fn parse_guide(content: &str, context: &str) -> AppResult<GuideDocument> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(false);

    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                stack.push(element_from_start(e, context)?);
            }

            Ok(Event::Empty(ref e)) => {
                let element = element_from_start(e, context)?;
                attach(&mut stack, &mut root, element, context)?;
            }

            Ok(Event::End(_)) => {
                let element = stack.pop().ok_or_else(|| {
                    AppError::parse(context, "Closing tag without matching opening tag")
                })?;
                attach(&mut stack, &mut root, element, context)?;
            }

            Ok(Event::Text(e)) => {
                let text = e.unescape().map_err(|err| {
                    AppError::parse(
                        context,
                        format!(
                            "Invalid text at position {}: {err}",
                            reader.buffer_position()
                        ),
                    )
                })?;
                push_text(&mut stack, &text, context)?;
            }

            Ok(Event::CData(e)) => {
                let text = std::str::from_utf8(&e)
                    .map_err(|err| AppError::parse(context, format!("Invalid UTF-8 in CDATA: {err}")))?;
                push_text(&mut stack, text, context)?;
            }

            Ok(Event::Eof) => break,

            Err(e) => {
                return Err(AppError::parse(
                    context,
                    format!(
                        "XML parsing error at position {}: {e}",
                        reader.buffer_position()
                    ),
                ));
            }

            _ => {} // Declarations, DOCTYPE, comments, processing instructions
        }
    }

    if let Some(open) = stack.last() {
        return Err(AppError::parse(
            context,
            format!("Unexpected end of document inside <{}>", open.name),
        ));
    }

    root.map(GuideDocument::from_root)
        .ok_or_else(|| AppError::parse(context, "Document has no root element"))
}

fn element_from_start(start: &BytesStart, context: &str) -> AppResult<XmlElement> {
    let name = std::str::from_utf8(start.name().as_ref())
        .map_err(|e| AppError::parse(context, format!("Invalid UTF-8 in XML element name: {e}")))?
        .to_string();

    let mut element = XmlElement::new(name);
    for attr in start.attributes() {
        let attr = attr.map_err(|e| {
            AppError::parse(
                context,
                format!("Malformed attribute on <{}>: {e}", element.name),
            )
        })?;
        let key = std::str::from_utf8(attr.key.as_ref())
            .map_err(|e| AppError::parse(context, format!("Invalid UTF-8 in attribute name: {e}")))?
            .to_string();
        let value = attr
            .unescape_value()
            .map_err(|e| AppError::parse(context, format!("Invalid attribute value: {e}")))?
            .into_owned();
        element.attributes.push((key, value));
    }
    Ok(element)
}

fn attach(
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
    element: XmlElement,
    context: &str,
) -> AppResult<()> {
    if let Some(parent) = stack.last_mut() {
        parent.push_element(element);
        return Ok(());
    }
    if root.is_some() {
        return Err(AppError::parse(
            context,
            format!("Multiple root elements (found extra <{}>)", element.name),
        ));
    }
    *root = Some(element);
    Ok(())
}

fn push_text(stack: &mut [XmlElement], text: &str, context: &str) -> AppResult<()> {
    let layout_only = text.trim().is_empty();
    let depth = stack.len();
    let Some(parent) = stack.last_mut() else {
        if layout_only {
            return Ok(());
        }
        return Err(AppError::parse(context, "Text content outside the root element"));
    };
    if layout_only && depth == 1 {
        return Ok(());
    }
    match parent.children.last_mut() {
        Some(XmlNode::Text(existing)) => existing.push_str(text),
        _ => parent.children.push(XmlNode::Text(text.to_string())),
    }
    Ok(())
}
