//! XMLTV guide document model
//!
//! The guide is kept as a generic element tree rather than typed records so
//! that every attribute, child element and text node from a source fragment
//! survives a merge untouched. Channel and programme accessors are thin views
//! over that tree.

use std::collections::{BTreeMap, HashSet};

pub const TV_ELEMENT: &str = "tv";
pub const CHANNEL_ELEMENT: &str = "channel";
pub const PROGRAMME_ELEMENT: &str = "programme";
pub const DISPLAY_NAME_ELEMENT: &str = "display-name";
pub const GENERATOR_ATTRIBUTE: &str = "generator-info-name";

/// A node inside an XML element
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlNode {
    Element(XmlElement),
    /// Unescaped character data (CDATA sections are folded in here)
    Text(String),
}

/// An XML element with ordered attributes and children
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

impl XmlElement {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_attribute<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.set_attribute(key, value);
        self
    }

    pub fn with_text<S: Into<String>>(mut self, text: S) -> Self {
        self.children.push(XmlNode::Text(text.into()));
        self
    }

    pub fn with_child(mut self, child: XmlElement) -> Self {
        self.children.push(XmlNode::Element(child));
        self
    }

    /// Value of the first attribute named `key`
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Replace an existing attribute in place or append a new one
    pub fn set_attribute<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) {
        let key = key.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| *k == key) {
            Some(existing) => existing.1 = value,
            None => self.attributes.push((key, value)),
        }
    }

    pub fn push_element(&mut self, child: XmlElement) {
        self.children.push(XmlNode::Element(child));
    }

    /// Child elements in document order, skipping text
    pub fn child_elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|node| match node {
            XmlNode::Element(element) => Some(element),
            XmlNode::Text(_) => None,
        })
    }

    /// Child elements with the given tag name
    pub fn elements_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.child_elements().filter(move |e| e.name == name)
    }

    /// Concatenated direct text content
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|node| match node {
                XmlNode::Text(text) => Some(text.as_str()),
                XmlNode::Element(_) => None,
            })
            .collect()
    }
}

/// A parsed or merged XMLTV document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuideDocument {
    pub root: XmlElement,
}

impl GuideDocument {
    /// An empty `<tv generator-info-name="...">` document
    pub fn new(generator_name: &str) -> Self {
        Self {
            root: XmlElement::new(TV_ELEMENT).with_attribute(GENERATOR_ATTRIBUTE, generator_name),
        }
    }

    pub fn from_root(root: XmlElement) -> Self {
        Self { root }
    }

    /// Top-level children in document order
    pub fn top_level_elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.root.child_elements()
    }

    pub fn append(&mut self, element: XmlElement) {
        self.root.push_element(element);
    }

    pub fn channels(&self) -> impl Iterator<Item = &XmlElement> {
        self.root.elements_named(CHANNEL_ELEMENT)
    }

    pub fn programmes(&self) -> impl Iterator<Item = &XmlElement> {
        self.root.elements_named(PROGRAMME_ELEMENT)
    }

    /// Distinct non-empty channel ids
    pub fn channel_ids(&self) -> HashSet<&str> {
        self.channels()
            .filter_map(|c| c.attribute("id"))
            .filter(|id| !id.is_empty())
            .collect()
    }

    /// Channel ids declared by more than one `<channel>` record, with counts
    pub fn duplicate_channel_ids(&self) -> BTreeMap<String, usize> {
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for id in self.channels().filter_map(|c| c.attribute("id")) {
            *counts.entry(id.to_string()).or_default() += 1;
        }
        counts.retain(|_, count| *count > 1);
        counts
    }

    /// Minimal channel record: id plus a single display name
    pub fn channel_record(id: &str, display_name: &str) -> XmlElement {
        XmlElement::new(CHANNEL_ELEMENT)
            .with_attribute("id", id)
            .with_child(XmlElement::new(DISPLAY_NAME_ELEMENT).with_text(display_name))
    }
}
