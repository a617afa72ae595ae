//! XML support for the XML-speaking providers.
//!
//! - [`parse_xml`] turns a response body into the nested mapping shape the
//!   JSON providers produce natively. Attributes are merged into the same
//!   mapping as child elements, repeated elements become lists, text of an
//!   element without attributes or children becomes a plain string, and the
//!   root element itself is dropped.
//! - [`XmlNode`] is a small typed document tree with an explicit serializer
//!   used to build request bodies.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use serde_json::{Map, Value};

use crate::models::TEXT_KEY;
use crate::sources::SourceError;

/// Parse an XML document into a JSON-like value
pub fn parse_xml(xml: &str) -> Result<Value, SourceError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Value> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => stack.push(Element::open(&e)?),
            Event::Empty(e) => {
                let element = Element::open(&e)?;
                let (name, value) = element.close();
                attach(&mut stack, &mut root, name, value);
            }
            Event::Text(e) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&e.unescape().map_err(xml_error)?);
                }
            }
            Event::CData(e) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&String::from_utf8_lossy(&e.into_inner()));
                }
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| SourceError::Parse("XML: unbalanced end tag".to_string()))?;
                let (name, value) = element.close();
                attach(&mut stack, &mut root, name, value);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(SourceError::Parse("XML: unexpected end of document".to_string()));
    }
    root.ok_or_else(|| SourceError::Parse("XML: document has no root element".to_string()))
}

struct Element {
    name: String,
    fields: Map<String, Value>,
    text: String,
}

impl Element {
    fn open(start: &BytesStart<'_>) -> Result<Self, SourceError> {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let mut fields = Map::new();
        for attr in start.attributes() {
            let attr = attr.map_err(xml_error)?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr.unescape_value().map_err(xml_error)?.into_owned();
            fields.insert(key, Value::String(value));
        }
        Ok(Self {
            name,
            fields,
            text: String::new(),
        })
    }

    fn close(self) -> (String, Value) {
        let value = if self.fields.is_empty() {
            Value::String(self.text)
        } else {
            let mut fields = self.fields;
            if !self.text.is_empty() {
                fields.insert(TEXT_KEY.to_string(), Value::String(self.text));
            }
            Value::Object(fields)
        };
        (self.name, value)
    }
}

fn attach(stack: &mut [Element], root: &mut Option<Value>, name: String, value: Value) {
    let Some(parent) = stack.last_mut() else {
        *root = Some(value);
        return;
    };
    match parent.fields.get_mut(&name) {
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
        None => {
            parent.fields.insert(name, value);
        }
    }
}

/// Content of an XML element
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlContent {
    Text(String),
    Node(XmlNode),
}

/// An element of a request document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlNode {
    pub tag: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlContent>,
}

impl XmlNode {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Add an attribute
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    /// Add a child element
    pub fn child(mut self, node: XmlNode) -> Self {
        self.children.push(XmlContent::Node(node));
        self
    }

    /// Add several child elements
    pub fn children(mut self, nodes: impl IntoIterator<Item = XmlNode>) -> Self {
        self.children
            .extend(nodes.into_iter().map(XmlContent::Node));
        self
    }

    /// Add text content
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.children.push(XmlContent::Text(text.into()));
        self
    }

    /// Serialize as a standalone document with an XML declaration
    pub fn to_document(&self) -> Result<String, SourceError> {
        let mut writer = Writer::new(Vec::new());
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(xml_error)?;
        self.write(&mut writer)?;
        String::from_utf8(writer.into_inner())
            .map_err(xml_error)
    }

    fn write(&self, writer: &mut Writer<Vec<u8>>) -> Result<(), SourceError> {
        let start = BytesStart::new(self.tag.as_str()).with_attributes(
            self.attributes
                .iter()
                .map(|(name, value)| (name.as_str(), value.as_str())),
        );

        if self.children.is_empty() {
            return writer.write_event(Event::Empty(start)).map_err(xml_error);
        }

        writer.write_event(Event::Start(start)).map_err(xml_error)?;
        for child in &self.children {
            match child {
                XmlContent::Text(text) => writer
                    .write_event(Event::Text(BytesText::new(text)))
                    .map_err(xml_error)?,
                XmlContent::Node(node) => node.write(writer)?,
            }
        }
        writer
            .write_event(Event::End(BytesEnd::new(self.tag.as_str())))
            .map_err(xml_error)
    }
}

fn xml_error(err: impl std::fmt::Display) -> SourceError {
    SourceError::Parse(format!("XML: {}", err))
}
