//! A minimal element tree for ROM definition documents
//!
//! The definition files are read completely into a tree of [`XmlNode`]s before anything is
//! resolved, because table definitions refer back and forth to each other.

use log::warn;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::path::Path;

use crate::RomDefError;
use crate::attributes::parse_number;

/// An element of a definition document
#[derive(Debug, Clone, PartialEq)]
pub struct XmlNode {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
    text: String,
    /// line of the start tag
    pub line: u32,
}

/// conversion of an attribute value to a typed value
pub trait FromAttribute: Sized {
    /// `None` if the value cannot be represented as `Self`
    fn from_attribute(text: &str) -> Option<Self>;
}

impl FromAttribute for String {
    fn from_attribute(text: &str) -> Option<Self> {
        Some(text.to_string())
    }
}

impl FromAttribute for bool {
    // anything other than "true" is false
    fn from_attribute(text: &str) -> Option<Self> {
        Some(text.trim().eq_ignore_ascii_case("true"))
    }
}

macro_rules! impl_from_attribute_number {
    ( $( $numtype:ty ),* ) => {
        $(
            impl FromAttribute for $numtype {
                fn from_attribute(text: &str) -> Option<Self> {
                    parse_number::<$numtype>(text)
                }
            }
        )*
    };
}

impl_from_attribute_number!(u8, u16, u32, u64, i32, i64, f64);

impl XmlNode {
    /// parse a complete document and return its root element
    ///
    /// # Errors
    ///
    /// [`RomDefError::XmlError`] if the text is not well-formed, [`RomDefError::EmptyDocumentError`]
    /// if it does not contain any element.
    pub fn parse(text: &str) -> Result<XmlNode, RomDefError> {
        parse_document(Path::new(""), text)
    }

    /// the raw value of an attribute
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// get the typed value of an attribute
    ///
    /// The default is returned if the attribute is absent or if its value cannot be converted.
    pub fn attribute<T: FromAttribute>(&self, name: &str, default: T) -> T {
        match self.attr(name) {
            Some(text) => T::from_attribute(text).unwrap_or_else(|| {
                warn!(
                    "line {}: value \"{text}\" of attribute {name} in <{}> is not valid, using the default",
                    self.line, self.name
                );
                default
            }),
            None => default,
        }
    }

    /// the text content of the element, without leading and trailing whitespace
    #[must_use]
    pub fn text(&self) -> &str {
        self.text.trim()
    }

    /// element names are compared without regard to case
    #[must_use]
    pub fn is(&self, tag: &str) -> bool {
        self.name.eq_ignore_ascii_case(tag)
    }

    /// all child elements with the given name, in document order
    pub fn children_named<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a XmlNode> + 'a {
        self.children.iter().filter(move |child| child.is(tag))
    }

    /// the first child element with the given name
    #[must_use]
    pub fn child(&self, tag: &str) -> Option<&XmlNode> {
        self.children.iter().find(|child| child.is(tag))
    }

    /// the text of the first child element with the given name
    #[must_use]
    pub fn child_text(&self, tag: &str) -> Option<&str> {
        self.child(tag).map(XmlNode::text)
    }

    fn from_start(start: &BytesStart, line: u32, filename: &str) -> Result<Self, RomDefError> {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let mut attributes = Vec::new();
        for attribute in start.attributes() {
            let attribute = attribute.map_err(|err| RomDefError::XmlError {
                filename: filename.to_string(),
                line,
                message: format!("invalid attribute in <{name}>: {err}"),
            })?;
            let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
            let value = attribute
                .unescape_value()
                .map_err(|err| RomDefError::XmlError {
                    filename: filename.to_string(),
                    line,
                    message: format!("invalid value of attribute {key} in <{name}>: {err}"),
                })?
                .into_owned();
            attributes.push((key, value));
        }

        Ok(Self {
            name,
            attributes,
            children: Vec::new(),
            text: String::new(),
            line,
        })
    }
}

// tracks the line number of a byte position; positions must be requested in ascending order
struct LineCounter<'a> {
    bytes: &'a [u8],
    pos: usize,
    line: u32,
}

impl<'a> LineCounter<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            bytes: text.as_bytes(),
            pos: 0,
            line: 1,
        }
    }

    fn line_at(&mut self, pos: usize) -> u32 {
        let pos = pos.min(self.bytes.len());
        if pos > self.pos {
            let newlines = self.bytes[self.pos..pos]
                .iter()
                .filter(|ch| **ch == b'\n')
                .count();
            self.line = self
                .line
                .saturating_add(u32::try_from(newlines).unwrap_or(u32::MAX));
            self.pos = pos;
        }
        self.line
    }
}

/// build the element tree of a document
pub(crate) fn parse_document(path: &Path, text: &str) -> Result<XmlNode, RomDefError> {
    let filename = path.to_string_lossy().to_string();
    let mut reader = Reader::from_str(text);
    let mut lines = LineCounter::new(text);
    // open elements; the last one is the innermost
    let mut stack: Vec<XmlNode> = Vec::new();
    let mut root: Option<XmlNode> = None;

    loop {
        let event_pos = reader.buffer_position() as usize;
        let event = reader.read_event().map_err(|err| RomDefError::XmlError {
            filename: filename.clone(),
            line: lines.line_at(reader.error_position() as usize),
            message: err.to_string(),
        })?;
        let line = lines.line_at(event_pos);

        match event {
            Event::Start(start) => {
                stack.push(XmlNode::from_start(&start, line, &filename)?);
            }
            Event::Empty(start) => {
                let node = XmlNode::from_start(&start, line, &filename)?;
                attach_node(&mut stack, &mut root, node, &filename, line)?;
            }
            Event::End(_) => {
                // quick-xml has already verified that the end tag matches the start tag
                if let Some(node) = stack.pop() {
                    attach_node(&mut stack, &mut root, node, &filename, line)?;
                }
            }
            Event::Text(content) => {
                if let Some(current) = stack.last_mut() {
                    let unescaped = content.unescape().map_err(|err| RomDefError::XmlError {
                        filename: filename.clone(),
                        line,
                        message: err.to_string(),
                    })?;
                    current.text.push_str(&unescaped);
                }
            }
            Event::CData(content) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&String::from_utf8_lossy(&content));
                }
            }
            Event::Eof => break,
            // declarations, comments, processing instructions and doctypes carry no definition data
            _ => {}
        }
    }

    if let Some(unclosed) = stack.last() {
        return Err(RomDefError::XmlError {
            filename,
            line: unclosed.line,
            message: format!("element <{}> is not closed", unclosed.name),
        });
    }

    root.ok_or_else(|| RomDefError::EmptyDocumentError {
        filename: path.to_path_buf(),
    })
}

fn attach_node(
    stack: &mut [XmlNode],
    root: &mut Option<XmlNode>,
    node: XmlNode,
    filename: &str,
    line: u32,
) -> Result<(), RomDefError> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(node);
        Ok(())
    } else if root.is_none() {
        *root = Some(node);
        Ok(())
    } else {
        Err(RomDefError::XmlError {
            filename: filename.to_string(),
            line,
            message: format!("unexpected second root element <{}>", node.name),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_tree() {
        let text = r#"<?xml version="1.0" encoding="UTF-8"?>
<!-- comment -->
<roms>
  <rom base="BASE">
    <romid>
      <xmlid>A1B2</xmlid>
    </romid>
    <table name="Fuel &amp; Timing" type="2D" storageaddress="0x10">
      <description>multi
line</description>
      <data><![CDATA[1<2]]></data>
    </table>
  </rom>
</roms>"#;
        let root = XmlNode::parse(text).unwrap();
        assert!(root.is("ROMS"));
        assert_eq!(root.line, 3);
        assert_eq!(root.children.len(), 1);

        let rom = root.child("rom").unwrap();
        assert_eq!(rom.line, 4);
        assert_eq!(rom.attr("base"), Some("BASE"));
        assert_eq!(rom.child("romid").unwrap().child_text("xmlid"), Some("A1B2"));

        let table = rom.children_named("table").next().unwrap();
        assert_eq!(table.line, 8);
        assert_eq!(table.attr("name"), Some("Fuel & Timing"));
        assert_eq!(table.child_text("description"), Some("multi\nline"));
        assert_eq!(table.child_text("data"), Some("1<2"));
        assert_eq!(table.child("data").unwrap().line, 11);
    }

    #[test]
    fn typed_attributes() {
        let node = XmlNode::parse(
            r#"<table sizex="12" sizey="0x10" locked="TRUE" flipx="yes" max="20.5" userlevel="abc"/>"#,
        )
        .unwrap();
        assert_eq!(node.attribute("sizex", 0u32), 12);
        assert_eq!(node.attribute("sizey", 0u32), 16);
        assert!(node.attribute("locked", false));
        // only "true" is true
        assert!(!node.attribute("flipx", true));
        assert_eq!(node.attribute("max", 0.0), 20.5);
        // invalid and missing values fall back to the default
        assert_eq!(node.attribute("userlevel", 3u32), 3);
        assert_eq!(node.attribute("min", 7.0), 7.0);
        assert_eq!(
            node.attribute("name", "unknown".to_string()),
            "unknown".to_string()
        );
    }

    #[test]
    fn malformed() {
        let result = XmlNode::parse("<a>\n<b>\n</a>");
        assert!(matches!(result, Err(RomDefError::XmlError { .. })));

        let result = XmlNode::parse("<a>\n<b/>\n");
        assert!(matches!(result, Err(RomDefError::XmlError { .. })));

        let result = XmlNode::parse("<a/><b/>");
        assert!(matches!(result, Err(RomDefError::XmlError { .. })));

        let result = XmlNode::parse("   ");
        assert!(matches!(result, Err(RomDefError::EmptyDocumentError { .. })));
    }
}
