// src/utils/xml.rs

//! Minimal XML tree built on `quick-xml`.
//!
//! The server feeds are small, so the whole document is materialised as a
//! tree of [`XmlElement`]s and navigated by element name.

use std::collections::BTreeMap;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

/// An element with its attributes, direct text and child elements.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlElement {
    pub name: String,
    pub attributes: BTreeMap<String, String>,
    pub text: String,
    pub children: Vec<XmlElement>,
}

impl XmlElement {
    /// Attribute value by name.
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// First child element with the given name.
    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.name == name)
    }

    /// All child elements with the given name, in document order.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Descend through first children matching each name in turn.
    pub fn find(&self, path: &[&str]) -> Option<&XmlElement> {
        path.iter().try_fold(self, |node, name| node.child(name))
    }

    /// Trimmed text content, `None` when there is none.
    pub fn inner_text(&self) -> Option<&str> {
        let text = self.text.trim();
        (!text.is_empty()).then_some(text)
    }

    fn from_start(start: &BytesStart<'_>) -> Option<Self> {
        let name = String::from_utf8(start.name().as_ref().to_vec()).ok()?;
        let mut attributes = BTreeMap::new();
        for attr in start.attributes() {
            let attr = attr.ok()?;
            let key = String::from_utf8(attr.key.as_ref().to_vec()).ok()?;
            let value = attr.unescape_value().ok()?.into_owned();
            attributes.insert(key, value);
        }
        Some(Self {
            name,
            attributes,
            ..Self::default()
        })
    }
}

/// Parse a document and return its root element.
///
/// Returns `None` for malformed markup or a document without any element.
pub fn parse_document(input: &str) -> Option<XmlElement> {
    let mut reader = Reader::from_str(input);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(start)) => stack.push(XmlElement::from_start(&start)?),
            Ok(Event::Empty(start)) => {
                let element = XmlElement::from_start(&start)?;
                attach(&mut stack, &mut root, element);
            }
            Ok(Event::End(_)) => {
                let element = stack.pop()?;
                attach(&mut stack, &mut root, element);
            }
            Ok(Event::Text(text)) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&text.unescape().ok()?);
                }
            }
            Ok(Event::CData(data)) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(std::str::from_utf8(&data).ok()?);
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                log::debug!(
                    "XML parse error at position {}: {}",
                    reader.buffer_position(),
                    e
                );
                return None;
            }
        }
    }

    if stack.is_empty() { root } else { None }
}

fn attach(stack: &mut [XmlElement], root: &mut Option<XmlElement>, element: XmlElement) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None => {
            if root.is_none() {
                *root = Some(element);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nested_document() {
        let doc = parse_document(
            r#"<?xml version="1.0" encoding="utf-8" standalone="no" ?>
            <Server game="Farming Simulator 22" name="Test &amp; Co">
                <Slots capacity="16" numUsed="1">
                    <Player isUsed="true">Alice</Player>
                    <Player isUsed="false"/>
                </Slots>
            </Server>"#,
        )
        .unwrap();

        assert_eq!(doc.name, "Server");
        assert_eq!(doc.attr("name"), Some("Test & Co"));
        let slots = doc.child("Slots").unwrap();
        assert_eq!(slots.attr("numUsed"), Some("1"));

        let players: Vec<_> = slots.children_named("Player").collect();
        assert_eq!(players.len(), 2);
        assert_eq!(players[0].inner_text(), Some("Alice"));
        assert_eq!(players[1].inner_text(), None);
    }

    #[test]
    fn test_find_path() {
        let doc = parse_document(
            "<careerSavegame><statistics><money>1500</money></statistics></careerSavegame>",
        )
        .unwrap();
        let money = doc.find(&["statistics", "money"]).unwrap();
        assert_eq!(money.inner_text(), Some("1500"));
        assert!(doc.find(&["statistics", "playTime"]).is_none());
    }

    #[test]
    fn test_malformed_markup() {
        assert!(parse_document("<Server><Slots></Server>").is_none());
        assert!(parse_document("").is_none());
        assert!(parse_document("just text").is_none());
    }

    #[test]
    fn test_cdata_text() {
        let doc = parse_document("<Mod><![CDATA[Tractor <Deluxe>]]></Mod>").unwrap();
        assert_eq!(doc.inner_text(), Some("Tractor <Deluxe>"));
    }
}
