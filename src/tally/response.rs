//! Parsing of Tally responses.
//!
//! Tally's XML is loosely shaped: the same value may arrive as a child element, an
//! attribute, or bare text, and lists of one collapse to a single element. Responses
//! are therefore read into a generic [`XmlNode`] tree first and the normalisers below
//! look for values in every place Tally has been seen to put them.

use crate::errors::{Error, Result};
use quick_xml::{
    Reader,
    events::{BytesStart, Event},
};
use serde::Serialize;
use std::collections::HashSet;

/// One element of a parsed document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlNode {
    /// Element name as written
    pub name: String,
    /// Attributes in document order
    pub attributes: Vec<(String, String)>,
    /// Concatenated, trimmed text content of this element only
    pub text: String,
    /// Child elements in document order
    pub children: Vec<XmlNode>,
}

impl XmlNode {
    fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    fn from_start(start: &BytesStart<'_>) -> Result<Self> {
        let mut node = Self::named(String::from_utf8_lossy(start.name().as_ref()));
        for attr in start.attributes() {
            let attr = attr.map_err(Error::xml)?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr.unescape_value().map_err(Error::xml)?.into_owned();
            node.attributes.push((key, value));
        }
        Ok(node)
    }

    fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    /// Attribute value by case-insensitive name.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// First direct child with the given case-insensitive name.
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&Self> {
        self.children.iter().find(|c| c.is(name))
    }

    /// First descendant (depth first, excluding `self`) with the given name.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&Self> {
        self.children
            .iter()
            .find_map(|c| if c.is(name) { Some(c) } else { c.find(name) })
    }

    /// Every descendant with the given name, in document order. Matches are not searched
    /// for nested matches.
    #[must_use]
    pub fn find_all(&self, name: &str) -> Vec<&Self> {
        let mut found = Vec::new();
        self.collect(name, &mut found);
        found
    }

    fn collect<'a>(&'a self, name: &str, found: &mut Vec<&'a Self>) {
        for child in &self.children {
            if child.is(name) {
                found.push(child);
            } else {
                child.collect(name, found);
            }
        }
    }

    /// Text of the first descendant named `name`, if it is not blank.
    #[must_use]
    pub fn text_of(&self, name: &str) -> Option<&str> {
        self.find(name)
            .map(|n| n.text.as_str())
            .filter(|t| !t.is_empty())
    }
}

fn append_child(stack: &mut [XmlNode], node: XmlNode) {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(node);
    }
}

fn append_text(stack: &mut [XmlNode], text: &str) {
    let text = text.trim();
    if text.is_empty() {
        return;
    }
    if let Some(node) = stack.last_mut() {
        if !node.text.is_empty() {
            node.text.push(' ');
        }
        node.text.push_str(text);
    }
}

/// Parses any XML document into a tree rooted at a synthetic `#document` node.
///
/// Elements left open at end of input are closed implicitly; Tally occasionally
/// truncates responses when a request times out on its side.
pub fn parse_document(xml: &str) -> Result<XmlNode> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack = vec![XmlNode::named("#document")];
    loop {
        match reader.read_event().map_err(Error::xml)? {
            Event::Start(start) => stack.push(XmlNode::from_start(&start)?),
            Event::Empty(start) => {
                let node = XmlNode::from_start(&start)?;
                append_child(&mut stack, node);
            }
            Event::End(_) => {
                if stack.len() > 1 {
                    if let Some(node) = stack.pop() {
                        append_child(&mut stack, node);
                    }
                }
            }
            Event::Text(text) => {
                let text = text.unescape().map_err(Error::xml)?;
                append_text(&mut stack, &text);
            }
            Event::CData(data) => {
                let bytes = data.into_inner();
                append_text(&mut stack, &String::from_utf8_lossy(&bytes));
            }
            Event::Eof => break,
            _ => {}
        }
    }

    while stack.len() > 1 {
        if let Some(node) = stack.pop() {
            append_child(&mut stack, node);
        }
    }
    stack
        .pop()
        .ok_or_else(|| Error::xml("empty document stack"))
}

/// A company loaded in Tally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TallyCompany {
    pub name: String,
    pub guid: Option<String>,
    /// Books beginning date as Tally prints it (e.g. `20240401`)
    pub starting_from: Option<String>,
}

fn company_name(node: &XmlNode) -> Option<String> {
    node.attribute("NAME")
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .or_else(|| node.child("NAME").map(|n| n.text.as_str()))
        .or_else(|| node.child("NAME.LIST").and_then(|l| l.text_of("NAME")))
        .or_else(|| Some(node.text.as_str()))
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
}

/// Extracts the company list from a collection export response.
///
/// Accepts `COMPANY` elements whose name is an attribute, a `NAME` child, a
/// `NAME.LIST/NAME` pair or the element text, and falls back to bare `COMPANYNAME`
/// elements. Blank and duplicate names are dropped; order is preserved.
pub fn parse_company_list(xml: &str) -> Result<Vec<TallyCompany>> {
    let doc = parse_document(xml)?;
    let mut seen = HashSet::new();
    let mut companies = Vec::new();

    for node in doc.find_all("COMPANY") {
        let Some(name) = company_name(node) else {
            continue;
        };
        if !seen.insert(name.clone()) {
            continue;
        }
        companies.push(TallyCompany {
            name,
            guid: node.text_of("GUID").map(str::to_string),
            starting_from: node.text_of("STARTINGFROM").map(str::to_string),
        });
    }

    if companies.is_empty() {
        for node in doc.find_all("COMPANYNAME") {
            let name = node.text.trim();
            if !name.is_empty() && seen.insert(name.to_string()) {
                companies.push(TallyCompany {
                    name: name.to_string(),
                    guid: None,
                    starting_from: None,
                });
            }
        }
    }

    Ok(companies)
}

/// Counters returned by a data import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportResult {
    pub created: u32,
    pub altered: u32,
    pub deleted: u32,
    pub errors: u32,
    pub exceptions: u32,
    /// Master id of the last voucher Tally created
    pub last_voucher_id: Option<String>,
    /// Per-line error messages
    pub line_errors: Vec<String>,
}

impl ImportResult {
    /// Whether Tally reported any error or exception.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.errors > 0 || self.exceptions > 0 || !self.line_errors.is_empty()
    }
}

fn counter(doc: &XmlNode, name: &str) -> u32 {
    doc.text_of(name)
        .and_then(|t| t.trim().parse().ok())
        .unwrap_or(0)
}

/// Reads the import counters. Missing or unparsable counters count as zero.
pub fn parse_import_result(xml: &str) -> Result<ImportResult> {
    let doc = parse_document(xml)?;
    Ok(ImportResult {
        created: counter(&doc, "CREATED"),
        altered: counter(&doc, "ALTERED"),
        deleted: counter(&doc, "DELETED"),
        errors: counter(&doc, "ERRORS"),
        exceptions: counter(&doc, "EXCEPTIONS"),
        last_voucher_id: doc
            .text_of("LASTVCHID")
            .filter(|id| *id != "0")
            .map(str::to_string),
        line_errors: doc
            .find_all("LINEERROR")
            .into_iter()
            .map(|n| n.text.clone())
            .filter(|t| !t.is_empty())
            .collect(),
    })
}

/// Whether a body is Tally's "server is running" banner.
#[must_use]
pub fn is_running_banner(body: &str) -> bool {
    body.to_ascii_lowercase().contains("is running")
}
