//! Lookup response parser
//!
//! This module turns a lookup response body into a structured value and
//! decides whether it carries a usable item:
//! - XML elements become objects keyed by child name
//! - Text-only elements become strings
//! - Repeated siblings become arrays; single occurrences stay scalar
//! - Attributes are ignored

use crate::storage::LookupRecord;
use quick_xml::events::Event;
use quick_xml::Reader;
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

/// Root element of a lookup response
pub const RESPONSE_ROOT: &str = "ItemLookupResponse";

/// The literal the validity flag must equal
pub const VALID_FLAG: &str = "True";

/// Errors produced while parsing a response body
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("malformed XML at byte {position}: {message}")]
    Xml { position: usize, message: String },

    #[error("element <{0}> is never closed")]
    Unclosed(String),

    #[error("document has no root element")]
    Empty,
}

/// Result of validating a lookup response
#[derive(Debug, Clone, PartialEq)]
pub enum LookupResult {
    Valid(LookupRecord),
    Invalid(InvalidReason),
}

impl LookupResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }
}

/// Why a response was rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidReason {
    /// The body could not be parsed at all
    Malformed(String),

    /// `ItemLookupResponse.Items` is absent
    MissingItems,

    /// `Items.Request.IsValid` is absent
    MissingValidity,

    /// `Items.Request.IsValid` is present but not `"True"`
    NotValid(String),

    /// `Items.Item` is absent
    MissingItem,
}

impl fmt::Display for InvalidReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed(message) => write!(f, "malformed response ({})", message),
            Self::MissingItems => write!(f, "response has no Items element"),
            Self::MissingValidity => write!(f, "response has no IsValid flag"),
            Self::NotValid(flag) => write!(f, "IsValid is '{}'", flag),
            Self::MissingItem => write!(f, "response has no Item element"),
        }
    }
}

/// One open element while walking the document
struct OpenElement {
    name: String,
    children: Map<String, Value>,
    text: String,
}

impl OpenElement {
    fn new(name: String) -> Self {
        Self {
            name,
            children: Map::new(),
            text: String::new(),
        }
    }

    fn into_value(self) -> (String, Value) {
        let value = if self.children.is_empty() {
            Value::String(self.text)
        } else {
            let mut children = self.children;
            if !self.text.trim().is_empty() {
                children.insert("_".to_string(), Value::String(self.text));
            }
            Value::Object(children)
        };
        (self.name, value)
    }
}

/// Parses an XML document into a structured value
///
/// The result is an object with a single key, the root element name.
///
/// # Example
///
/// ```
/// use asin_ripple::crawler::parse_document;
///
/// let doc = parse_document("<Root><A>1</A><B>2</B><B>3</B></Root>").unwrap();
/// assert_eq!(doc["Root"]["A"], "1");
/// assert_eq!(doc["Root"]["B"][1], "3");
/// ```
pub fn parse_document(xml: &str) -> Result<Value, ParseError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut stack: Vec<OpenElement> = Vec::new();
    let mut root: Option<(String, Value)> = None;

    loop {
        let event = reader.read_event().map_err(|e| ParseError::Xml {
            position: reader.buffer_position(),
            message: e.to_string(),
        })?;

        match event {
            Event::Start(start) => {
                let name = element_name(start.local_name().as_ref(), &reader)?;
                stack.push(OpenElement::new(name));
            }
            Event::Empty(empty) => {
                let name = element_name(empty.local_name().as_ref(), &reader)?;
                let closed = OpenElement::new(name).into_value();
                attach(&mut stack, &mut root, closed);
            }
            Event::Text(text) => {
                let unescaped = text.unescape().map_err(|e| ParseError::Xml {
                    position: reader.buffer_position(),
                    message: e.to_string(),
                })?;
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&unescaped);
                }
            }
            Event::CData(data) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&String::from_utf8_lossy(&data.into_inner()));
                }
            }
            Event::End(_) => {
                // The reader has already checked that the end tag matches.
                if let Some(open) = stack.pop() {
                    attach(&mut stack, &mut root, open.into_value());
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.pop() {
        return Err(ParseError::Unclosed(open.name));
    }

    let (name, value) = root.ok_or(ParseError::Empty)?;
    let mut document = Map::new();
    document.insert(name, value);
    Ok(Value::Object(document))
}

fn element_name(raw: &[u8], reader: &Reader<&[u8]>) -> Result<String, ParseError> {
    std::str::from_utf8(raw)
        .map(str::to_string)
        .map_err(|e| ParseError::Xml {
            position: reader.buffer_position(),
            message: e.to_string(),
        })
}

/// Attaches a closed element to its parent, or makes it the root
fn attach(stack: &mut [OpenElement], root: &mut Option<(String, Value)>, closed: (String, Value)) {
    let (name, value) = closed;
    match stack.last_mut() {
        Some(parent) => insert_child(&mut parent.children, name, value),
        None => {
            if root.is_none() {
                *root = Some((name, value));
            }
        }
    }
}

/// Inserts a child, collapsing repeated names into an array
fn insert_child(children: &mut Map<String, Value>, name: String, value: Value) {
    match children.get_mut(&name) {
        None => {
            children.insert(name, value);
        }
        Some(Value::Array(existing)) => existing.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
    }
}

/// Validates a parsed lookup response
///
/// The response is valid only if `ItemLookupResponse.Items.Item` exists and
/// `ItemLookupResponse.Items.Request.IsValid` is exactly `"True"`. When
/// several items are returned the first one is used.
pub fn validate_lookup(document: &Value) -> LookupResult {
    let Some(items) = document.get(RESPONSE_ROOT).and_then(|r| r.get("Items")) else {
        return LookupResult::Invalid(InvalidReason::MissingItems);
    };

    match items.get("Request").and_then(|r| r.get("IsValid")) {
        Some(Value::String(flag)) if flag == VALID_FLAG => {}
        Some(Value::String(flag)) => {
            return LookupResult::Invalid(InvalidReason::NotValid(flag.clone()))
        }
        Some(other) => return LookupResult::Invalid(InvalidReason::NotValid(other.to_string())),
        None => return LookupResult::Invalid(InvalidReason::MissingValidity),
    }

    let item = match items.get("Item") {
        Some(Value::Array(all)) => all.first().cloned(),
        Some(single) => Some(single.clone()),
        None => None,
    };

    match item {
        Some(item) => LookupResult::Valid(LookupRecord::new(item)),
        None => LookupResult::Invalid(InvalidReason::MissingItem),
    }
}

/// Parses and validates a response body in one step
///
/// Parse failures are reported as `Invalid`; they are an expected, retriable
/// condition rather than an error.
pub fn parse_lookup_response(body: &str) -> LookupResult {
    match parse_document(body) {
        Ok(document) => validate_lookup(&document),
        Err(e) => LookupResult::Invalid(InvalidReason::Malformed(e.to_string())),
    }
}
