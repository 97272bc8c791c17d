//! XML payload support: conversion into the shared JSON value tree and XPath 1.0 queries.

use serde_json::{Map, Value as JsonValue};
use sxd_document::dom::{ChildOfElement, ChildOfRoot, Element};
use sxd_document::parser;
use sxd_xpath::{evaluate_xpath, Value as XPathValue};

/// Key for the text of an element that also has attributes or child elements.
pub const TEXT_KEY: &str = "#text";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum XmlError {
    #[error("invalid xml document: {0}")]
    Parse(String),
    #[error("xml document has no root element")]
    NoRoot,
    #[error("invalid xpath '{expression}': {message}")]
    XPath { expression: String, message: String },
}

/// Converts a document into a value tree. The root element itself is
/// dropped; its content becomes the top-level value.
pub fn to_json(xml: &str) -> Result<JsonValue, XmlError> {
    let package = parser::parse(xml).map_err(|e| XmlError::Parse(format!("{e:?}")))?;
    let document = package.as_document();
    let root = document
        .root()
        .children()
        .into_iter()
        .find_map(|c| match c {
            ChildOfRoot::Element(e) => Some(e),
            _ => None,
        })
        .ok_or(XmlError::NoRoot)?;
    Ok(element_to_json(root))
}

fn element_to_json(element: Element<'_>) -> JsonValue {
    let mut map = Map::new();
    for attr in element.attributes() {
        map.insert(
            attr.name().local_part().to_string(),
            JsonValue::String(attr.value().to_string()),
        );
    }

    let mut grouped: Vec<(String, Vec<JsonValue>)> = Vec::new();
    let mut text = String::new();
    for child in element.children() {
        match child {
            ChildOfElement::Element(e) => {
                let name = e.name().local_part().to_string();
                let value = element_to_json(e);
                match grouped.iter_mut().find(|(n, _)| *n == name) {
                    Some((_, values)) => values.push(value),
                    None => grouped.push((name, vec![value])),
                }
            }
            ChildOfElement::Text(t) => text.push_str(t.text()),
            _ => {}
        }
    }

    let text = text.trim();
    if map.is_empty() && grouped.is_empty() {
        return JsonValue::String(text.to_string());
    }
    for (name, mut values) in grouped {
        let value = if values.len() == 1 {
            values.remove(0)
        } else {
            JsonValue::Array(values)
        };
        map.insert(name, value);
    }
    if !text.is_empty() {
        map.insert(TEXT_KEY.to_string(), JsonValue::String(text.to_string()));
    }
    JsonValue::Object(map)
}

fn evaluate<T>(
    xml: &str,
    expression: &str,
    read: impl FnOnce(XPathValue<'_>) -> T,
) -> Result<T, XmlError> {
    let package = parser::parse(xml).map_err(|e| XmlError::Parse(format!("{e:?}")))?;
    let document = package.as_document();
    let value = evaluate_xpath(&document, expression).map_err(|e| XmlError::XPath {
        expression: expression.to_string(),
        message: format!("{e:?}"),
    })?;
    Ok(read(value))
}

/// Evaluates `expression` and coerces the result with XPath boolean rules.
pub fn evaluate_boolean(xml: &str, expression: &str) -> Result<bool, XmlError> {
    evaluate(xml, expression, |v| v.boolean())
}

/// String value of the first node selected by `expression`, if any.
pub fn select_text(xml: &str, expression: &str) -> Result<Option<String>, XmlError> {
    evaluate(xml, expression, |v| match v {
        XPathValue::Nodeset(nodes) => nodes.document_order_first().map(|n| n.string_value()),
        other => Some(other.string()),
    })
}
