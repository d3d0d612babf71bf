//! Building a [`Document`] from JSON or HTML text.
//!
//! JSON is normalized into synthetic tags so the mining pipeline sees one
//! uniform tree shape regardless of source format:
//! - the root is a `json` element,
//! - an object becomes `dict`, holding one element per key in source order,
//! - an array becomes `list`,
//! - a string is stored as the text of its key element,
//! - any other scalar becomes a `null` element whose text is spelled the way
//!   Python's `str` prints it (`None`, `True`, `False`, or the number).

use crate::document::{Document, NodeKey};
use crate::tracing_macros::debug;
use scraper::{ElementRef, Html, Node};
use serde_json::Value;

/// Parses `input` as JSON, falling back to HTML when it is not valid JSON.
pub fn parse_document(input: &str) -> Document {
    match serde_json::from_str::<Value>(input) {
        Ok(value) => from_json_value(&value),
        Err(_) => parse_html(input),
    }
}

/// Parses JSON text into a normalized document.
pub fn parse_json(input: &str) -> serde_json::Result<Document> {
    let value = serde_json::from_str::<Value>(input)?;
    Ok(from_json_value(&value))
}

/// Normalizes an already decoded JSON value.
pub fn from_json_value(value: &Value) -> Document {
    let mut doc = Document::new("json");
    let root = doc.root();
    // (parent, value) pairs still to be attached.
    let mut stack: Vec<(NodeKey, &Value)> = vec![(root, value)];
    while let Some((parent, value)) = stack.pop() {
        match value {
            Value::Object(map) => {
                let dict = doc.append_element(parent, "dict");
                let mut pending = Vec::new();
                for (key, val) in map {
                    let field = doc.append_element(dict, key.as_str());
                    match val {
                        Value::String(s) => doc.append_text(field, s.as_str()),
                        other => pending.push((field, other)),
                    }
                }
                // Each pending parent is distinct, so push order only affects visiting order.
                stack.extend(pending.into_iter().rev());
            }
            Value::Array(items) => {
                let list = doc.append_element(parent, "list");
                stack.extend(items.iter().rev().map(|item| (list, item)));
            }
            scalar => {
                let null = doc.append_element(parent, "null");
                doc.append_text(null, scalar_text(scalar));
            }
        }
    }
    debug!(nodes = doc.len(), "normalized json document");
    doc
}

/// Record texts built from JSON are matched against references produced by
/// Python tooling, so scalars are spelled the way Python's `str` does.
fn scalar_text(value: &Value) -> String {
    match value {
        Value::Null => "None".to_string(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Parses HTML text with an HTML5 tree builder.
///
/// The returned document is rooted at the `html` element. Comments,
/// doctypes and processing instructions are dropped.
pub fn parse_html(input: &str) -> Document {
    let html = Html::parse_document(input);
    let root = html.root_element();
    let mut doc = Document::new(root.value().name());
    let doc_root = doc.root();
    copy_attrs(&mut doc, doc_root, root);

    let mut stack: Vec<(NodeKey, ElementRef<'_>)> = vec![(doc_root, root)];
    while let Some((target, source)) = stack.pop() {
        let mut pending = Vec::new();
        for child in source.children() {
            match child.value() {
                Node::Element(element) => {
                    let key = doc.append_element(target, element.name());
                    if let Some(child_ref) = ElementRef::wrap(child) {
                        copy_attrs(&mut doc, key, child_ref);
                        pending.push((key, child_ref));
                    }
                }
                Node::Text(text) => doc.append_text(target, &**text),
                _ => {}
            }
        }
        stack.extend(pending.into_iter().rev());
    }
    debug!(nodes = doc.len(), "parsed html document");
    doc
}

fn copy_attrs(doc: &mut Document, key: NodeKey, source: ElementRef<'_>) {
    for (name, value) in source.value().attrs() {
        doc.set_attr_if_missing(key, name, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(doc: &Document) -> Vec<String> {
        doc.descendants(doc.root())
            .into_iter()
            .map(|k| doc.tag(k).to_string())
            .collect()
    }

    #[test]
    fn test_json_object_normalization() {
        let doc = parse_json(r#"{"name": "bob", "age": 3, "tags": ["a", null]}"#).unwrap();
        assert_eq!(
            tags(&doc),
            vec!["json", "dict", "name", "age", "null", "tags", "list", "null", "null"]
        );
        assert_eq!(doc.text_content(doc.root()), "bob3aNone");
    }

    #[test]
    fn test_json_keys_keep_source_order() {
        let doc = parse_json(r#"{"z": "1", "a": "2"}"#).unwrap();
        assert_eq!(tags(&doc), vec!["json", "dict", "z", "a"]);
    }

    #[test]
    fn test_json_top_level_scalar() {
        let doc = parse_json("true").unwrap();
        assert_eq!(tags(&doc), vec!["json", "null"]);
        assert_eq!(doc.text_content(doc.root()), "True");
    }

    #[test]
    fn test_json_scalars_spelled_like_python() {
        let doc = parse_json(r#"[null, true, false, 7, 2.5, "x"]"#).unwrap();
        let texts: Vec<String> = doc
            .descendants(doc.root())
            .into_iter()
            .filter(|k| doc.tag(*k) == "null")
            .map(|k| doc.text_content(k))
            .collect();
        assert_eq!(texts, vec!["None", "True", "False", "7", "2.5", "x"]);
    }

    #[test]
    fn test_auto_detection_falls_back_to_html() {
        let doc = parse_document("<ul><li>one</li><li>two</li></ul>");
        assert_eq!(doc.tag(doc.root()), "html");
        let all = tags(&doc);
        assert_eq!(all.iter().filter(|t| *t == "li").count(), 2);

        let doc = parse_document("[1, 2]");
        assert_eq!(doc.tag(doc.root()), "json");
    }

    #[test]
    fn test_html_attributes_and_text() {
        let doc = parse_html(r#"<div class="item" id="x">hello <b>world</b></div>"#);
        let div = doc
            .descendants(doc.root())
            .into_iter()
            .find(|k| doc.tag(*k) == "div")
            .unwrap();
        assert_eq!(doc.attr(div, "class"), Some("item"));
        assert_eq!(doc.attr(div, "id"), Some("x"));
        assert_eq!(doc.text_content(div), "hello world");
        assert_eq!(doc.leading_text(div), Some("hello "));
    }
}
