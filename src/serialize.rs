//! HTML output for [`Document`].
//!
//! Used to write a document back out after records or an evaluation have
//! been marked on it. Text and attribute values are escaped, `script` and
//! `style` content is written raw, and childless void elements get no end
//! tag.

use crate::document::{Child, Document, NodeKey};
use std::fmt::{self, Write};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

enum Step<'a> {
    Open(NodeKey),
    Text { text: &'a str, raw: bool },
    Close(&'a str),
}

impl Document {
    /// Serializes the document as HTML, attributes included.
    ///
    /// ```
    /// use tree_records::Document;
    ///
    /// let mut doc = Document::new("ul");
    /// let li = doc.append_element(doc.root(), "li");
    /// doc.set_attr(li, "data-record-0", "");
    /// doc.append_text(li, "a & b");
    /// assert_eq!(doc.to_html(), r#"<ul><li data-record-0="">a &amp; b</li></ul>"#);
    /// ```
    pub fn to_html(&self) -> String {
        self.to_string()
    }

    /// Writes the document as HTML into `out`.
    pub fn write_html<W: Write>(&self, out: &mut W) -> fmt::Result {
        let mut stack = vec![Step::Open(self.root())];
        while let Some(step) = stack.pop() {
            match step {
                Step::Open(key) => {
                    let tag = self.tag(key);
                    write!(out, "<{tag}")?;
                    for (name, value) in self.attrs(key) {
                        write!(out, " {name}=\"")?;
                        write_escaped(out, value, true)?;
                        out.write_char('"')?;
                    }
                    out.write_char('>')?;

                    let children = self.children(key);
                    if children.is_empty() && is_void_element(tag) {
                        continue;
                    }
                    let raw = is_raw_text_element(tag);
                    stack.push(Step::Close(tag));
                    // Reversed so the first child is popped first.
                    stack.extend(children.iter().rev().map(|child| match child {
                        Child::Element(k) => Step::Open(*k),
                        Child::Text(text) => Step::Text {
                            text: text.as_str(),
                            raw,
                        },
                    }));
                }
                Step::Text { text, raw: true } => out.write_str(text)?,
                Step::Text { text, raw: false } => write_escaped(out, text, false)?,
                Step::Close(tag) => write!(out, "</{tag}>")?,
            }
        }
        Ok(())
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_html(f)
    }
}

fn is_void_element(tag: &str) -> bool {
    VOID_ELEMENTS.iter().any(|void| tag.eq_ignore_ascii_case(void))
}

fn is_raw_text_element(tag: &str) -> bool {
    RAW_TEXT_ELEMENTS.iter().any(|raw| tag.eq_ignore_ascii_case(raw))
}

fn write_escaped<W: Write>(out: &mut W, text: &str, attribute: bool) -> fmt::Result {
    for c in text.chars() {
        match c {
            '&' => out.write_str("&amp;")?,
            '<' => out.write_str("&lt;")?,
            '>' => out.write_str("&gt;")?,
            '"' if attribute => out.write_str("&quot;")?,
            _ => out.write_char(c)?,
        }
    }
    Ok(())
}
