//! Minimal deterministic XML writer.
//!
//! The authority accepts a small fixed schema, so the emitter is deliberately
//! dumb: no namespaces, no CDATA, no configurable formatting. Determinism
//! rules, fixed here and relied on by the golden-document tests:
//! - two-space indentation, `\n` line endings, UTF-8
//! - attributes appear in the order they were supplied
//! - the five XML-special characters are escaped in text and attribute values
//! - leaf elements render on one line, containers on their own lines

const INDENT: &str = "  ";
const DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";

pub struct XmlWriter {
    buf: String,
    open: Vec<String>,
}

impl XmlWriter {
    pub fn new() -> Self {
        XmlWriter { buf: DECLARATION.to_string(), open: Vec::new() }
    }

    /// Open a container element with no attributes.
    pub fn open(&mut self, name: &str) {
        self.open_with(name, &[]);
    }

    /// Open a container element. Attributes are written in slice order.
    pub fn open_with(&mut self, name: &str, attrs: &[(&str, &str)]) {
        self.indent();
        self.buf.push('<');
        self.buf.push_str(name);
        self.push_attrs(attrs);
        self.buf.push_str(">\n");
        self.open.push(name.to_string());
    }

    /// Close the innermost open element. `name` must match the element opened
    /// last; the builder walks a fixed shape, so a mismatch is a bug there.
    pub fn close(&mut self, name: &str) {
        let top = self.open.pop();
        debug_assert_eq!(top.as_deref(), Some(name), "mismatched close");
        self.indent();
        self.buf.push_str("</");
        self.buf.push_str(name);
        self.buf.push_str(">\n");
    }

    /// Write `<name>text</name>` on a single line.
    pub fn leaf(&mut self, name: &str, text: &str) {
        self.leaf_with(name, &[], text);
    }

    pub fn leaf_with(&mut self, name: &str, attrs: &[(&str, &str)], text: &str) {
        self.indent();
        self.buf.push('<');
        self.buf.push_str(name);
        self.push_attrs(attrs);
        self.buf.push('>');
        push_escaped(&mut self.buf, text);
        self.buf.push_str("</");
        self.buf.push_str(name);
        self.buf.push_str(">\n");
    }

    /// Write a self-closing element.
    pub fn empty(&mut self, name: &str) {
        self.indent();
        self.buf.push('<');
        self.buf.push_str(name);
        self.buf.push_str("/>\n");
    }

    /// Consume the writer and return the document.
    pub fn finish(self) -> String {
        debug_assert!(self.open.is_empty(), "unclosed elements: {:?}", self.open);
        self.buf
    }

    fn indent(&mut self) {
        for _ in 0..self.open.len() {
            self.buf.push_str(INDENT);
        }
    }

    fn push_attrs(&mut self, attrs: &[(&str, &str)]) {
        for (k, v) in attrs {
            self.buf.push(' ');
            self.buf.push_str(k);
            self.buf.push_str("=\"");
            push_escaped(&mut self.buf, v);
            self.buf.push('"');
        }
    }
}

fn push_escaped(buf: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '&' => buf.push_str("&amp;"),
            '<' => buf.push_str("&lt;"),
            '>' => buf.push_str("&gt;"),
            '"' => buf.push_str("&quot;"),
            '\'' => buf.push_str("&apos;"),
            _ => buf.push(c),
        }
    }
}
