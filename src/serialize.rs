//! SVG serialization, compact or pretty-printed.

use std::borrow::Cow;

use quick_xml::escape::escape;

use crate::ast::*;
use crate::parse::is_text_element;

/// Indentation unit used by pretty output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Indent {
    Spaces(usize),
    Tab,
    Custom(String),
}

impl Indent {
    fn unit(&self) -> Cow<'_, str> {
        match self {
            Indent::Spaces(n) => Cow::Owned(" ".repeat(*n)),
            Indent::Tab => Cow::Borrowed("\t"),
            Indent::Custom(s) => Cow::Borrowed(s),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineEnding {
    #[default]
    Lf,
    Crlf,
}

impl LineEnding {
    pub fn as_str(self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::Crlf => "\r\n",
        }
    }
}

/// Output formatting options.
#[derive(Debug, Clone)]
pub struct SerializeOptions {
    /// Indent nested nodes and put each on its own line
    pub pretty: bool,
    pub indent: Indent,
    pub eol: LineEnding,
    /// End non-empty output with a newline
    pub final_newline: bool,
    /// Write childless elements as `<name/>` rather than `<name></name>`
    pub use_short_tags: bool,
}

impl Default for SerializeOptions {
    fn default() -> Self {
        Self {
            pretty: false,
            indent: Indent::Spaces(4),
            eol: LineEnding::Lf,
            final_newline: false,
            use_short_tags: true,
        }
    }
}

/// Serialize a Document to an SVG string.
pub fn serialize(doc: &Document, options: &SerializeOptions) -> String {
    let mut writer = Writer {
        doc,
        options,
        indent: options.indent.unit(),
        out: String::new(),
        depth: 0,
        in_text: false,
    };
    for &child in doc.children(doc.root()) {
        writer.node(child);
    }

    let mut out = writer.out;
    if options.final_newline && !out.is_empty() && !out.ends_with('\n') {
        out.push_str(options.eol.as_str());
    }
    out
}

struct Writer<'a> {
    doc: &'a Document,
    options: &'a SerializeOptions,
    indent: Cow<'a, str>,
    out: String,
    depth: usize,
    /// Inside an element whose whitespace is significant
    in_text: bool,
}

impl Writer<'_> {
    fn pretty(&self) -> bool {
        self.options.pretty && !self.in_text
    }

    fn line_start(&mut self) {
        if self.pretty() {
            for _ in 0..self.depth {
                self.out.push_str(&self.indent);
            }
        }
    }

    fn line_end(&mut self) {
        if self.pretty() {
            self.out.push_str(self.options.eol.as_str());
        }
    }

    fn node(&mut self, id: NodeId) {
        let doc = self.doc;
        match doc.data(id) {
            Some(NodeData::Element(element)) => self.element(id, element),
            Some(NodeData::Text(text)) => {
                self.line_start();
                self.out.push_str(&escape(text.as_str()));
                self.line_end();
            }
            Some(NodeData::Cdata(data)) => self.delimited("<![CDATA[", data, "]]>"),
            Some(NodeData::Comment(comment)) => self.delimited("<!--", comment, "-->"),
            Some(NodeData::Doctype(body)) => self.delimited("<!DOCTYPE", body, ">"),
            Some(NodeData::Instruction(pi)) => {
                self.line_start();
                self.out.push_str("<?");
                self.out.push_str(&pi.name);
                if !pi.value.is_empty() {
                    self.out.push(' ');
                    self.out.push_str(&pi.value);
                }
                self.out.push_str("?>");
                self.line_end();
            }
            Some(NodeData::Root) | None => {}
        }
    }

    fn delimited(&mut self, open: &str, body: &str, close: &str) {
        self.line_start();
        self.out.push_str(open);
        self.out.push_str(body);
        self.out.push_str(close);
        self.line_end();
    }

    fn element(&mut self, id: NodeId, element: &Element) {
        self.line_start();
        self.out.push('<');
        self.out.push_str(&element.name);
        for attr in element.attributes() {
            self.out.push(' ');
            self.out.push_str(&attr.name);
            self.out.push_str("=\"");
            push_escaped_attr(&mut self.out, &attr.value);
            self.out.push('"');
        }

        let doc = self.doc;
        let children = doc.children(id);
        if children.is_empty() {
            if self.options.use_short_tags {
                self.out.push_str("/>");
            } else {
                self.out.push_str("></");
                self.out.push_str(&element.name);
                self.out.push('>');
            }
            self.line_end();
            return;
        }

        self.out.push('>');
        let starts_text = !self.in_text && is_text_element(&element.name);
        if starts_text {
            self.in_text = true;
        } else {
            self.line_end();
        }

        self.depth += 1;
        for &child in children {
            self.node(child);
        }
        self.depth -= 1;

        if starts_text {
            self.in_text = false;
        } else {
            self.line_start();
        }
        self.out.push_str("</");
        self.out.push_str(&element.name);
        self.out.push('>');
        self.line_end();
    }
}

fn push_escaped_attr(out: &mut String, s: &str) {
    for c in s.chars() {
        match c {
            '"' => out.push_str("&quot;"),
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_svg;

    fn compact(svg: &str) -> String {
        serialize(&parse_svg(svg).unwrap(), &SerializeOptions::default())
    }

    fn pretty(svg: &str, indent: Indent) -> String {
        let options = SerializeOptions {
            pretty: true,
            indent,
            ..SerializeOptions::default()
        };
        serialize(&parse_svg(svg).unwrap(), &options)
    }

    #[test]
    fn test_serialize_simple() {
        let svg = r#"<svg xmlns="http://www.w3.org/2000/svg"><rect/></svg>"#;
        assert_eq!(compact(svg), svg);
        assert_eq!(compact("<svg />"), "<svg/>");
    }

    #[test]
    fn test_serialize_keeps_prolog_and_comments() {
        let svg = r#"<?xml version="1.0"?><!DOCTYPE svg><svg><!-- note --><![CDATA[a<b]]></svg>"#;
        assert_eq!(compact(svg), svg);
    }

    #[test]
    fn test_serialize_escapes() {
        let svg = r#"<svg data-x="a &amp; &quot;b&quot; &lt;c&gt; 'd'"><title>x &lt; y &amp; 'z'</title></svg>"#;
        assert_eq!(
            compact(svg),
            r#"<svg data-x="a &amp; &quot;b&quot; &lt;c&gt; 'd'"><title>x &lt; y &amp; &apos;z&apos;</title></svg>"#
        );
    }

    #[test]
    fn test_long_tags() {
        let options = SerializeOptions {
            use_short_tags: false,
            ..SerializeOptions::default()
        };
        let doc = parse_svg("<svg><g/></svg>").unwrap();
        assert_eq!(serialize(&doc, &options), "<svg><g></g></svg>");
    }

    #[test]
    fn test_pretty() {
        let svg = r#"<svg viewBox="0 0 120 120"><circle cx="60" cy="60" r="50" fill="red"/></svg>"#;
        assert_eq!(
            pretty(svg, Indent::Spaces(2)),
            "<svg viewBox=\"0 0 120 120\">\n  <circle cx=\"60\" cy=\"60\" r=\"50\" fill=\"red\"/>\n</svg>\n"
        );
    }

    #[test]
    fn test_pretty_leaves_text_alone() {
        let svg = "<svg><g><text>Hello <tspan>big</tspan> world</text></g></svg>";
        assert_eq!(
            pretty(svg, Indent::Tab),
            "<svg>\n\t<g>\n\t\t<text>Hello <tspan>big</tspan> world</text>\n\t</g>\n</svg>\n"
        );
    }

    #[test]
    fn test_pretty_crlf_and_custom_indent() {
        let options = SerializeOptions {
            pretty: true,
            indent: Indent::Custom("..".into()),
            eol: LineEnding::Crlf,
            ..SerializeOptions::default()
        };
        let doc = parse_svg("<?xml version=\"1.0\"?><svg><!--c--></svg>").unwrap();
        assert_eq!(
            serialize(&doc, &options),
            "<?xml version=\"1.0\"?>\r\n<svg>\r\n..<!--c-->\r\n</svg>\r\n"
        );
    }

    #[test]
    fn test_final_newline() {
        let options = SerializeOptions {
            final_newline: true,
            ..SerializeOptions::default()
        };
        let doc = parse_svg("<svg/>").unwrap();
        assert_eq!(serialize(&doc, &options), "<svg/>\n");
        assert_eq!(serialize(&Document::new(), &options), "");

        // pretty output already ends with a newline
        let options = SerializeOptions {
            pretty: true,
            ..options
        };
        assert_eq!(serialize(&doc, &options), "<svg/>\n");
    }
}
