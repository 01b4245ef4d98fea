use std::fmt;

use thiserror::Error;

use crate::ast::NodeId;

#[derive(Debug, Error)]
pub enum SvagError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("plugin `{plugin}` failed: {source}")]
    Plugin {
        plugin: String,
        #[source]
        source: PluginError,
    },
}

/// Error raised from inside a visitor hook.
#[derive(Debug, Error)]
pub enum PluginError {
    #[error(transparent)]
    Tree(#[from] TreeError),

    #[error("{0}")]
    Message(String),
}

impl PluginError {
    pub fn msg(message: impl Into<String>) -> Self {
        PluginError::Message(message.into())
    }
}

/// Rejected tree mutation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error("unknown node {0:?}")]
    UnknownNode(NodeId),

    #[error("node {0:?} has no parent")]
    Detached(NodeId),

    #[error("the root node cannot be moved or removed")]
    RootNode,

    #[error("node {0:?} cannot have children")]
    NotAContainer(NodeId),

    #[error("node {0:?} would become its own ancestor")]
    Cycle(NodeId),

    #[error("index {index} is out of bounds for {len} children")]
    IndexOutOfBounds { index: usize, len: usize },
}

/// Fatal error produced while parsing SVG text.
///
/// `Display` prints the one-line message; the alternate form (`{:#}`) prints
/// the full report with a source snippet, see [`ParseError::render`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    reason: String,
    line: usize,
    column: usize,
    source: String,
    path: Option<String>,
}

/// Columns kept to the left of the error column in a snippet.
const SNIPPET_LEAD: usize = 54;
/// Columns kept to the right of the error column in a snippet.
const SNIPPET_TRAIL: usize = 20;
const SNIPPET_MIN_WIDTH: usize = 80;

impl ParseError {
    pub const NAME: &'static str = "SvgoParserError";

    pub fn new(
        reason: impl Into<String>,
        line: usize,
        column: usize,
        source: impl Into<String>,
        path: Option<String>,
    ) -> Self {
        Self {
            reason: reason.into(),
            line,
            column,
            source: source.into(),
            path,
        }
    }

    pub fn name(&self) -> &'static str {
        Self::NAME
    }

    /// Short cause, e.g. "Unquoted attribute value".
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// 1-based line.
    pub fn line(&self) -> usize {
        self.line
    }

    /// 1-based column.
    pub fn column(&self) -> usize {
        self.column
    }

    /// The full text that failed to parse.
    pub fn source_text(&self) -> &str {
        &self.source
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// `path:line:column: reason`, with `<input>` standing in for a missing path.
    pub fn message(&self) -> String {
        format!(
            "{}:{}:{}: {}",
            self.path.as_deref().unwrap_or("<input>"),
            self.line,
            self.column,
            self.reason
        )
    }

    /// Full report: header, blank line, then up to two lines of context on
    /// each side of the failing line with a caret under the failing column.
    pub fn render(&self) -> String {
        let lines: Vec<&str> = self
            .source
            .strip_prefix('\u{feff}')
            .unwrap_or(&self.source)
            .split('\n')
            .map(|l| l.strip_suffix('\r').unwrap_or(l))
            .collect();
        let start_line = self.line.saturating_sub(3).min(lines.len());
        let end_line = (self.line + 2).min(lines.len()).max(start_line);
        let number_width = end_line.to_string().len();
        let start_column = self.column.saturating_sub(SNIPPET_LEAD);
        let end_column = (self.column + SNIPPET_TRAIL).max(SNIPPET_MIN_WIDTH);

        let code: Vec<String> = lines[start_line..end_line]
            .iter()
            .enumerate()
            .map(|(index, line)| {
                let chars: Vec<char> = line.chars().collect();
                let clamp = |i: usize| i.min(chars.len());
                let slice: String = chars[clamp(start_column)..clamp(end_column)].iter().collect();
                let prefix = match start_column {
                    0 => "",
                    c if c >= chars.len() => " ",
                    _ => "…",
                };
                let suffix = if end_column + 1 < chars.len() { "…" } else { "" };
                let number = start_line + 1 + index;
                let gutter = format!(" {number:>number_width$} | ");

                if number != self.line {
                    return format!(" {gutter}{prefix}{slice}{suffix}");
                }

                let gutter_spacing: String = gutter
                    .chars()
                    .map(|c| if c == '|' { '|' } else { ' ' })
                    .collect();
                let before_caret = clamp(self.column.saturating_sub(1)).max(clamp(start_column));
                let line_spacing: String = prefix
                    .chars()
                    .chain(chars[clamp(start_column)..before_caret].iter().copied())
                    .map(|c| if c == '\t' { '\t' } else { ' ' })
                    .collect();
                format!(">{gutter}{prefix}{slice}{suffix}\n {gutter_spacing}{line_spacing}^")
            })
            .collect();

        format!("{}: {}\n\n{}\n", Self::NAME, self.message(), code.join("\n"))
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            f.write_str(&self.render())
        } else {
            f.write_str(&self.message())
        }
    }
}

impl std::error::Error for ParseError {}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = "<svg viewBox=\"0 0 120 120\">\n  <circle fill=\"#ff0000\" cx=60.444444\" cy=\"60\" r=\"50\"/>\n</svg>\n";

    #[test]
    fn test_message_uses_path() {
        let err = ParseError::new("Unquoted attribute value", 2, 29, SOURCE, Some("test.svg".into()));
        assert_eq!(err.message(), "test.svg:2:29: Unquoted attribute value");
        assert_eq!(err.to_string(), err.message());

        let err = ParseError::new("Unclosed root tag", 3, 7, SOURCE, None);
        assert_eq!(err.message(), "<input>:3:7: Unclosed root tag");
    }

    #[test]
    fn test_render_snippet() {
        let err = ParseError::new("Unquoted attribute value", 2, 29, SOURCE, Some("test.svg".into()));
        let expected = concat!(
            "SvgoParserError: test.svg:2:29: Unquoted attribute value\n",
            "\n",
            "  1 | <svg viewBox=\"0 0 120 120\">\n",
            "> 2 |   <circle fill=\"#ff0000\" cx=60.444444\" cy=\"60\" r=\"50\"/>\n",
            "    |                             ^\n",
            "  3 | </svg>\n",
            "  4 | \n",
        );
        assert_eq!(err.render(), expected);
        assert_eq!(format!("{err:#}"), expected);
    }

    #[test]
    fn test_render_limits_context() {
        let source = "a\nb\nc\nd\ne\nf\ng\nh\ni\nj";
        let err = ParseError::new("boom", 9, 1, source, None);
        let rendered = err.render();
        let code: Vec<&str> = rendered.lines().skip(2).collect();
        assert_eq!(code, ["   7 | g", "   8 | h", ">  9 | i", "     | ^", "  10 | j"]);
    }

    #[test]
    fn test_render_truncates_long_lines() {
        let line = format!("{}X{}", "a".repeat(100), "b".repeat(100));
        let err = ParseError::new("bad", 1, 101, line.as_str(), None);
        let rendered = err.render();
        let code: Vec<&str> = rendered.lines().skip(2).collect();
        // window is [47, 121): 53 'a's, the X, 20 'b's
        let shown = format!("…{}X{}…", "a".repeat(53), "b".repeat(20));
        assert_eq!(code[0], format!("> 1 | {shown}"));
        assert_eq!(code[1], format!("    | {}^", " ".repeat(54)));
    }
}
