//! svag - An SVG optimizer
//!
//! svag parses SVG text into a [`Document`], runs an ordered list of
//! [`Plugin`]s over it (repeating the run until the output settles when
//! multipass is on) and serializes the result.
//!
//! ```
//! let out = svag::optimize("<svg><!-- hi --><g/></svg>", &svag::Options::default()).unwrap();
//! assert_eq!(out.data, "<svg/>");
//! ```

mod ast;
mod error;
mod optimize;
mod parse;
pub mod plugins;
mod serialize;
mod tokenize;
mod visitor;

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

pub use ast::*;
pub use error::*;
pub use optimize::*;
pub use parse::*;
pub use serialize::*;
pub use visitor::*;

/// Optimize an SVG string with default settings.
pub fn minify(svg: &str) -> Result<String, SvagError> {
    optimize(svg, &Options::default()).map(|output| output.data)
}

/// Parse, run the configured plugins and serialize.
pub fn optimize(svg: &str, options: &Options) -> Result<Output, SvagError> {
    let mut doc = parse_svg_with_path(svg, options.path.as_deref())?;
    let passes = optimize_document(&mut doc, options)?;
    let mut data = serialize(&doc, &options.serialize);
    if let Some(datauri) = options.datauri {
        data = datauri.encode(&data);
    }
    Ok(Output { data, passes })
}

/// Result of [`optimize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Output {
    pub data: String,
    /// Number of plugin passes that ran
    pub passes: usize,
}

/// Optimization options.
pub struct Options {
    /// Where the input came from. Shown in parse errors and passed to plugins
    pub path: Option<String>,
    /// Repeat passes until the output stops changing (at most [`MAX_PASSES`])
    pub multipass: bool,
    /// Plugins in the order they run
    pub plugins: Vec<Box<dyn Plugin>>,
    pub serialize: SerializeOptions,
    /// Wrap the output in a data URI
    pub datauri: Option<DataUri>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            path: None,
            multipass: false,
            plugins: plugins::preset_default(),
            serialize: SerializeOptions::default(),
            datauri: None,
        }
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let plugins: Vec<&str> = self.plugins.iter().map(|p| p.name()).collect();
        f.debug_struct("Options")
            .field("path", &self.path)
            .field("multipass", &self.multipass)
            .field("plugins", &plugins)
            .field("serialize", &self.serialize)
            .field("datauri", &self.datauri)
            .finish()
    }
}

/// Data URI flavors for the final output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataUri {
    /// `data:image/svg+xml;base64,...`
    Base64,
    /// `data:image/svg+xml,...` with URI component escaping
    Enc,
    /// `data:image/svg+xml,...` with the markup as is
    Unenc,
}

impl DataUri {
    pub fn encode(self, svg: &str) -> String {
        match self {
            DataUri::Base64 => format!("data:image/svg+xml;base64,{}", STANDARD.encode(svg)),
            DataUri::Enc => format!("data:image/svg+xml,{}", encode_uri_component(svg)),
            DataUri::Unenc => format!("data:image/svg+xml,{svg}"),
        }
    }
}

fn encode_uri_component(s: &str) -> String {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";

    let mut out = String::with_capacity(s.len());
    for byte in s.bytes() {
        if byte.is_ascii_alphanumeric() || b"-_.!~*'()".contains(&byte) {
            out.push(byte as char);
        } else {
            out.push('%');
            out.push(HEX[(byte >> 4) as usize] as char);
            out.push(HEX[(byte & 0xf) as usize] as char);
        }
    }
    out
}
