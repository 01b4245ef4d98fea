//! Built-in plugins.
//!
//! A small set of cleanups that exercise the visitor contract. Each plugin is
//! a plain struct whose fields are its parameters.

use crate::ast::*;
use crate::error::PluginError;
use crate::visitor::{Hooks, NodeHooks, Plugin, PluginInfo, Visitor};

/// The default plugin list, in the order it runs.
pub fn preset_default() -> Vec<Box<dyn Plugin>> {
    vec![
        Box::new(RemoveDoctype),
        Box::new(RemoveXmlProcInst),
        Box::new(RemoveComments::default()),
        Box::new(RemoveMetadata),
        Box::new(RemoveEditorsData::default()),
        Box::new(ConvertColors::default()),
        Box::new(CollapseGroups),
        Box::new(RemoveEmptyContainers),
    ]
}

/// Removes the DOCTYPE declaration.
#[derive(Debug, Clone, Copy, Default)]
pub struct RemoveDoctype;

impl Plugin for RemoveDoctype {
    fn name(&self) -> &str {
        "removeDoctype"
    }

    fn visitor<'a>(&'a self, _doc: &Document, _info: &PluginInfo<'_>) -> Option<Box<dyn Visitor + 'a>> {
        Some(Box::new(Hooks {
            doctype: NodeHooks::enter(|doc, node, _| Ok(doc.remove(node)?)),
            ..Hooks::default()
        }))
    }
}

/// Removes the `<?xml ...?>` declaration.
#[derive(Debug, Clone, Copy, Default)]
pub struct RemoveXmlProcInst;

impl Plugin for RemoveXmlProcInst {
    fn name(&self) -> &str {
        "removeXMLProcInst"
    }

    fn visitor<'a>(&'a self, _doc: &Document, _info: &PluginInfo<'_>) -> Option<Box<dyn Visitor + 'a>> {
        Some(Box::new(Hooks {
            instruction: NodeHooks::enter(|doc, node, _| {
                if doc.instruction(node).is_some_and(|pi| pi.name == "xml") {
                    doc.remove(node)?;
                }
                Ok(())
            }),
            ..Hooks::default()
        }))
    }
}

/// Removes comments.
#[derive(Debug, Clone, Copy)]
pub struct RemoveComments {
    /// Keep `<!--! ... -->` comments, used for licenses
    pub preserve_legal: bool,
}

impl Default for RemoveComments {
    fn default() -> Self {
        Self {
            preserve_legal: true,
        }
    }
}

impl Plugin for RemoveComments {
    fn name(&self) -> &str {
        "removeComments"
    }

    fn visitor<'a>(&'a self, _doc: &Document, _info: &PluginInfo<'_>) -> Option<Box<dyn Visitor + 'a>> {
        let preserve_legal = self.preserve_legal;
        Some(Box::new(Hooks {
            comment: NodeHooks::enter(move |doc, node, _| {
                let legal = doc.value(node).is_some_and(|c| c.starts_with('!'));
                if !(preserve_legal && legal) {
                    doc.remove(node)?;
                }
                Ok(())
            }),
            ..Hooks::default()
        }))
    }
}

/// Removes `<metadata>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RemoveMetadata;

impl Plugin for RemoveMetadata {
    fn name(&self) -> &str {
        "removeMetadata"
    }

    fn visitor<'a>(&'a self, _doc: &Document, _info: &PluginInfo<'_>) -> Option<Box<dyn Visitor + 'a>> {
        Some(Box::new(Hooks {
            element: NodeHooks::enter(|doc, node, _| {
                if doc.element(node).is_some_and(|e| e.is("metadata")) {
                    doc.remove(node)?;
                }
                Ok(())
            }),
            ..Hooks::default()
        }))
    }
}

/// Namespaces written by drawing tools that renderers ignore.
pub const EDITOR_NAMESPACES: &[&str] = &[
    "http://creativecommons.org/ns#",
    "http://inkscape.sourceforge.net/DTD/sodipodi-0.dtd",
    "http://krita.org/namespaces/svg/krita",
    "http://ns.adobe.com/AdobeIllustrator/10.0/",
    "http://ns.adobe.com/AdobeSVGViewerExtensions/3.0/",
    "http://ns.adobe.com/Extensibility/1.0/",
    "http://ns.adobe.com/Flows/1.0/",
    "http://ns.adobe.com/GenericCustomNamespace/1.0/",
    "http://ns.adobe.com/Graphs/1.0/",
    "http://ns.adobe.com/ImageReplacement/1.0/",
    "http://ns.adobe.com/SaveForWeb/1.0/",
    "http://ns.adobe.com/Variables/1.0/",
    "http://ns.adobe.com/XPath/1.0/",
    "http://purl.org/dc/elements/1.1/",
    "http://schemas.microsoft.com/visio/2003/SVGExtensions/",
    "http://sodipodi.sourceforge.net/DTD/sodipodi-0.dtd",
    "http://taptrix.com/vectorillustrator/svg_extensions",
    "http://www.bohemiancoding.com/sketch/ns",
    "http://www.figma.com/figma/ns",
    "http://www.inkscape.org/namespaces/inkscape",
    "http://www.serif.com/",
    "http://www.vector.evaxdesign.com/myNamespace",
    "http://www.w3.org/1999/02/22-rdf-syntax-ns#",
    "https://boxy-svg.com",
];

/// Removes editor namespace declarations along with the elements and
/// attributes using their prefixes.
#[derive(Debug, Clone, Default)]
pub struct RemoveEditorsData {
    /// Namespace URIs to treat as editor data on top of [`EDITOR_NAMESPACES`]
    pub extra_namespaces: Vec<String>,
}

impl Plugin for RemoveEditorsData {
    fn name(&self) -> &str {
        "removeEditorsNSData"
    }

    fn visitor<'a>(&'a self, _doc: &Document, _info: &PluginInfo<'_>) -> Option<Box<dyn Visitor + 'a>> {
        Some(Box::new(EditorsDataVisitor {
            params: self,
            prefixes: Vec::new(),
        }))
    }
}

struct EditorsDataVisitor<'a> {
    params: &'a RemoveEditorsData,
    /// Prefixes bound to editor namespaces on `<svg>` elements seen so far
    prefixes: Vec<String>,
}

impl EditorsDataVisitor<'_> {
    fn is_editor_namespace(&self, uri: &str) -> bool {
        EDITOR_NAMESPACES.contains(&uri) || self.params.extra_namespaces.iter().any(|ns| ns == uri)
    }

    fn is_editor_prefix(&self, prefix: Option<&str>) -> bool {
        prefix.is_some_and(|p| self.prefixes.iter().any(|known| known == p))
    }
}

impl Visitor for EditorsDataVisitor<'_> {
    fn enter_element(&mut self, doc: &mut Document, node: NodeId, _parent: NodeId) -> Result<(), PluginError> {
        let Some(element) = doc.element(node) else {
            return Ok(());
        };

        if element.is("svg") {
            let declared: Vec<(String, String)> = element
                .attributes()
                .iter()
                .filter_map(|a| {
                    let prefix = a.name.strip_prefix("xmlns:")?;
                    self.is_editor_namespace(&a.value)
                        .then(|| (a.name.clone(), prefix.to_owned()))
                })
                .collect();
            if let Some(element) = doc.element_mut(node) {
                for (attr, prefix) in declared {
                    element.remove_attr(&attr);
                    self.prefixes.push(prefix);
                }
            }
        }

        let Some(element) = doc.element(node) else {
            return Ok(());
        };
        if self.is_editor_prefix(element.prefix()) {
            doc.remove(node)?;
            return Ok(());
        }

        let prefixes = &self.prefixes;
        if let Some(element) = doc.element_mut(node) {
            element.retain_attrs(|a| !a.prefix().is_some_and(|p| prefixes.iter().any(|known| known == p)));
        }
        Ok(())
    }
}

const COLOR_ATTRS: &[&str] = &[
    "fill",
    "stroke",
    "stop-color",
    "flood-color",
    "lighting-color",
    "color",
];

/// Hex values with a shorter color keyword.
const SHORT_NAMES: &[(&str, &str)] = &[
    ("#f0ffff", "azure"),
    ("#f5f5dc", "beige"),
    ("#ffe4c4", "bisque"),
    ("#a52a2a", "brown"),
    ("#ff7f50", "coral"),
    ("#ffd700", "gold"),
    ("#808080", "gray"),
    ("#008000", "green"),
    ("#4b0082", "indigo"),
    ("#fffff0", "ivory"),
    ("#f0e68c", "khaki"),
    ("#faf0e6", "linen"),
    ("#800000", "maroon"),
    ("#000080", "navy"),
    ("#808000", "olive"),
    ("#ffa500", "orange"),
    ("#da70d6", "orchid"),
    ("#cd853f", "peru"),
    ("#ffc0cb", "pink"),
    ("#dda0dd", "plum"),
    ("#800080", "purple"),
    ("#ff0000", "red"),
    ("#fa8072", "salmon"),
    ("#a0522d", "sienna"),
    ("#c0c0c0", "silver"),
    ("#fffafa", "snow"),
    ("#d2b48c", "tan"),
    ("#008080", "teal"),
    ("#ff6347", "tomato"),
    ("#ee82ee", "violet"),
    ("#f5deb3", "wheat"),
];

/// Shortens color values in presentation attributes and `style`.
#[derive(Debug, Clone, Copy)]
pub struct ConvertColors {
    /// `#aabbcc` to `#abc`
    pub short_hex: bool,
    /// `#ff0000` to `red` when the keyword is shorter
    pub short_name: bool,
}

impl Default for ConvertColors {
    fn default() -> Self {
        Self {
            short_hex: true,
            short_name: true,
        }
    }
}

impl ConvertColors {
    fn convert(&self, color: &str) -> String {
        let color = color.trim();
        let Some(hex) = color.strip_prefix('#') else {
            return color.to_string();
        };
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return color.to_string();
        }

        let lower = hex.to_ascii_lowercase();
        let long = match lower.len() {
            3 => lower.chars().flat_map(|c| [c, c]).collect::<String>(),
            6 => lower,
            _ => return color.to_string(),
        };

        if self.short_name
            && let Some((_, name)) = SHORT_NAMES.iter().find(|(h, _)| h[1..] == long)
        {
            return (*name).to_string();
        }

        if self.short_hex {
            let b = long.as_bytes();
            if b[0] == b[1] && b[2] == b[3] && b[4] == b[5] {
                return format!("#{}{}{}", b[0] as char, b[2] as char, b[4] as char);
            }
            return format!("#{long}");
        }

        color.to_string()
    }

    fn convert_style(&self, style: &str) -> String {
        let mut result = String::new();
        for decl in style.split(';') {
            let decl = decl.trim();
            if decl.is_empty() {
                continue;
            }

            if !result.is_empty() {
                result.push(';');
            }

            if let Some((prop, value)) = decl.split_once(':') {
                let prop = prop.trim();
                let value = value.trim();
                result.push_str(prop);
                result.push(':');
                if COLOR_ATTRS.contains(&prop) {
                    result.push_str(&self.convert(value));
                } else {
                    result.push_str(value);
                }
            } else {
                result.push_str(decl);
            }
        }
        result
    }
}

impl Plugin for ConvertColors {
    fn name(&self) -> &str {
        "convertColors"
    }

    fn visitor<'a>(&'a self, _doc: &Document, _info: &PluginInfo<'_>) -> Option<Box<dyn Visitor + 'a>> {
        if !self.short_hex && !self.short_name {
            return None;
        }
        let params = *self;
        Some(Box::new(Hooks {
            element: NodeHooks::enter(move |doc, node, _| {
                let Some(element) = doc.element_mut(node) else {
                    return Ok(());
                };
                for (name, value) in element.attr_values_mut() {
                    if COLOR_ATTRS.contains(&name) {
                        *value = params.convert(value);
                    } else if name == "style" {
                        *value = params.convert_style(value);
                    }
                }
                Ok(())
            }),
            ..Hooks::default()
        }))
    }
}

/// Replaces attribute-less `<g>` elements with their children.
#[derive(Debug, Clone, Copy, Default)]
pub struct CollapseGroups;

impl Plugin for CollapseGroups {
    fn name(&self) -> &str {
        "collapseGroups"
    }

    fn visitor<'a>(&'a self, _doc: &Document, _info: &PluginInfo<'_>) -> Option<Box<dyn Visitor + 'a>> {
        Some(Box::new(Hooks {
            element: NodeHooks::leave(|doc, node, parent| {
                // the outermost element stays, as does anything under <switch>
                if parent == doc.root() || doc.element(parent).is_some_and(|p| p.is("switch")) {
                    return Ok(());
                }
                let collapsible = doc
                    .element(node)
                    .is_some_and(|e| e.is("g") && e.attributes().is_empty());
                if collapsible && doc.parent(node) == Some(parent) {
                    doc.replace_with_children(node)?;
                }
                Ok(())
            }),
            ..Hooks::default()
        }))
    }
}

const CONTAINER_ELEMENTS: &[&str] = &[
    "g", "defs", "symbol", "marker", "clipPath", "mask", "pattern",
];

/// Removes container elements with no children and no `id`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RemoveEmptyContainers;

impl Plugin for RemoveEmptyContainers {
    fn name(&self) -> &str {
        "removeEmptyContainers"
    }

    fn visitor<'a>(&'a self, _doc: &Document, _info: &PluginInfo<'_>) -> Option<Box<dyn Visitor + 'a>> {
        Some(Box::new(Hooks {
            element: NodeHooks::leave(|doc, node, _| {
                let empty = doc.children(node).is_empty()
                    && doc.element(node).is_some_and(|e| {
                        CONTAINER_ELEMENTS.contains(&e.name.as_str()) && !e.has_attr("id")
                    });
                if empty && doc.is_attached(node) {
                    doc.remove(node)?;
                }
                Ok(())
            }),
            ..Hooks::default()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimize::invoke_plugins;
    use crate::parse::parse_svg;
    use crate::serialize::{SerializeOptions, serialize};
    use crate::visitor::Context;

    fn apply(svg: &str, plugins: Vec<Box<dyn Plugin>>) -> String {
        let mut doc = parse_svg(svg).unwrap();
        let context = Context::new();
        let info = PluginInfo {
            path: None,
            multipass_count: 0,
            context: &context,
        };
        invoke_plugins(&mut doc, &plugins, &info).unwrap();
        serialize(&doc, &SerializeOptions::default())
    }

    #[test]
    fn test_remove_prolog() {
        let svg = r#"<?xml version="1.0"?><!DOCTYPE svg><?xml-stylesheet href="a.css"?><svg/>"#;
        assert_eq!(
            apply(svg, vec![Box::new(RemoveDoctype), Box::new(RemoveXmlProcInst)]),
            r#"<?xml-stylesheet href="a.css"?><svg/>"#
        );
    }

    #[test]
    fn test_remove_comments() {
        let svg = "<svg><!-- drop --><!--! keep --><g/></svg>";
        assert_eq!(
            apply(svg, vec![Box::new(RemoveComments::default())]),
            "<svg><!--! keep --><g/></svg>"
        );
        assert_eq!(
            apply(svg, vec![Box::new(RemoveComments { preserve_legal: false })]),
            "<svg><g/></svg>"
        );
    }

    #[test]
    fn test_remove_metadata() {
        let svg = "<svg><metadata><rdf:RDF/></metadata><rect/></svg>";
        assert_eq!(apply(svg, vec![Box::new(RemoveMetadata)]), "<svg><rect/></svg>");
    }

    #[test]
    fn test_remove_editors_data() {
        let svg = r##"<svg xmlns="http://www.w3.org/2000/svg" xmlns:inkscape="http://www.inkscape.org/namespaces/inkscape" xmlns:sodipodi="http://sodipodi.sourceforge.net/DTD/sodipodi-0.dtd" xmlns:xlink="http://www.w3.org/1999/xlink" inkscape:version="1.0"><sodipodi:namedview/><g inkscape:label="Layer" xlink:href="#a"/></svg>"##;
        assert_eq!(
            apply(svg, vec![Box::new(RemoveEditorsData::default())]),
            r##"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink"><g xlink:href="#a"/></svg>"##
        );

        let svg = r#"<svg xmlns:my="urn:my-editor"><my:thing/></svg>"#;
        let plugin = RemoveEditorsData {
            extra_namespaces: vec!["urn:my-editor".into()],
        };
        assert_eq!(apply(svg, vec![Box::new(plugin)]), "<svg/>");
    }

    #[test]
    fn test_convert_colors() {
        let colors = ConvertColors::default();
        assert_eq!(colors.convert("#ffffff"), "#fff");
        assert_eq!(colors.convert("#FF0000"), "red");
        assert_eq!(colors.convert("#aabbcc"), "#abc");
        assert_eq!(colors.convert("#abcdef"), "#abcdef");
        assert_eq!(colors.convert("url(#grad)"), "url(#grad)");

        let hex_only = ConvertColors {
            short_name: false,
            ..colors
        };
        assert_eq!(hex_only.convert("#ff0000"), "#f00");

        let svg = r##"<svg><rect fill="#ff0000" stroke="#AABBCC" style="fill: #ffffff; opacity: 0.5"/></svg>"##;
        assert_eq!(
            apply(svg, vec![Box::new(colors)]),
            r##"<svg><rect fill="red" stroke="#abc" style="fill:#fff;opacity:0.5"/></svg>"##
        );
    }

    #[test]
    fn test_convert_colors_can_be_switched_off() {
        let off = ConvertColors {
            short_hex: false,
            short_name: false,
        };
        let context = Context::new();
        let info = PluginInfo {
            path: None,
            multipass_count: 0,
            context: &context,
        };
        assert!(off.visitor(&Document::new(), &info).is_none());
    }

    #[test]
    fn test_collapse_groups() {
        let svg = r#"<svg><g><g><rect/></g><circle/></g><g id="keep"><path/></g></svg>"#;
        assert_eq!(
            apply(svg, vec![Box::new(CollapseGroups)]),
            r#"<svg><rect/><circle/><g id="keep"><path/></g></svg>"#
        );
    }

    #[test]
    fn test_remove_empty_containers() {
        let svg = r#"<svg><g><defs/></g><g id="anchor"/><rect/></svg>"#;
        assert_eq!(
            apply(svg, vec![Box::new(RemoveEmptyContainers)]),
            r#"<svg><g id="anchor"/><rect/></svg>"#
        );
    }
}
