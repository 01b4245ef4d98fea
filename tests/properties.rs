use std::collections::BTreeMap;

use proptest::{collection::btree_map, collection::vec, prelude::*};
use svag::{
    Document, MAX_PASSES, NodeId, NodeKind, Options, SerializeOptions, is_text_element, optimize, parse_svg,
    serialize,
};

/// A generated SVG fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Node {
    Element {
        name: String,
        attrs: BTreeMap<String, String>,
        children: Vec<Node>,
    },
    Text(String),
    Comment(String),
}

fn tag_name() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["g", "rect", "circle", "defs", "path", "text", "tspan"]).prop_map(str::to_owned)
}

fn attrs() -> impl Strategy<Value = BTreeMap<String, String>> {
    btree_map("[a-z]{1,3}", "[a-z0-9 #&<>\"']{0,8}", 0..3)
}

fn node() -> impl Strategy<Value = Node> {
    let leaf = prop_oneof![
        "[a-z &<>']{1,6}".prop_map(Node::Text),
        "[a-z ]{0,6}".prop_map(Node::Comment),
        (tag_name(), attrs()).prop_map(|(name, attrs)| Node::Element {
            name,
            attrs,
            children: Vec::new(),
        }),
    ];
    leaf.prop_recursive(4, 32, 4, |inner| {
        (tag_name(), attrs(), vec(inner, 0..4)).prop_map(|(name, attrs, children)| Node::Element {
            name,
            attrs,
            children,
        })
    })
}

/// Markup for an `<svg>` root holding the generated children, and the root
/// as a [`Node`].
fn document() -> impl Strategy<Value = (String, Node)> {
    vec(node(), 0..4).prop_map(|children| {
        let root = Node::Element {
            name: "svg".to_owned(),
            attrs: BTreeMap::new(),
            children,
        };
        let mut out = String::new();
        render(&root, &mut out);
        (out, root)
    })
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn render(node: &Node, out: &mut String) {
    match node {
        Node::Element { name, attrs, children } => {
            out.push('<');
            out.push_str(name);
            for (key, value) in attrs {
                out.push_str(&format!(" {key}=\"{}\"", escape(value)));
            }
            out.push('>');
            for child in children {
                render(child, out);
            }
            out.push_str(&format!("</{name}>"));
        }
        Node::Text(text) => out.push_str(&escape(text)),
        Node::Comment(comment) => out.push_str(&format!("<!--{comment}-->")),
    }
}

/// What the parser should keep of `node`: adjacent text merged into one
/// run, and outside text elements trimmed with empty runs dropped.
fn expected(node: &Node) -> Node {
    let Node::Element { name, attrs, children } = node else {
        return node.clone();
    };

    let mut merged: Vec<Node> = Vec::new();
    for child in children {
        match (merged.last_mut(), child) {
            (Some(Node::Text(run)), Node::Text(text)) => run.push_str(text),
            _ => merged.push(expected(child)),
        }
    }

    let preserve = is_text_element(name);
    let children = merged
        .into_iter()
        .filter_map(|child| match child {
            Node::Text(text) if !preserve => {
                let trimmed = text.trim();
                (!trimmed.is_empty()).then(|| Node::Text(trimmed.to_owned()))
            }
            other => Some(other),
        })
        .collect();

    Node::Element {
        name: name.clone(),
        attrs: attrs.clone(),
        children,
    }
}

/// Rebuild the generated model from a parsed document.
fn rebuild(doc: &Document, id: NodeId) -> Node {
    match doc.kind(id).unwrap() {
        NodeKind::Element => {
            let element = doc.element(id).unwrap();
            Node::Element {
                name: element.name.clone(),
                attrs: element
                    .attributes()
                    .iter()
                    .map(|a| (a.name.clone(), a.value.clone()))
                    .collect(),
                children: doc.children(id).iter().map(|&child| rebuild(doc, child)).collect(),
            }
        }
        NodeKind::Text => Node::Text(doc.value(id).unwrap().to_owned()),
        NodeKind::Comment => Node::Comment(doc.value(id).unwrap().to_owned()),
        other => panic!("unexpected {other:?} node"),
    }
}

fn parsed_root(svg: &str) -> Node {
    let doc = parse_svg(svg).unwrap();
    let [root] = doc.children(doc.root()) else {
        panic!("expected a single root element in {svg}");
    };
    rebuild(&doc, *root)
}

fn count_elements(node: &Node) -> usize {
    match node {
        Node::Element { children, .. } => 1 + children.iter().map(count_elements).sum::<usize>(),
        _ => 0,
    }
}

fn no_plugins() -> Options {
    Options {
        plugins: Vec::new(),
        ..Options::default()
    }
}

proptest! {
    #[test]
    fn test_parse_matches_generated_tree((svg, root) in document()) {
        prop_assert_eq!(parsed_root(&svg), expected(&root));
    }

    #[test]
    fn test_serialize_then_parse_keeps_tree((svg, root) in document()) {
        let once = serialize(&parse_svg(&svg).unwrap(), &SerializeOptions::default());
        prop_assert_eq!(parsed_root(&once), expected(&root));
    }

    #[test]
    fn test_round_trip_is_stable((svg, _) in document()) {
        let options = SerializeOptions::default();
        let once = serialize(&parse_svg(&svg).unwrap(), &options);
        let twice = serialize(&parse_svg(&once).unwrap(), &options);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn test_parse_keeps_every_element((svg, root) in document()) {
        let doc = parse_svg(&svg).unwrap();
        let parsed = doc
            .descendants(doc.root())
            .filter(|&id| doc.element(id).is_some())
            .count();
        prop_assert_eq!(parsed, count_elements(&root));
    }

    #[test]
    fn test_output_is_deterministic((svg, _) in document()) {
        let options = Options::default();
        let first = optimize(&svg, &options).unwrap();
        let second = optimize(&svg, &options).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn test_multipass_is_bounded((svg, _) in document()) {
        let options = Options {
            multipass: true,
            ..Options::default()
        };
        let output = optimize(&svg, &options).unwrap();
        prop_assert!((1..=MAX_PASSES).contains(&output.passes));
    }

    #[test]
    fn test_no_plugins_changes_nothing_structural((svg, _) in document()) {
        let direct = serialize(&parse_svg(&svg).unwrap(), &SerializeOptions::default());
        let output = optimize(&svg, &no_plugins()).unwrap();
        prop_assert_eq!(output.data, direct);
        prop_assert_eq!(output.passes, 1);
    }
}
