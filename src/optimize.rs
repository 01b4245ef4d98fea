//! The plugin engine: one depth-first pass over the tree, repeated until the
//! output settles when multipass is on.

use tracing::{debug, trace};

use crate::Options;
use crate::ast::*;
use crate::error::{PluginError, SvagError};
use crate::serialize::serialize;
use crate::visitor::{Context, Plugin, PluginInfo, Visitor};

/// Hard cap on multipass runs.
pub const MAX_PASSES: usize = 10;

/// Run the configured plugins over `doc`, returning the number of passes.
pub fn optimize_document(doc: &mut Document, options: &Options) -> Result<usize, SvagError> {
    let context = Context::new();
    let mut previous: Option<String> = None;

    for pass in 0..MAX_PASSES {
        let info = PluginInfo {
            path: options.path.as_deref(),
            multipass_count: pass,
            context: &context,
        };
        invoke_plugins(doc, &options.plugins, &info)?;

        if !options.multipass {
            return Ok(1);
        }

        let current = serialize(doc, &options.serialize);
        if previous.as_deref() == Some(current.as_str()) {
            debug!(passes = pass + 1, "output reached a fixed point");
            return Ok(pass + 1);
        }
        previous = Some(current);
    }

    debug!(passes = MAX_PASSES, "stopping at the pass limit");
    Ok(MAX_PASSES)
}

/// A plugin that produced a visitor for the current pass.
struct Active<'p> {
    name: &'p str,
    visitor: Box<dyn Visitor + 'p>,
}

fn failed(plugin: &str, source: PluginError) -> SvagError {
    SvagError::Plugin {
        plugin: plugin.to_owned(),
        source,
    }
}

/// Run a single pass of `plugins` over `doc`.
pub fn invoke_plugins(
    doc: &mut Document,
    plugins: &[Box<dyn Plugin>],
    info: &PluginInfo<'_>,
) -> Result<(), SvagError> {
    let mut active = Vec::with_capacity(plugins.len());
    for plugin in plugins {
        match plugin.visitor(doc, info) {
            Some(visitor) => active.push(Active {
                name: plugin.name(),
                visitor,
            }),
            None => trace!(plugin = plugin.name(), pass = info.multipass_count, "plugin inactive"),
        }
    }
    debug!(pass = info.multipass_count, active = active.len(), "running pass");

    let root = doc.root();
    for a in active.iter_mut() {
        a.visitor.enter_root(doc, root).map_err(|e| failed(a.name, e))?;
    }
    visit_children(doc, root, &mut active)?;
    for a in active.iter_mut().rev() {
        a.visitor.leave_root(doc, root).map_err(|e| failed(a.name, e))?;
    }
    Ok(())
}

fn visit_children(doc: &mut Document, parent: NodeId, active: &mut [Active<'_>]) -> Result<(), SvagError> {
    let snapshot = doc.children(parent).to_vec();
    for node in snapshot {
        // Moved or removed by an earlier hook.
        if doc.parent(node) != Some(parent) {
            continue;
        }
        visit(doc, node, parent, active)?;
    }
    Ok(())
}

fn visit(doc: &mut Document, node: NodeId, parent: NodeId, active: &mut [Active<'_>]) -> Result<(), SvagError> {
    let Some(kind) = doc.kind(node) else {
        return Ok(());
    };

    for a in active.iter_mut() {
        enter(a.visitor.as_mut(), kind, doc, node, parent).map_err(|e| failed(a.name, e))?;
    }

    if kind == NodeKind::Element && doc.parent(node) == Some(parent) {
        visit_children(doc, node, active)?;
    }

    for a in active.iter_mut().rev() {
        leave(a.visitor.as_mut(), kind, doc, node, parent).map_err(|e| failed(a.name, e))?;
    }
    Ok(())
}

fn enter(
    visitor: &mut dyn Visitor,
    kind: NodeKind,
    doc: &mut Document,
    node: NodeId,
    parent: NodeId,
) -> Result<(), PluginError> {
    match kind {
        NodeKind::Root => Ok(()),
        NodeKind::Element => visitor.enter_element(doc, node, parent),
        NodeKind::Text => visitor.enter_text(doc, node, parent),
        NodeKind::Cdata => visitor.enter_cdata(doc, node, parent),
        NodeKind::Comment => visitor.enter_comment(doc, node, parent),
        NodeKind::Instruction => visitor.enter_instruction(doc, node, parent),
        NodeKind::Doctype => visitor.enter_doctype(doc, node, parent),
    }
}

fn leave(
    visitor: &mut dyn Visitor,
    kind: NodeKind,
    doc: &mut Document,
    node: NodeId,
    parent: NodeId,
) -> Result<(), PluginError> {
    match kind {
        NodeKind::Root => Ok(()),
        NodeKind::Element => visitor.leave_element(doc, node, parent),
        NodeKind::Text => visitor.leave_text(doc, node, parent),
        NodeKind::Cdata => visitor.leave_cdata(doc, node, parent),
        NodeKind::Comment => visitor.leave_comment(doc, node, parent),
        NodeKind::Instruction => visitor.leave_instruction(doc, node, parent),
        NodeKind::Doctype => visitor.leave_doctype(doc, node, parent),
    }
}
