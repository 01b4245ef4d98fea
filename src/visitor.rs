//! Visitor and plugin contracts.
//!
//! A [`Plugin`] hands the engine a fresh [`Visitor`] at the start of every
//! pass. Visitors are either structs implementing the trait directly or a
//! [`Hooks`] table of closures built with [`plugin`].

use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::ast::{Document, NodeId};
use crate::error::PluginError;

/// Per-node callbacks. Every hook defaults to doing nothing.
///
/// Node hooks receive the node and the parent it was reached through. Root
/// hooks run once per pass, before and after everything else.
#[allow(unused_variables)]
pub trait Visitor {
    fn enter_root(&mut self, doc: &mut Document, root: NodeId) -> Result<(), PluginError> {
        Ok(())
    }
    fn leave_root(&mut self, doc: &mut Document, root: NodeId) -> Result<(), PluginError> {
        Ok(())
    }

    fn enter_element(&mut self, doc: &mut Document, node: NodeId, parent: NodeId) -> Result<(), PluginError> {
        Ok(())
    }
    fn leave_element(&mut self, doc: &mut Document, node: NodeId, parent: NodeId) -> Result<(), PluginError> {
        Ok(())
    }

    fn enter_text(&mut self, doc: &mut Document, node: NodeId, parent: NodeId) -> Result<(), PluginError> {
        Ok(())
    }
    fn leave_text(&mut self, doc: &mut Document, node: NodeId, parent: NodeId) -> Result<(), PluginError> {
        Ok(())
    }

    fn enter_cdata(&mut self, doc: &mut Document, node: NodeId, parent: NodeId) -> Result<(), PluginError> {
        Ok(())
    }
    fn leave_cdata(&mut self, doc: &mut Document, node: NodeId, parent: NodeId) -> Result<(), PluginError> {
        Ok(())
    }

    fn enter_comment(&mut self, doc: &mut Document, node: NodeId, parent: NodeId) -> Result<(), PluginError> {
        Ok(())
    }
    fn leave_comment(&mut self, doc: &mut Document, node: NodeId, parent: NodeId) -> Result<(), PluginError> {
        Ok(())
    }

    fn enter_instruction(&mut self, doc: &mut Document, node: NodeId, parent: NodeId) -> Result<(), PluginError> {
        Ok(())
    }
    fn leave_instruction(&mut self, doc: &mut Document, node: NodeId, parent: NodeId) -> Result<(), PluginError> {
        Ok(())
    }

    fn enter_doctype(&mut self, doc: &mut Document, node: NodeId, parent: NodeId) -> Result<(), PluginError> {
        Ok(())
    }
    fn leave_doctype(&mut self, doc: &mut Document, node: NodeId, parent: NodeId) -> Result<(), PluginError> {
        Ok(())
    }
}

pub type RootHook<'a> = Box<dyn FnMut(&mut Document, NodeId) -> Result<(), PluginError> + 'a>;
pub type NodeHook<'a> = Box<dyn FnMut(&mut Document, NodeId, NodeId) -> Result<(), PluginError> + 'a>;

/// Optional enter/leave pair for the root.
#[derive(Default)]
pub struct RootHooks<'a> {
    pub enter: Option<RootHook<'a>>,
    pub leave: Option<RootHook<'a>>,
}

impl<'a> RootHooks<'a> {
    pub fn enter(f: impl FnMut(&mut Document, NodeId) -> Result<(), PluginError> + 'a) -> Self {
        Self {
            enter: Some(Box::new(f)),
            leave: None,
        }
    }

    pub fn leave(f: impl FnMut(&mut Document, NodeId) -> Result<(), PluginError> + 'a) -> Self {
        Self {
            enter: None,
            leave: Some(Box::new(f)),
        }
    }

    pub fn new(
        enter: impl FnMut(&mut Document, NodeId) -> Result<(), PluginError> + 'a,
        leave: impl FnMut(&mut Document, NodeId) -> Result<(), PluginError> + 'a,
    ) -> Self {
        Self {
            enter: Some(Box::new(enter)),
            leave: Some(Box::new(leave)),
        }
    }
}

/// Optional enter/leave pair for one node kind.
#[derive(Default)]
pub struct NodeHooks<'a> {
    pub enter: Option<NodeHook<'a>>,
    pub leave: Option<NodeHook<'a>>,
}

impl<'a> NodeHooks<'a> {
    pub fn enter(f: impl FnMut(&mut Document, NodeId, NodeId) -> Result<(), PluginError> + 'a) -> Self {
        Self {
            enter: Some(Box::new(f)),
            leave: None,
        }
    }

    pub fn leave(f: impl FnMut(&mut Document, NodeId, NodeId) -> Result<(), PluginError> + 'a) -> Self {
        Self {
            enter: None,
            leave: Some(Box::new(f)),
        }
    }

    pub fn new(
        enter: impl FnMut(&mut Document, NodeId, NodeId) -> Result<(), PluginError> + 'a,
        leave: impl FnMut(&mut Document, NodeId, NodeId) -> Result<(), PluginError> + 'a,
    ) -> Self {
        Self {
            enter: Some(Box::new(enter)),
            leave: Some(Box::new(leave)),
        }
    }
}

/// Closure table with one optional hook pair per node kind.
#[derive(Default)]
pub struct Hooks<'a> {
    pub root: RootHooks<'a>,
    pub element: NodeHooks<'a>,
    pub text: NodeHooks<'a>,
    pub cdata: NodeHooks<'a>,
    pub comment: NodeHooks<'a>,
    pub instruction: NodeHooks<'a>,
    pub doctype: NodeHooks<'a>,
}

fn call_root(hook: &mut Option<RootHook<'_>>, doc: &mut Document, root: NodeId) -> Result<(), PluginError> {
    match hook {
        Some(f) => f(doc, root),
        None => Ok(()),
    }
}

fn call_node(
    hook: &mut Option<NodeHook<'_>>,
    doc: &mut Document,
    node: NodeId,
    parent: NodeId,
) -> Result<(), PluginError> {
    match hook {
        Some(f) => f(doc, node, parent),
        None => Ok(()),
    }
}

impl Visitor for Hooks<'_> {
    fn enter_root(&mut self, doc: &mut Document, root: NodeId) -> Result<(), PluginError> {
        call_root(&mut self.root.enter, doc, root)
    }
    fn leave_root(&mut self, doc: &mut Document, root: NodeId) -> Result<(), PluginError> {
        call_root(&mut self.root.leave, doc, root)
    }

    fn enter_element(&mut self, doc: &mut Document, node: NodeId, parent: NodeId) -> Result<(), PluginError> {
        call_node(&mut self.element.enter, doc, node, parent)
    }
    fn leave_element(&mut self, doc: &mut Document, node: NodeId, parent: NodeId) -> Result<(), PluginError> {
        call_node(&mut self.element.leave, doc, node, parent)
    }

    fn enter_text(&mut self, doc: &mut Document, node: NodeId, parent: NodeId) -> Result<(), PluginError> {
        call_node(&mut self.text.enter, doc, node, parent)
    }
    fn leave_text(&mut self, doc: &mut Document, node: NodeId, parent: NodeId) -> Result<(), PluginError> {
        call_node(&mut self.text.leave, doc, node, parent)
    }

    fn enter_cdata(&mut self, doc: &mut Document, node: NodeId, parent: NodeId) -> Result<(), PluginError> {
        call_node(&mut self.cdata.enter, doc, node, parent)
    }
    fn leave_cdata(&mut self, doc: &mut Document, node: NodeId, parent: NodeId) -> Result<(), PluginError> {
        call_node(&mut self.cdata.leave, doc, node, parent)
    }

    fn enter_comment(&mut self, doc: &mut Document, node: NodeId, parent: NodeId) -> Result<(), PluginError> {
        call_node(&mut self.comment.enter, doc, node, parent)
    }
    fn leave_comment(&mut self, doc: &mut Document, node: NodeId, parent: NodeId) -> Result<(), PluginError> {
        call_node(&mut self.comment.leave, doc, node, parent)
    }

    fn enter_instruction(&mut self, doc: &mut Document, node: NodeId, parent: NodeId) -> Result<(), PluginError> {
        call_node(&mut self.instruction.enter, doc, node, parent)
    }
    fn leave_instruction(&mut self, doc: &mut Document, node: NodeId, parent: NodeId) -> Result<(), PluginError> {
        call_node(&mut self.instruction.leave, doc, node, parent)
    }

    fn enter_doctype(&mut self, doc: &mut Document, node: NodeId, parent: NodeId) -> Result<(), PluginError> {
        call_node(&mut self.doctype.enter, doc, node, parent)
    }
    fn leave_doctype(&mut self, doc: &mut Document, node: NodeId, parent: NodeId) -> Result<(), PluginError> {
        call_node(&mut self.doctype.leave, doc, node, parent)
    }
}

/// State shared by all passes of one optimization call.
///
/// Slots are keyed by type; each type gets one lazily created value.
#[derive(Debug, Default)]
pub struct Context {
    slots: RefCell<HashMap<TypeId, Rc<dyn Any>>>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// The slot for `T`, created with `T::default()` on first use.
    pub fn state<T: Default + 'static>(&self) -> Rc<RefCell<T>> {
        let mut slots = self.slots.borrow_mut();
        let slot = slots
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Rc::new(RefCell::new(T::default())) as Rc<dyn Any>);
        match Rc::clone(slot).downcast::<RefCell<T>>() {
            Ok(state) => state,
            Err(_) => {
                let state = Rc::new(RefCell::new(T::default()));
                *slot = Rc::clone(&state) as Rc<dyn Any>;
                state
            }
        }
    }
}

/// What a plugin knows about the pass it is being instantiated for.
#[derive(Debug, Clone, Copy)]
pub struct PluginInfo<'a> {
    pub path: Option<&'a str>,
    /// Zero-based pass index
    pub multipass_count: usize,
    pub context: &'a Context,
}

/// A named visitor factory. Parameters live on the implementing type.
pub trait Plugin: Send + Sync {
    fn name(&self) -> &str;

    /// Called once per pass. `None` sits the pass out.
    fn visitor<'a>(&'a self, doc: &Document, info: &PluginInfo<'_>) -> Option<Box<dyn Visitor + 'a>>;
}

/// Plugin backed by a closure returning [`Hooks`].
pub struct FnPlugin<F> {
    name: String,
    factory: F,
}

/// Build a plugin from a name and a hook factory.
pub fn plugin<F>(name: impl Into<String>, factory: F) -> FnPlugin<F>
where
    F: Fn(&Document, &PluginInfo<'_>) -> Option<Hooks<'static>> + Send + Sync,
{
    FnPlugin {
        name: name.into(),
        factory,
    }
}

impl<F> Plugin for FnPlugin<F>
where
    F: Fn(&Document, &PluginInfo<'_>) -> Option<Hooks<'static>> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn visitor<'a>(&'a self, doc: &Document, info: &PluginInfo<'_>) -> Option<Box<dyn Visitor + 'a>> {
        let hooks = (self.factory)(doc, info)?;
        Some(Box::new(hooks))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Element;

    fn info(context: &Context) -> PluginInfo<'_> {
        PluginInfo {
            path: None,
            multipass_count: 0,
            context,
        }
    }

    #[test]
    fn test_hooks_dispatch_by_kind() {
        let mut doc = Document::new();
        let root = doc.root();
        let svg = doc.create_element(Element::new("svg"));
        doc.append(root, svg).unwrap();

        let mut hooks = Hooks {
            element: NodeHooks::enter(|doc, node, _| {
                doc.element_mut(node).unwrap().set_attr("seen", "yes");
                Ok(())
            }),
            ..Hooks::default()
        };

        hooks.enter_element(&mut doc, svg, root).unwrap();
        // no text hook registered
        hooks.enter_text(&mut doc, svg, root).unwrap();
        hooks.leave_element(&mut doc, svg, root).unwrap();

        assert_eq!(doc.element(svg).unwrap().get_attr("seen"), Some("yes"));
    }

    #[test]
    fn test_hook_errors_surface() {
        let mut doc = Document::new();
        let root = doc.root();
        let mut hooks = Hooks {
            root: RootHooks::leave(|_, _| Err(PluginError::msg("nope"))),
            ..Hooks::default()
        };
        hooks.enter_root(&mut doc, root).unwrap();
        let err = hooks.leave_root(&mut doc, root).unwrap_err();
        assert_eq!(err.to_string(), "nope");
    }

    #[test]
    fn test_context_state_is_shared_per_type() {
        let context = Context::new();
        context.state::<Vec<u32>>().borrow_mut().push(1);
        context.state::<Vec<u32>>().borrow_mut().push(2);
        *context.state::<usize>().borrow_mut() += 5;

        assert_eq!(*context.state::<Vec<u32>>().borrow(), [1, 2]);
        assert_eq!(*context.state::<usize>().borrow(), 5);
        assert_eq!(*Context::new().state::<usize>().borrow(), 0);
    }

    #[test]
    fn test_fn_plugin_can_opt_out() {
        let context = Context::new();
        let doc = Document::new();
        let lazy = plugin("lazy", |_, info| (info.multipass_count > 0).then(Hooks::default));

        assert_eq!(lazy.name(), "lazy");
        assert!(lazy.visitor(&doc, &info(&context)).is_none());

        let later = PluginInfo {
            multipass_count: 1,
            ..info(&context)
        };
        assert!(lazy.visitor(&doc, &later).is_some());
    }
}
