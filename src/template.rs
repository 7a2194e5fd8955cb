//! Templates: reusable element subtrees with their variables and
//! sub-template slots, and the scrub algorithm that turns a live template into
//! a value-free stamp.

use indexmap::IndexMap;
use log::trace;
use serde::Deserialize;

use crate::config::Selectors;
use crate::dom::{Document, NodeId, NodeKind};
use crate::identity::{IdentityGenerator, DEFAULT_IDENTITY_LENGTH};
use crate::variable::{is_allowed_attribute, Variable};

/// Reserved value key carrying event bindings.
pub const EVENTS_KEY: &str = "events";

/// Handle to a template held by a [`crate::registry::Registry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TemplateId(pub(crate) usize);

impl TemplateId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// One `{selector, event, handler}` triple from an `events` value.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EventBinding {
    pub selector: String,
    #[serde(alias = "eventName")]
    pub event: String,
    /// Name of a handler registered on the registry
    pub handler: String,
}

#[derive(Debug, Clone)]
pub struct Template {
    pub(crate) id: TemplateId,
    pub(crate) name: String,
    pub(crate) root: NodeId,
    pub(crate) identity: String,
    pub(crate) variables: Vec<Variable>,
    pub(crate) slots: IndexMap<String, TemplateId>,
    pub(crate) bindings: Vec<EventBinding>,
}

impl Template {
    pub fn id(&self) -> TemplateId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Variables owned directly by this template, in document order.
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().find(|v| v.name() == name)
    }

    pub fn has_sub_template(&self, name: &str) -> bool {
        self.slots.contains_key(name)
    }

    /// The instance currently occupying the slot `name`.
    pub fn sub_template(&self, name: &str) -> Option<TemplateId> {
        self.slots.get(name).copied()
    }

    pub fn slot_names(&self) -> impl Iterator<Item = &str> {
        self.slots.keys().map(String::as_str)
    }

    pub fn bindings(&self) -> &[EventBinding] {
        &self.bindings
    }
}

/// Markers found directly under a template root.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct Markers {
    pub variables: Vec<NodeId>,
    pub nested: Vec<NodeId>,
}

/// Walks the subtree below `root` in document order. Nested template markers
/// are collected but not entered, so their variables stay with them.
pub(crate) fn collect_markers(document: &Document, root: NodeId, selectors: &Selectors) -> Markers {
    let mut markers = Markers::default();
    let mut stack: Vec<NodeId> = document.children(root).iter().rev().copied().collect();
    while let Some(node) = stack.pop() {
        if !document.is_element(node) {
            continue;
        }
        if selectors.template_root.matches(document, node) {
            markers.nested.push(node);
            continue;
        }
        if selectors.variable.matches(document, node) {
            markers.variables.push(node);
        }
        stack.extend(document.children(node).iter().rev().copied());
    }
    markers
}

#[derive(Clone, Copy)]
enum CopyMode<'s> {
    Scrub(&'s Selectors),
    Duplicate,
}

/// Produces a detached, value-free copy of the subtree at `node`.
///
/// Only allow-listed attributes (and those the marker selectors look at) are
/// carried over, every `id` is replaced by a fresh identity, variable markers
/// lose their content and the copied root is hidden. The source is untouched.
pub fn scrub(
    document: &mut Document,
    node: NodeId,
    selectors: &Selectors,
    identities: &mut IdentityGenerator,
) -> NodeId {
    let copy = copy_subtree(document, node, CopyMode::Scrub(selectors), identities);
    if document.is_element(copy) {
        document.set_style_property(copy, "display", Some("none"));
    }
    trace!("Scrubbed node {} into {}", node.index(), copy.index());
    copy
}

/// Deep copy of `node` where every `id` is replaced by a fresh identity.
pub fn duplicate(
    document: &mut Document,
    node: NodeId,
    identities: &mut IdentityGenerator,
) -> NodeId {
    copy_subtree(document, node, CopyMode::Duplicate, identities)
}

fn copy_subtree(
    document: &mut Document,
    node: NodeId,
    mode: CopyMode<'_>,
    identities: &mut IdentityGenerator,
) -> NodeId {
    match document.kind(node).clone() {
        NodeKind::Element { tag, attrs } => {
            let copy = document.create_element(&tag);
            for (name, value) in &attrs {
                let keep = match mode {
                    CopyMode::Scrub(selectors) => {
                        is_allowed_attribute(name) || selectors.references_attribute(name)
                    }
                    CopyMode::Duplicate => true,
                };
                if !keep {
                    continue;
                }
                if name == "id" {
                    let fresh = identities.generate(DEFAULT_IDENTITY_LENGTH);
                    document.set_attr(copy, name, &fresh);
                } else {
                    document.set_attr(copy, name, value);
                }
            }
            let emptied = match mode {
                CopyMode::Scrub(selectors) => selectors.variable.matches(document, node),
                CopyMode::Duplicate => false,
            };
            if !emptied {
                for child in document.children(node).to_vec() {
                    let child_copy = copy_subtree(document, child, mode, identities);
                    document.append_child(copy, child_copy);
                }
            }
            copy
        }
        NodeKind::Text(text) => document.create_text(&text),
        NodeKind::Comment(text) => document.create_comment(&text),
        NodeKind::Doctype(name) => document.create_doctype(&name),
        // never a child of anything
        NodeKind::Document => document.create_text(""),
    }
}
