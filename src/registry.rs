//! The template registry.
//!
//! A [`Registry`] owns the document it was built from. Construction scans the
//! document for template markers, materializes nested templates in place and
//! remembers one definition per name. Afterwards [`Registry::get_new`] stamps
//! out fresh, populated copies from a cached scrubbed version of a definition.
//!
//! Every instance adds nodes to the document arena and a template entry to the
//! registry. [`Registry::remove`] drops the entries of an instance and the
//! instances inside it; the arena itself never shrinks, so removed nodes stay
//! allocated (detached) for the life of the registry.

use indexmap::IndexMap;
use log::{debug, trace, warn};
use serde_json::Value;
use std::collections::HashMap;
use std::rc::Rc;

use crate::config::{Config, Selectors};
use crate::dom::{Document, NodeId};
use crate::error::{Error, MarkerKind, Result};
use crate::identity::{IdentityGenerator, DEFAULT_IDENTITY_LENGTH};
use crate::parser::parse_document;
use crate::selector::Selector;
use crate::template::{
    collect_markers, duplicate, scrub, EventBinding, Template, TemplateId, EVENTS_KEY,
};
use crate::variable::{Variable, VariableMut, VariableValue};

/// Callback bound through an `events` value.
pub type Handler = Rc<dyn Fn(&mut Registry, &Event) -> Result<()>>;

/// What a handler is told about the event it runs for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub name: String,
    pub target: NodeId,
    /// Template whose binding matched
    pub template: TemplateId,
    /// Selector of the matching binding
    pub selector: String,
}

pub struct Registry {
    document: Document,
    config: Config,
    selectors: Selectors,
    identities: IdentityGenerator,
    /// Every template wrapper ever built, indexed by `TemplateId`; removed
    /// ones leave an empty entry so handles are never reused
    templates: Vec<Option<Template>>,
    /// One definition per name, in discovery order
    definitions: IndexMap<String, TemplateId>,
    by_identity: HashMap<String, TemplateId>,
    /// Scrubbed, detached stamps per template name
    raw_cache: HashMap<String, NodeId>,
    handlers: HashMap<String, Handler>,
    /// Names of templates whose construction is in progress
    constructing: Vec<String>,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("config", &self.config)
            .field("definitions", &self.definitions)
            .field("templates", &self.templates.iter().flatten().count())
            .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl Registry {
    /// Scans `document` and registers every template marker it finds.
    ///
    /// # Errors
    /// * `Error::Selector` if a configured selector cannot be parsed
    /// * `Error::MissingName` if any template or variable marker has no name;
    ///   the whole scan is abandoned
    /// * `Error::CircularTemplate` if a template contains itself
    pub fn new(document: Document, config: Config) -> Result<Self> {
        let selectors = config.selectors()?;
        let mut identities = IdentityGenerator::new();
        for identity in document.identifiers() {
            identities.reserve(&identity);
        }

        let mut registry = Self {
            document,
            config,
            selectors,
            identities,
            templates: Vec::new(),
            definitions: IndexMap::new(),
            by_identity: HashMap::new(),
            raw_cache: HashMap::new(),
            handlers: HashMap::new(),
            constructing: Vec::new(),
        };
        registry.scan()?;
        Ok(registry)
    }

    /// Parses `html` and scans the resulting document.
    pub fn from_html(html: &str, config: Config) -> Result<Self> {
        Self::new(parse_document(html)?, config)
    }

    fn scan(&mut self) -> Result<()> {
        let roots = self
            .selectors
            .template_root
            .select(&self.document, self.document.root());
        debug!(
            "Found {} elements matching '{}'",
            roots.len(),
            self.selectors.template_root
        );

        for root in roots {
            let name = self.marker_name(root)?;
            if self.definitions.contains_key(&name) {
                trace!("Template '{name}' is already registered");
                continue;
            }
            self.define(root)?;
        }
        debug!("Registered templates: {:?}", self.definitions.keys());
        Ok(())
    }

    fn marker_name(&self, node: NodeId) -> Result<String> {
        self.document
            .attr(node, "name")
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .ok_or_else(|| Error::MissingName {
                kind: MarkerKind::Template,
                tag: self.document.tag_name(node).unwrap_or_default().to_string(),
            })
    }

    /// Builds the template at `root` and registers it as the definition of its name.
    fn define(&mut self, root: NodeId) -> Result<TemplateId> {
        // nested definitions register while this one is built; keep document order
        let position = self.definitions.len();
        let id = self.instantiate(root)?;
        let name = self.template(id)?.name.clone();
        debug!("Defined template '{name}'");
        if !self.definitions.contains_key(&name) {
            self.definitions.shift_insert(position, name, id);
        }
        Ok(id)
    }

    /// Wraps the subtree at `root` in a new template: claims its direct
    /// variables and replaces each nested marker with a fresh instance.
    fn instantiate(&mut self, root: NodeId) -> Result<TemplateId> {
        let name = self.marker_name(root)?;
        let markers = collect_markers(&self.document, root, &self.selectors);

        let mut variables = Vec::with_capacity(markers.variables.len());
        for node in markers.variables {
            variables.push(Variable::bind(&mut self.document, node, &mut self.identities)?);
        }

        let identity = match self.document.attr(root, "id") {
            Some(identity) => identity.to_string(),
            None => {
                let identity = self.identities.generate(DEFAULT_IDENTITY_LENGTH);
                self.document.set_attr(root, "id", &identity);
                identity
            }
        };

        let id = TemplateId(self.templates.len());
        trace!("Template '{name}' #{identity} owns {} variables", variables.len());
        self.by_identity.insert(identity.clone(), id);
        self.templates.push(Some(Template {
            id,
            name: name.clone(),
            root,
            identity,
            variables,
            slots: IndexMap::new(),
            bindings: Vec::new(),
        }));

        self.constructing.push(name);
        let materialized = self.materialize(id, markers.nested);
        self.constructing.pop();
        materialized?;
        Ok(id)
    }

    fn materialize(&mut self, parent: TemplateId, nested: Vec<NodeId>) -> Result<()> {
        for marker in nested {
            let name = self.marker_name(marker)?;
            if self.constructing.contains(&name) {
                let mut chain = self.constructing.clone();
                chain.push(name);
                return Err(Error::CircularTemplate {
                    chain: chain.join(" -> "),
                });
            }
            if !self.has_template(&name) {
                self.define(marker)?;
            }

            let instance = self.get_new(&name, &Value::Null)?;
            let instance_root = self.template(instance)?.root;
            if !self.document.replace(marker, instance_root) {
                trace!("Nested marker '{name}' was detached, nothing to replace");
            }
            self.show(instance)?;
            self.template_mut(parent)?.slots.entry(name).or_insert(instance);
        }
        Ok(())
    }

    /// Returns a new, detached instance of the template `name` populated with
    /// `values`. The instance root is hidden until shown or inserted via
    /// [`Registry::add_tpl`].
    ///
    /// # Errors
    /// * `Error::NotFound` if no template is registered under `name`; the
    ///   document is left untouched
    pub fn get_new(&mut self, name: &str, values: &Value) -> Result<TemplateId> {
        let raw = self.raw(name)?;
        let copy = duplicate(&mut self.document, raw, &mut self.identities);
        let id = self.instantiate(copy)?;
        self.set(id, values)?;
        debug!("Instantiated '{name}' as #{}", self.template(id)?.identity);
        Ok(id)
    }

    /// The cached scrubbed stamp for `name`, producing it on first use.
    fn raw(&mut self, name: &str) -> Result<NodeId> {
        if let Some(raw) = self.raw_cache.get(name) {
            return Ok(*raw);
        }
        let definition = self.definition(name).ok_or_else(|| Error::NotFound {
            name: name.to_string(),
        })?;
        let root = self.template(definition)?.root;
        let raw = self.scrub(root);
        self.raw_cache.insert(name.to_string(), raw);
        Ok(raw)
    }

    /// Value-free, identity-refreshed, hidden copy of the subtree at `node`.
    pub fn scrub(&mut self, node: NodeId) -> NodeId {
        scrub(&mut self.document, node, &self.selectors, &mut self.identities)
    }

    /// Looks a live template up by the identity on its root element.
    pub fn get(&self, identity: &str) -> Result<TemplateId> {
        self.by_identity
            .get(identity)
            .copied()
            .ok_or_else(|| Error::IdentityNotFound {
                identity: identity.to_string(),
            })
    }

    pub fn template(&self, id: TemplateId) -> Result<&Template> {
        self.templates
            .get(id.0)
            .and_then(Option::as_ref)
            .ok_or(Error::UnknownTemplate { id: id.0 })
    }

    fn template_mut(&mut self, id: TemplateId) -> Result<&mut Template> {
        self.templates
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or(Error::UnknownTemplate { id: id.0 })
    }

    pub fn has_template(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }

    /// The registered definition of `name`.
    pub fn definition(&self, name: &str) -> Option<TemplateId> {
        self.definitions.get(name).copied()
    }

    /// Registered names in discovery order.
    pub fn template_names(&self) -> impl Iterator<Item = &str> {
        self.definitions.keys().map(String::as_str)
    }

    /// A fresh identity of `length` characters, longer once that length is
    /// used up.
    pub fn generate_identity(&mut self, length: usize) -> String {
        self.identities.generate(length)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn into_document(self) -> Document {
        self.document
    }

    pub fn to_html(&self) -> String {
        self.document.to_html()
    }

    /// Populates a template from a JSON object.
    ///
    /// Keys naming direct variables are applied to every such variable, keys
    /// naming sub-template slots populate (and show) the slot instance, a list
    /// populates the slot with its first item and appends one more instance per
    /// further item, and `events` replaces the template's event bindings.
    /// Other keys are ignored.
    pub fn set(&mut self, id: TemplateId, values: &Value) -> Result<()> {
        let template_name = self.template(id)?.name.clone();
        let map = match values {
            Value::Object(map) => map,
            Value::Null => return Ok(()),
            other => {
                return Err(Error::ValueError {
                    key: template_name,
                    reason: format!("expected an object, got {other}"),
                })
            }
        };

        for (key, value) in map {
            if key == EVENTS_KEY {
                self.bind_events(id, value)?;
                continue;
            }

            let mut applied = false;
            if let Some(content) = VariableValue::from_json(value) {
                let template = self
                    .templates
                    .get_mut(id.0)
                    .and_then(Option::as_mut)
                    .ok_or(Error::UnknownTemplate { id: id.0 })?;
                for variable in template.variables.iter_mut().filter(|v| v.name() == key.as_str()) {
                    variable.set(&mut self.document, &content);
                    applied = true;
                }
            }
            if let Some(slot) = self.template(id)?.sub_template(key) {
                self.fill_slot(id, key, slot, value)?;
                applied = true;
            }
            if !applied {
                trace!("'{template_name}' has nothing named '{key}'");
            }
        }
        Ok(())
    }

    fn fill_slot(&mut self, id: TemplateId, name: &str, slot: TemplateId, value: &Value) -> Result<()> {
        match value {
            Value::Object(_) => {
                self.set(slot, value)?;
                self.show(slot)
            }
            Value::Array(items) => {
                let mut items = items.iter();
                if let Some(first) = items.next() {
                    self.set(slot, first)?;
                    self.show(slot)?;
                }
                for item in items {
                    self.add_tpl(id, name, item)?;
                }
                Ok(())
            }
            Value::Null => Ok(()),
            other => {
                warn!("Ignoring {other} for sub-template '{name}', expected an object or a list");
                Ok(())
            }
        }
    }

    /// Replaces all event bindings of a template.
    fn bind_events(&mut self, id: TemplateId, value: &Value) -> Result<()> {
        let bindings: Vec<EventBinding> =
            serde_json::from_value(value.clone()).map_err(|e| Error::ValueError {
                key: EVENTS_KEY.to_string(),
                reason: e.to_string(),
            })?;
        for binding in &bindings {
            Selector::parse(&binding.selector)?;
        }

        let template = self.template_mut(id)?;
        if !template.bindings.is_empty() {
            debug!(
                "Unbinding {} event handlers from '{}'",
                template.bindings.len(),
                template.name
            );
        }
        template.bindings = bindings;
        Ok(())
    }

    /// Inserts a new populated instance of the sub-template `name` right after
    /// the last element of that template inside `id`, and shows it.
    ///
    /// # Errors
    /// * `Error::UnknownSlot` if `id` has no slot `name`; the document is left
    ///   untouched
    pub fn add_tpl(&mut self, id: TemplateId, name: &str, values: &Value) -> Result<TemplateId> {
        let template = self.template(id)?;
        let Some(slot) = template.sub_template(name) else {
            return Err(Error::UnknownSlot {
                template: template.name.clone(),
                slot: name.to_string(),
            });
        };
        let root = template.root;
        let slot_root = self.template(slot)?.root;

        let anchor = self.last_instance_named(root, name).or_else(|| {
            (slot_root != root && self.document.contains(root, slot_root)).then_some(slot_root)
        });

        let instance = self.get_new(name, values)?;
        let instance_root = self.template(instance)?.root;
        let placed = anchor.is_some_and(|anchor| self.document.insert_after(anchor, instance_root));
        if !placed {
            self.document.append_child(root, instance_root);
        }
        self.show(instance)?;
        Ok(instance)
    }

    fn last_instance_named(&self, root: NodeId, name: &str) -> Option<NodeId> {
        self.document
            .descendants(root)
            .into_iter()
            .filter(|node| {
                self.selectors.template_root.matches(&self.document, *node)
                    && self.document.attr(*node, "name") == Some(name)
            })
            .last()
    }

    /// Mutable access to the first direct variable called `name`.
    pub fn variable_mut(&mut self, id: TemplateId, name: &str) -> Result<VariableMut<'_>> {
        let template = self
            .templates
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or(Error::UnknownTemplate { id: id.0 })?;
        let Some(position) = template.variables.iter().position(|v| v.name() == name) else {
            return Err(Error::UnknownVariable {
                template: template.name.clone(),
                variable: name.to_string(),
            });
        };
        Ok(VariableMut {
            variable: &mut template.variables[position],
            document: &mut self.document,
        })
    }

    /// Current content of the first direct variable called `name`.
    pub fn value_of(&self, id: TemplateId, name: &str) -> Option<String> {
        let template = self.templates.get(id.0)?.as_ref()?;
        template.variable(name).map(|v| v.val(&self.document))
    }

    pub fn show(&mut self, id: TemplateId) -> Result<()> {
        let root = self.template(id)?.root;
        self.document.set_style_property(root, "display", None);
        Ok(())
    }

    pub fn hide(&mut self, id: TemplateId) -> Result<()> {
        let root = self.template(id)?.root;
        self.document.set_style_property(root, "display", Some("none"));
        Ok(())
    }

    pub fn is_visible(&self, id: TemplateId) -> Result<bool> {
        let root = self.template(id)?.root;
        Ok(!self.document.is_hidden(root))
    }

    /// Moves the template root under `target` as its last child.
    ///
    /// # Errors
    /// * `Error::HierarchyError` if `target` lies inside the template; the
    ///   document is left untouched
    pub fn append_to(&mut self, id: TemplateId, target: NodeId) -> Result<()> {
        let root = self.template(id)?.root;
        if !self.document.append_child(target, root) {
            return Err(Error::HierarchyError {
                node: root.index(),
                target: target.index(),
            });
        }
        Ok(())
    }

    /// Detaches an instance and forgets it together with every template
    /// instance inside it. Their handles and identities stop resolving and
    /// slots pointing at them are dropped from the templates that held them.
    ///
    /// # Errors
    /// * `Error::DefinitionRemoval` if `id` is the registered definition of
    ///   its name
    pub fn remove(&mut self, id: TemplateId) -> Result<()> {
        let template = self.template(id)?;
        if self.definition(&template.name) == Some(id) {
            return Err(Error::DefinitionRemoval {
                name: template.name.clone(),
            });
        }
        let root = template.root;

        let removed: Vec<TemplateId> = self
            .templates
            .iter()
            .flatten()
            .filter(|t| {
                self.document.contains(root, t.root) && self.definition(&t.name) != Some(t.id)
            })
            .map(|t| t.id)
            .collect();

        self.document.detach(root);
        for gone in &removed {
            if let Some(template) = self.templates[gone.0].take() {
                self.by_identity.remove(&template.identity);
                trace!("Forgot '{}' #{}", template.name, template.identity);
            }
        }
        for template in self.templates.iter_mut().flatten() {
            template.slots.retain(|_, slot| !removed.contains(&*slot));
        }
        debug!("Removed {} template instances", removed.len());
        Ok(())
    }

    /// Registers a callback that event bindings can name.
    pub fn register_handler<F>(&mut self, name: &str, handler: F)
    where
        F: Fn(&mut Registry, &Event) -> Result<()> + 'static,
    {
        self.handlers.insert(name.to_string(), Rc::new(handler));
    }

    /// Fires `event` on `target`: every template containing the target runs
    /// the handlers of its bindings whose selector matches the target or one of
    /// its ancestors inside that template, innermost template first.
    ///
    /// Returns the number of handlers run.
    pub fn trigger(&mut self, target: NodeId, event: &str) -> Result<usize> {
        let path: Vec<NodeId> = std::iter::once(target)
            .chain(self.document.ancestors(target))
            .collect();

        let mut pending = Vec::new();
        for (depth, node) in path.iter().enumerate() {
            let within = &path[..=depth];
            for template in self.templates.iter().flatten().filter(|t| t.root == *node) {
                for binding in template.bindings.iter().filter(|b| b.event == event) {
                    let selector = Selector::parse(&binding.selector)?;
                    if within.iter().any(|n| selector.matches(&self.document, *n)) {
                        pending.push((
                            binding.handler.clone(),
                            Event {
                                name: event.to_string(),
                                target,
                                template: template.id,
                                selector: binding.selector.clone(),
                            },
                        ));
                    }
                }
            }
        }

        let count = pending.len();
        for (name, event) in pending {
            let handler = self
                .handlers
                .get(&name)
                .cloned()
                .ok_or(Error::UnknownHandler { name })?;
            handler(self, &event)?;
        }
        Ok(count)
    }
}
