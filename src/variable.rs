//! Substitutable leaves of a template.

use indexmap::IndexMap;
use log::trace;
use serde_json::Value;

use crate::dom::{Document, NodeId};
use crate::error::{Error, MarkerKind, Result};
use crate::identity::{IdentityGenerator, DEFAULT_IDENTITY_LENGTH};
use crate::parser::parse_fragment_into;

/// Attributes a variable mirrors and a scrubbed copy carries over.
pub const ALLOWED_ATTRIBUTES: [&str; 15] = [
    "src", "href", "name", "id", "class", "title", "alt", "target", "tabindex", "style", "rel",
    "width", "height", "type", "value",
];

/// Key of an attribute mapping that addresses the content instead.
pub const CONTENT_KEY: &str = "value";

pub fn is_allowed_attribute(name: &str) -> bool {
    ALLOWED_ATTRIBUTES.contains(&name)
}

/// What a caller can assign to a variable in one go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariableValue {
    /// Replaces the element content.
    Content(String),
    /// Attribute writes; the `value` key is routed to the content.
    Attributes(IndexMap<String, String>),
}

impl VariableValue {
    /// Reads a JSON value: strings, numbers and booleans become content,
    /// objects become attribute writes. Null and arrays carry nothing.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self::Attributes(
                map.iter()
                    .filter_map(|(k, v)| scalar_to_string(v).map(|v| (k.clone(), v)))
                    .collect(),
            )),
            other => scalar_to_string(other).map(Self::Content),
        }
    }
}

impl From<&str> for VariableValue {
    fn from(content: &str) -> Self {
        Self::Content(content.to_string())
    }
}

impl From<String> for VariableValue {
    fn from(content: String) -> Self {
        Self::Content(content)
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// An element bound as a variable, with a cached mirror of its allow-listed
/// attributes.
#[derive(Debug, Clone)]
pub struct Variable {
    name: String,
    node: NodeId,
    identity: String,
    attributes: IndexMap<String, String>,
}

impl Variable {
    /// Binds the variable marker at `node`, giving it an identity if it has none.
    pub(crate) fn bind(
        document: &mut Document,
        node: NodeId,
        identities: &mut IdentityGenerator,
    ) -> Result<Self> {
        let name = document
            .attr(node, "name")
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .ok_or_else(|| Error::MissingName {
                kind: MarkerKind::Variable,
                tag: document.tag_name(node).unwrap_or_default().to_string(),
            })?;

        let identity = match document.attr(node, "id") {
            Some(id) => id.to_string(),
            None => {
                let id = identities.generate(DEFAULT_IDENTITY_LENGTH);
                document.set_attr(node, "id", &id);
                id
            }
        };

        let attributes = ALLOWED_ATTRIBUTES
            .iter()
            .filter_map(|attr| {
                document
                    .attr(node, attr)
                    .map(|value| (attr.to_string(), value.to_string()))
            })
            .collect();

        trace!("Bound variable '{name}' as #{identity}");
        Ok(Self {
            name,
            node,
            identity,
            attributes,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// The cached allow-listed attributes.
    pub fn attributes(&self) -> &IndexMap<String, String> {
        &self.attributes
    }

    /// Current value of `name`: the cache for allow-listed attributes, the
    /// element itself otherwise.
    pub fn attr<'a>(&'a self, document: &'a Document, name: &str) -> Option<&'a str> {
        if is_allowed_attribute(name) {
            self.attributes.get(name).map(String::as_str)
        } else {
            document.attr(self.node, name)
        }
    }

    pub fn set_attr(&mut self, document: &mut Document, name: &str, value: &str) {
        let name = name.to_ascii_lowercase();
        document.set_attr(self.node, &name, value);
        if is_allowed_attribute(&name) {
            self.attributes.insert(name.clone(), value.to_string());
        }
        if name == "id" {
            self.identity = value.to_string();
        }
    }

    /// Text content of the bound element.
    pub fn val(&self, document: &Document) -> String {
        document.text_content(self.node)
    }

    pub fn set_val(&mut self, document: &mut Document, value: &str) {
        document.set_text(self.node, value);
    }

    /// Inner markup of the bound element.
    pub fn html(&self, document: &Document) -> String {
        document.inner_html(self.node)
    }

    /// Replaces the content with parsed markup.
    pub fn set_html(&mut self, document: &mut Document, markup: &str) -> Result<()> {
        document.clear_children(self.node);
        parse_fragment_into(document, self.node, markup)?;
        Ok(())
    }

    pub fn set(&mut self, document: &mut Document, value: &VariableValue) {
        match value {
            VariableValue::Content(content) => self.set_val(document, content),
            VariableValue::Attributes(attrs) => {
                for (name, value) in attrs {
                    if name == CONTENT_KEY {
                        self.set_val(document, value);
                    } else {
                        self.set_attr(document, name, value);
                    }
                }
            }
        }
    }
}

/// A variable paired with the document it lives in.
pub struct VariableMut<'a> {
    pub(crate) variable: &'a mut Variable,
    pub(crate) document: &'a mut Document,
}

impl<'a> VariableMut<'a> {
    pub fn variable(&self) -> &Variable {
        &*self.variable
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.variable.attr(&*self.document, name)
    }

    pub fn set_attr(&mut self, name: &str, value: &str) -> &mut Self {
        self.variable.set_attr(self.document, name, value);
        self
    }

    pub fn val(&self) -> String {
        self.variable.val(&*self.document)
    }

    pub fn set_val(&mut self, value: &str) -> &mut Self {
        self.variable.set_val(self.document, value);
        self
    }

    pub fn html(&self) -> String {
        self.variable.html(&*self.document)
    }

    pub fn set_html(&mut self, markup: &str) -> Result<&mut Self> {
        self.variable.set_html(self.document, markup)?;
        Ok(self)
    }

    pub fn set(&mut self, value: impl Into<VariableValue>) -> &mut Self {
        self.variable.set(self.document, &value.into());
        self
    }
}
