//! Simple CSS selectors used to find template and variable markers.
//!
//! Supported: an optional tag name followed by any number of `.class`, `#id`,
//! `[attr]` and `[attr=value]` parts, and comma-separated lists of those.
//! Combinators (descendant, child, sibling) are not supported.

use regex::Regex;
use std::sync::OnceLock;

use crate::dom::{Document, NodeId};
use crate::error::{Error, Result};

fn compound_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"^(?:\*|[A-Za-z][A-Za-z0-9-]*)?(?:[.#][A-Za-z0-9_-]+|\[[A-Za-z_:][A-Za-z0-9_:.-]*(?:=(?:"[^"]*"|'[^']*'|[^\]"']*))?\])*$"#)
            .expect("selector grammar is valid")
    })
}

fn part_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"([.#])([A-Za-z0-9_-]+)|\[([A-Za-z_:][A-Za-z0-9_:.-]*)(?:=(?:"([^"]*)"|'([^']*)'|([^\]"']*)))?\]"#)
            .expect("selector part grammar is valid")
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Condition {
    Class(String),
    Id(String),
    HasAttr(String),
    AttrEquals(String, String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    conditions: Vec<Condition>,
}

impl Compound {
    fn matches(&self, document: &Document, node: NodeId) -> bool {
        let Some(tag) = document.tag_name(node) else {
            return false;
        };
        if self.tag.as_deref().is_some_and(|wanted| wanted != tag) {
            return false;
        }
        self.conditions.iter().all(|condition| match condition {
            Condition::Class(class) => document.has_class(node, class),
            Condition::Id(id) => document.attr(node, "id") == Some(id.as_str()),
            Condition::HasAttr(name) => document.attr(node, name).is_some(),
            Condition::AttrEquals(name, value) => document.attr(node, name) == Some(value.as_str()),
        })
    }
}

/// A parsed selector list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    source: String,
    alternatives: Vec<Compound>,
}

impl Selector {
    pub fn parse(selector: &str) -> Result<Self> {
        let invalid = |reason: &str| Error::Selector {
            selector: selector.to_string(),
            reason: reason.to_string(),
        };

        let mut alternatives = Vec::new();
        for raw in selector.split(',') {
            let raw = raw.trim();
            if raw.is_empty() {
                return Err(invalid("empty selector"));
            }
            if !compound_regex().is_match(raw) {
                return Err(invalid("only tag, class, id and attribute selectors are supported"));
            }

            let tag_end = raw.find(['.', '#', '[']).unwrap_or(raw.len());
            let tag = match &raw[..tag_end] {
                "" | "*" => None,
                tag => Some(tag.to_ascii_lowercase()),
            };

            let conditions = part_regex()
                .captures_iter(&raw[tag_end..])
                .map(|caps| {
                    if let (Some(kind), Some(name)) = (caps.get(1), caps.get(2)) {
                        let name = name.as_str().to_string();
                        return if kind.as_str() == "." {
                            Condition::Class(name)
                        } else {
                            Condition::Id(name)
                        };
                    }
                    let attr = caps[3].to_ascii_lowercase();
                    match caps.get(4).or(caps.get(5)).or(caps.get(6)) {
                        Some(value) => Condition::AttrEquals(attr, value.as_str().trim().to_string()),
                        None => Condition::HasAttr(attr),
                    }
                })
                .collect();

            alternatives.push(Compound { tag, conditions });
        }

        Ok(Self {
            source: selector.to_string(),
            alternatives,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// True when matching reads the attribute `name`.
    pub fn references_attribute(&self, name: &str) -> bool {
        self.alternatives
            .iter()
            .flat_map(|compound| compound.conditions.iter())
            .any(|condition| match condition {
                Condition::Class(_) => name == "class",
                Condition::Id(_) => name == "id",
                Condition::HasAttr(attr) | Condition::AttrEquals(attr, _) => attr == name,
            })
    }

    pub fn matches(&self, document: &Document, node: NodeId) -> bool {
        self.alternatives
            .iter()
            .any(|compound| compound.matches(document, node))
    }

    /// Elements below `scope` (excluded) matching this selector, in document order.
    pub fn select(&self, document: &Document, scope: NodeId) -> Vec<NodeId> {
        document
            .descendants(scope)
            .into_iter()
            .filter(|node| self.matches(document, *node))
            .collect()
    }

    pub fn select_first(&self, document: &Document, scope: NodeId) -> Option<NodeId> {
        document
            .descendants(scope)
            .into_iter()
            .find(|node| self.matches(document, *node))
    }
}

impl std::fmt::Display for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (Document, NodeId, NodeId) {
        let mut doc = Document::new();
        let root = doc.root();
        let div = doc.create_element("div");
        doc.set_attr(div, "class", "tpl card");
        doc.set_attr(div, "name", "post");
        let span = doc.create_element("span");
        doc.set_attr(span, "id", "title");
        doc.append_child(root, div);
        doc.append_child(div, span);
        (doc, div, span)
    }

    #[test]
    fn test_class_and_tag() {
        let (doc, div, span) = sample();
        let selector = Selector::parse("div.tpl.card").unwrap();
        assert!(selector.matches(&doc, div));
        assert!(!selector.matches(&doc, span));
        assert!(!Selector::parse("p.tpl").unwrap().matches(&doc, div));
    }

    #[test]
    fn test_attributes_and_lists() {
        let (doc, div, span) = sample();
        assert!(Selector::parse("[name=post]").unwrap().matches(&doc, div));
        assert!(Selector::parse("[name=\"post\"]").unwrap().matches(&doc, div));
        assert!(!Selector::parse("[name=comment]").unwrap().matches(&doc, div));
        let list = Selector::parse(".missing, #title").unwrap();
        assert_eq!(list.select(&doc, doc.root()), vec![span]);
    }

    #[test]
    fn test_references_attribute() {
        let selector = Selector::parse("div.tpl[data-kind=row]").unwrap();
        assert!(selector.references_attribute("class"));
        assert!(selector.references_attribute("data-kind"));
        assert!(!selector.references_attribute("name"));
    }

    #[test]
    fn test_rejects_combinators() {
        assert!(matches!(
            Selector::parse("div .var"),
            Err(Error::Selector { .. })
        ));
        assert!(Selector::parse("").is_err());
        assert!(Selector::parse(".a,").is_err());
    }
}
