//! HTML parsing into the in-memory [`Document`].
//! Markup is tokenized by html5ever into an `RcDom` and then copied into the
//! arena so the rest of the crate never touches reference-counted handles.

use html5ever::tendril::TendrilSink;
use html5ever::{parse_document as parse_html, parse_fragment as parse_html_fragment};
use markup5ever::{LocalName, Namespace, QualName};
use markup5ever_rcdom::{Handle, NodeData, RcDom};

use crate::dom::{Document, NodeId};
use crate::error::{Error, Result};

const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

/// Parses a complete HTML document.
///
/// The `html`, `head` and `body` elements the HTML parser synthesizes are kept.
pub fn parse_document(html: &str) -> Result<Document> {
    let dom = parse_html(RcDom::default(), Default::default())
        .from_utf8()
        .read_from(&mut html.as_bytes())
        .map_err(|e| Error::ParseError(e.to_string()))?;

    let mut document = Document::new();
    let root = document.root();
    for child in dom.document.children.borrow().iter() {
        copy_node(child, &mut document, root);
    }
    Ok(document)
}

/// Parses markup as the content of a `<body>` element and appends the
/// resulting nodes under `parent`. Returns the inserted top-level nodes.
pub fn parse_fragment_into(
    document: &mut Document,
    parent: NodeId,
    markup: &str,
) -> Result<Vec<NodeId>> {
    let context = QualName::new(
        None,
        Namespace::from(HTML_NAMESPACE),
        LocalName::from("body"),
    );
    let dom = parse_html_fragment(RcDom::default(), Default::default(), context, Vec::new())
        .from_utf8()
        .read_from(&mut markup.as_bytes())
        .map_err(|e| Error::ParseError(e.to_string()))?;

    // The fragment parser wraps its output in a synthetic <html> element.
    let mut inserted = Vec::new();
    for top in dom.document.children.borrow().iter() {
        let wrapper = matches!(&top.data, NodeData::Element { name, .. } if &*name.local == "html");
        if wrapper {
            for child in top.children.borrow().iter() {
                inserted.extend(copy_node(child, document, parent));
            }
        } else {
            inserted.extend(copy_node(top, document, parent));
        }
    }
    Ok(inserted)
}

fn copy_node(handle: &Handle, document: &mut Document, parent: NodeId) -> Option<NodeId> {
    let id = match &handle.data {
        NodeData::Doctype { name, .. } => document.create_doctype(name),
        NodeData::Text { contents } => document.create_text(&contents.borrow()),
        NodeData::Comment { contents } => document.create_comment(contents),
        NodeData::Element {
            name,
            attrs,
            template_contents,
            ..
        } => {
            let id = document.create_element(&name.local);
            for attr in attrs.borrow().iter() {
                document.set_attr(id, &attr.name.local, &attr.value);
            }
            // <template> content lives in a separate fragment
            if let Some(contents) = template_contents.borrow().as_ref() {
                for child in contents.children.borrow().iter() {
                    copy_node(child, document, id);
                }
            }
            id
        }
        NodeData::Document | NodeData::ProcessingInstruction { .. } => return None,
    };
    document.append_child(parent, id);
    for child in handle.children.borrow().iter() {
        copy_node(child, document, id);
    }
    Some(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_document_keeps_structure() {
        let doc = parse_document(
            r#"<!DOCTYPE html><html><head></head><body><div class="tpl" name="post"><p>Hi</p></div></body></html>"#,
        )
        .unwrap();
        assert_eq!(
            doc.to_html(),
            r#"<!DOCTYPE html><html><head></head><body><div class="tpl" name="post"><p>Hi</p></div></body></html>"#
        );
    }

    #[test]
    fn test_parse_fragment_into() {
        let mut doc = Document::new();
        let root = doc.root();
        let div = doc.create_element("div");
        doc.append_child(root, div);

        let inserted = parse_fragment_into(&mut doc, div, "<b>bold</b> text").unwrap();
        assert_eq!(inserted.len(), 2);
        assert_eq!(doc.inner_html(div), "<b>bold</b> text");
    }
}
