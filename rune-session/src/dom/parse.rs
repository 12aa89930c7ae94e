//! HTML parsing into the owned tree (html5ever via scraper)

use super::{Document, Element, NodeId, NodeKind};
use scraper::{ElementRef, Html, Node as HtmlNode};

pub(super) fn parse_document(html: &str) -> Document {
    let parsed = Html::parse_document(html);
    let mut doc = Document::new();
    let root = doc.root();

    for child in parsed.tree.root().children() {
        let Some(kind) = convert(child.value()) else {
            continue;
        };
        let id = doc.create_node(kind);
        doc.append_child(root, id);
        if let Some(element) = ElementRef::wrap(child) {
            copy_children(element, &mut doc, id);
        }
    }
    doc
}

/// Parse `html` as body content and append the result under `parent`
pub(super) fn parse_fragment_into(doc: &mut Document, parent: NodeId, html: &str) {
    let parsed = Html::parse_fragment(html);
    // html5ever wraps fragment content in a synthetic <html> element
    copy_children(parsed.root_element(), doc, parent);
}

fn copy_children(source: ElementRef<'_>, doc: &mut Document, parent: NodeId) {
    for child in source.children() {
        let Some(kind) = convert(child.value()) else {
            continue;
        };
        let id = doc.create_node(kind);
        doc.append_child(parent, id);
        if let Some(element) = ElementRef::wrap(child) {
            copy_children(element, doc, id);
        }
    }
}

fn convert(node: &HtmlNode) -> Option<NodeKind> {
    match node {
        HtmlNode::Element(el) => {
            let mut element = Element::new(el.name());
            for (name, value) in el.attrs() {
                element.set_attr(name, value);
            }
            Some(NodeKind::Element(element))
        }
        HtmlNode::Text(text) => Some(NodeKind::Text(text.text.to_string())),
        HtmlNode::Comment(comment) => Some(NodeKind::Comment(comment.comment.to_string())),
        HtmlNode::Doctype(doctype) => Some(NodeKind::Doctype(doctype.name().to_string())),
        _ => None,
    }
}
