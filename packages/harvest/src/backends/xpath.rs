//! XPath backend: HTML parsed leniently by scraper, queried with XPath 1.0
//! like the XML backend.

use ego_tree::NodeRef;
use scraper::{Html, Node};

use super::markup::{select, Element, MarkupNode};
use super::Backend;
use crate::error::BackendResult;

/// Backend for HTML documents queried with XPath.
#[derive(Debug, Clone, Copy, Default)]
pub struct XPathBackend;

fn append_children(parent: &mut Element, node: NodeRef<'_, Node>) {
    for child in node.children() {
        match child.value() {
            Node::Element(el) => {
                let mut element = el
                    .attrs()
                    .fold(Element::new(el.name()), |element, (name, value)| {
                        element.with_attribute(name, value)
                    });
                append_children(&mut element, child);
                parent.push_element(element);
            }
            Node::Text(text) => parent.push_text(String::from(&**text)),
            Node::Document | Node::Fragment => append_children(parent, child),
            _ => {}
        }
    }
}

impl Backend for XPathBackend {
    type Node = MarkupNode;

    fn name(&self) -> &'static str {
        "xpath"
    }

    fn parse(&self, bytes: &[u8]) -> BackendResult<MarkupNode> {
        let text = String::from_utf8_lossy(bytes);
        if text.trim().is_empty() {
            return Ok(MarkupNode::Zero);
        }
        let html = Html::parse_document(&text);
        let mut root = Element::new("");
        append_children(&mut root, html.tree.root());
        Ok(MarkupNode::document(root))
    }

    fn is_zero(&self, node: &MarkupNode) -> bool {
        node.is_zero()
    }

    fn query_one(&self, node: &MarkupNode, path: &str) -> MarkupNode {
        select(node, path).into_iter().next().unwrap_or_default()
    }

    fn query_all(&self, node: &MarkupNode, path: &str) -> Vec<MarkupNode> {
        select(node, path)
    }

    fn text(&self, node: &MarkupNode) -> String {
        node.text()
    }
}
