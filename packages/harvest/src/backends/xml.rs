//! XML backend: documents parsed by roxmltree, queried with XPath 1.0.

use roxmltree::{Document, ParsingOptions};

use super::markup::{select, Element, MarkupNode};
use super::Backend;
use crate::error::BackendResult;

/// Backend for XML documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlBackend;

fn convert(node: roxmltree::Node<'_, '_>) -> Element {
    let mut element = node
        .attributes()
        .fold(Element::new(node.tag_name().name()), |element, attr| {
            element.with_attribute(attr.name(), attr.value())
        });
    for child in node.children() {
        if child.is_element() {
            element.push_element(convert(child));
        } else if child.is_text() {
            if let Some(text) = child.text() {
                element.push_text(text);
            }
        }
    }
    element
}

impl Backend for XmlBackend {
    type Node = MarkupNode;

    fn name(&self) -> &'static str {
        "xml"
    }

    fn parse(&self, bytes: &[u8]) -> BackendResult<MarkupNode> {
        let text = std::str::from_utf8(bytes)?;
        if text.trim().is_empty() {
            return Ok(MarkupNode::Zero);
        }
        let options = ParsingOptions {
            allow_dtd: true,
            ..ParsingOptions::default()
        };
        let doc = Document::parse_with_options(text, options)?;

        let mut root = Element::new("");
        for child in doc.root().children().filter(|n| n.is_element()) {
            root.push_element(convert(child));
        }
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
