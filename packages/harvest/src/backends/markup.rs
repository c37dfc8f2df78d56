//! Owned markup tree shared by the XML and XPath backends.
//!
//! Parsers (roxmltree for XML, scraper for HTML) are converted once into an
//! immutable `Arc` tree, so nodes carry no borrow of the source text and
//! can be cloned into concurrent tasks.
//!
//! Queries are XPath 1.0, evaluated by `sxd-xpath`. Each query loads the
//! tree into an `sxd-document` package, runs the compiled expression from
//! the context node and maps the resulting nodes back onto the owned tree.
//! Node-set results become elements or text; string, number and boolean
//! results (`count(..)`, `normalize-space(..)`) become a single text node.

use std::collections::HashMap;
use std::sync::Arc;

use sxd_document::{dom, Package};
use sxd_xpath::nodeset::Node;
use sxd_xpath::{Context, Factory, Value as XPathValue};
use tracing::warn;

/// Element of the owned tree. The document root is an element with an
/// empty name holding the top-level nodes.
#[derive(Debug, Default)]
pub struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<Child>,
}

#[derive(Debug)]
enum Child {
    Element(Arc<Element>),
    Text(String),
}

impl Element {
    pub(super) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub(super) fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    pub(super) fn push_element(&mut self, element: Element) {
        self.children.push(Child::Element(Arc::new(element)));
    }

    pub(super) fn push_text(&mut self, text: impl Into<String>) {
        self.children.push(Child::Text(text.into()));
    }

    fn elements(&self) -> impl Iterator<Item = &Arc<Element>> {
        self.children.iter().filter_map(|child| match child {
            Child::Element(element) => Some(element),
            Child::Text(_) => None,
        })
    }

    /// All descendant text in document order.
    fn string_value(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for child in &self.children {
            match child {
                Child::Text(text) => out.push_str(text),
                Child::Element(element) => element.collect_text(out),
            }
        }
    }
}

/// Node of a markup document.
#[derive(Debug, Clone, Default)]
pub enum MarkupNode {
    /// Absent node
    #[default]
    Zero,
    /// Element together with its document root (for absolute paths)
    Element {
        root: Arc<Element>,
        element: Arc<Element>,
    },
    /// Attribute value, text node or atomic result
    Text(String),
}

impl MarkupNode {
    pub(super) fn document(root: Element) -> Self {
        let root = Arc::new(root);
        MarkupNode::Element {
            element: Arc::clone(&root),
            root,
        }
    }

    pub fn is_zero(&self) -> bool {
        matches!(self, MarkupNode::Zero)
    }

    /// String value, trimmed.
    pub fn text(&self) -> String {
        match self {
            MarkupNode::Zero => String::new(),
            MarkupNode::Element { element, .. } => element.string_value().trim().to_string(),
            MarkupNode::Text(text) => text.trim().to_string(),
        }
    }
}

/// Evaluate an XPath expression from `node`.
///
/// An empty path is the node itself. Invalid expressions and evaluation
/// errors are logged and select nothing.
pub fn select(node: &MarkupNode, path: &str) -> Vec<MarkupNode> {
    let path = path.trim();
    if path.is_empty() {
        return if node.is_zero() {
            Vec::new()
        } else {
            vec![node.clone()]
        };
    }
    let MarkupNode::Element { root, element } = node else {
        return Vec::new();
    };

    let xpath = match Factory::new().build(path) {
        Ok(Some(xpath)) => xpath,
        Ok(None) => return Vec::new(),
        Err(e) => {
            warn!(path = %path, error = %e, "Invalid XPath expression");
            return Vec::new();
        }
    };

    let package = Package::new();
    let document = package.as_document();
    let mut loader = Loader {
        document: &document,
        target: element,
        elements: HashMap::new(),
        context: None,
    };
    for top in root.elements() {
        let loaded = loader.load(top);
        document.root().append_child(loaded);
    }

    let context_node: Node<'_> = if Arc::ptr_eq(root, element) {
        document.root().into()
    } else {
        match loader.context {
            Some(context) => context.into(),
            None => return Vec::new(),
        }
    };

    let context = Context::new();
    let value = match xpath.evaluate(&context, context_node) {
        Ok(value) => value,
        Err(e) => {
            warn!(path = %path, error = %e, "XPath evaluation failed");
            return Vec::new();
        }
    };

    match value {
        XPathValue::Nodeset(nodes) => nodes
            .document_order()
            .into_iter()
            .filter_map(|found| match found {
                Node::Root(_) => Some(MarkupNode::Element {
                    root: Arc::clone(root),
                    element: Arc::clone(root),
                }),
                Node::Element(_) => loader.elements.get(&found).map(|element| MarkupNode::Element {
                    root: Arc::clone(root),
                    element: Arc::clone(element),
                }),
                Node::Attribute(attribute) => Some(MarkupNode::Text(attribute.value().to_string())),
                Node::Text(text) => Some(MarkupNode::Text(text.text().to_string())),
                other => Some(MarkupNode::Text(other.string_value())),
            })
            .collect(),
        atomic => vec![MarkupNode::Text(atomic.string())],
    }
}

/// Copies the owned tree into an sxd document, remembering which owned
/// element each loaded element came from.
struct Loader<'a, 'd> {
    document: &'a dom::Document<'d>,
    target: &'a Arc<Element>,
    elements: HashMap<Node<'d>, Arc<Element>>,
    context: Option<dom::Element<'d>>,
}

impl<'a, 'd> Loader<'a, 'd> {
    fn load(&mut self, source: &Arc<Element>) -> dom::Element<'d> {
        let element = self.document.create_element(source.name.as_str());
        for (name, value) in &source.attributes {
            element.set_attribute_value(name.as_str(), value);
        }
        for child in &source.children {
            match child {
                Child::Element(child) => {
                    let loaded = self.load(child);
                    element.append_child(loaded);
                }
                Child::Text(text) => element.append_child(self.document.create_text(text)),
            }
        }

        if Arc::ptr_eq(source, self.target) {
            self.context = Some(element);
        }
        self.elements.insert(Node::Element(element), Arc::clone(source));
        element
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> MarkupNode {
        let mut doc = Element::new("");
        let mut catalog = Element::new("catalog");
        for (id, title, price, lang) in [
            ("b1", "Dune", "9.99", "en"),
            ("b2", "a!=b", "7.50", "pl"),
            ("b3", "Ubik", "5.00", "en"),
        ] {
            let mut book = Element::new("book")
                .with_attribute("id", id)
                .with_attribute("lang", lang);
            let mut t = Element::new("title");
            t.push_text(title);
            let mut p = Element::new("price");
            p.push_text(format!(" {price} "));
            book.push_element(t);
            book.push_element(p);
            catalog.push_element(book);
        }
        doc.push_element(catalog);
        MarkupNode::document(doc)
    }

    fn texts(nodes: &[MarkupNode]) -> Vec<String> {
        nodes.iter().map(MarkupNode::text).collect()
    }

    #[test]
    fn test_absolute_and_descendant_paths() {
        let doc = catalog();
        assert_eq!(select(&doc, "/catalog/book").len(), 3);
        assert_eq!(texts(&select(&doc, "//title")), vec!["Dune", "a!=b", "Ubik"]);
        assert_eq!(select(&doc, "/catalog//price").len(), 3);
        assert!(select(&doc, "/book").is_empty());
    }

    #[test]
    fn test_predicates() {
        let doc = catalog();
        assert_eq!(texts(&select(&doc, "//book[2]/@id")), vec!["b2"]);
        assert_eq!(texts(&select(&doc, "//book[last()]/title")), vec!["Ubik"]);
        assert_eq!(
            texts(&select(&doc, "//book[@lang='en']/title")),
            vec!["Dune", "Ubik"]
        );
        assert_eq!(
            texts(&select(&doc, "//book[@lang='en' and @id='b3']/title")),
            vec!["Ubik"]
        );
        assert_eq!(
            texts(&select(&doc, "//book[@id='b1' or @id='b3']/@id")),
            vec!["b1", "b3"]
        );
        assert_eq!(texts(&select(&doc, "//book[title='a!=b']/@id")), vec!["b2"]);
        assert_eq!(
            texts(&select(&doc, "//book[contains(@id,'3')]/title")),
            vec!["Ubik"]
        );
        assert!(select(&doc, "//book[@missing]").is_empty());
    }

    #[test]
    fn test_axes_and_functions() {
        let doc = catalog();
        assert_eq!(
            texts(&select(&doc, "//book[@id='b1']/following-sibling::book/@id")),
            vec!["b2", "b3"]
        );
        assert_eq!(
            texts(&select(&doc, "//title[.='Ubik']/ancestor::book/@lang")),
            vec!["en"]
        );
        assert_eq!(texts(&select(&doc, "count(//book)")), vec!["3"]);
        assert_eq!(
            texts(&select(&doc, "normalize-space(//book[1]/price)")),
            vec!["9.99"]
        );
    }

    #[test]
    fn test_relative_paths_and_text() {
        let doc = catalog();
        let books = select(&doc, "//book");
        assert_eq!(texts(&select(&books[0], "title")), vec!["Dune"]);
        assert_eq!(texts(&select(&books[0], "title/text()")), vec!["Dune"]);
        assert_eq!(texts(&select(&books[1], "@id")), vec!["b2"]);
        assert_eq!(texts(&select(&books[2], ".")), vec!["Ubik 5.00"]);
        assert_eq!(select(&books[1], "").len(), 1);
        // Absolute paths ignore the context node
        assert_eq!(select(&books[2], "/catalog/book").len(), 3);
    }

    #[test]
    fn test_malformed_paths() {
        let doc = catalog();
        assert!(select(&doc, "//book[").is_empty());
        assert!(select(&doc, "//book[@id='b1]").is_empty());
        assert!(select(&doc, "//book[frobnicate(1)]").is_empty());
        assert!(select(&MarkupNode::Zero, "//book").is_empty());
        assert!(select(&MarkupNode::Text("x".into()), "//book").is_empty());
    }
}
