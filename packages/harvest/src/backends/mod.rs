//! Document backends.
//!
//! A [`Backend`] is the narrow capability the engine walks documents with:
//! turn bytes into a node, tell a zero node apart, run a query returning
//! one node or an ordered sequence, and read a node's text. The engine is
//! written once against this trait.
//!
//! # Available Backends
//!
//! - `JsonBackend` - gjson path queries over JSON text
//! - `HtmlBackend` - CSS selectors via `scraper`
//! - `XmlBackend` - XPath over documents parsed by `roxmltree`
//! - `XPathBackend` - XPath over HTML parsed by `scraper`

mod html;
mod json;
mod markup;
mod xml;
mod xpath;

pub use html::{HtmlBackend, HtmlNode};
pub use json::{query as json_query, JsonBackend, JsonNode};
pub use markup::MarkupNode;
pub use xml::XmlBackend;
pub use xpath::XPathBackend;

use crate::error::BackendResult;

/// Query capability over one document format.
pub trait Backend: Send + Sync {
    /// Opaque document node. Cheap to clone, shareable across tasks.
    type Node: Clone + Send + Sync;

    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Parse a fetched body into its root node.
    fn parse(&self, bytes: &[u8]) -> BackendResult<Self::Node>;

    /// Whether the node is absent (failed query, empty document).
    fn is_zero(&self, node: &Self::Node) -> bool;

    /// First node matching `path` under `node`; an empty path is `node`.
    fn query_one(&self, node: &Self::Node, path: &str) -> Self::Node;

    /// All nodes matching `path` under `node`, in document order.
    fn query_all(&self, node: &Self::Node, path: &str) -> Vec<Self::Node>;

    /// Text of a node.
    fn text(&self, node: &Self::Node) -> String;
}
