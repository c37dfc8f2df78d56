//! HTML backend with CSS selector queries.
//!
//! Uses the scraper crate for parsing and selector matching. Nodes share
//! the parsed document behind an `Arc<Mutex<_>>` and address elements by
//! tree id, so they can be cloned into concurrent tasks freely.

use ego_tree::NodeId;
use scraper::{ElementRef, Html, Selector};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

use super::Backend;
use crate::error::BackendResult;

/// Node of a parsed HTML document.
#[derive(Clone)]
pub struct HtmlNode {
    doc: Arc<Mutex<Html>>,
    id: Option<NodeId>,
}

impl HtmlNode {
    fn lock(&self) -> MutexGuard<'_, Html> {
        self.doc.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn with_id(&self, id: Option<NodeId>) -> Self {
        Self {
            doc: Arc::clone(&self.doc),
            id,
        }
    }
}

impl fmt::Debug for HtmlNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HtmlNode").field("id", &self.id).finish()
    }
}

/// Backend for HTML documents queried with CSS selectors.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlBackend;

impl HtmlBackend {
    fn select(&self, node: &HtmlNode, path: &str) -> Vec<NodeId> {
        let Some(id) = node.id else {
            return Vec::new();
        };
        let selector = match Selector::parse(path) {
            Ok(selector) => selector,
            Err(e) => {
                debug!(path = %path, error = %e, "Invalid CSS selector");
                return Vec::new();
            }
        };

        let doc = node.lock();
        if id == doc.tree.root().id() {
            return doc.select(&selector).map(|element| element.id()).collect();
        }
        doc.tree
            .get(id)
            .and_then(ElementRef::wrap)
            .map(|element| element.select(&selector).map(|found| found.id()).collect())
            .unwrap_or_default()
    }
}

impl Backend for HtmlBackend {
    type Node = HtmlNode;

    fn name(&self) -> &'static str {
        "html"
    }

    fn parse(&self, bytes: &[u8]) -> BackendResult<HtmlNode> {
        let text = String::from_utf8_lossy(bytes);
        let html = Html::parse_document(&text);
        let id = (!text.trim().is_empty()).then(|| html.tree.root().id());
        Ok(HtmlNode {
            doc: Arc::new(Mutex::new(html)),
            id,
        })
    }

    fn is_zero(&self, node: &HtmlNode) -> bool {
        node.id.is_none()
    }

    fn query_one(&self, node: &HtmlNode, path: &str) -> HtmlNode {
        if path.is_empty() {
            return node.clone();
        }
        let first = self.select(node, path).into_iter().next();
        node.with_id(first)
    }

    fn query_all(&self, node: &HtmlNode, path: &str) -> Vec<HtmlNode> {
        if path.is_empty() {
            return if node.id.is_some() {
                vec![node.clone()]
            } else {
                Vec::new()
            };
        }
        self.select(node, path)
            .into_iter()
            .map(|id| node.with_id(Some(id)))
            .collect()
    }

    fn text(&self, node: &HtmlNode) -> String {
        let Some(id) = node.id else {
            return String::new();
        };
        let doc = node.lock();
        let text: String = if id == doc.tree.root().id() {
            doc.root_element().text().collect()
        } else {
            doc.tree
                .get(id)
                .and_then(ElementRef::wrap)
                .map(|element| element.text().collect())
                .unwrap_or_default()
        };
        text.trim().to_string()
    }
}
