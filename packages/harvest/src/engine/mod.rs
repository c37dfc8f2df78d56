//! The resolution engine.
//!
//! [`Engine`] walks a [`Model`] against a document node and builds a
//! [`Value`] tree. It is written once, generic over the [`Backend`]
//! capability, and serves every document format.
//!
//! Siblings (object fields, array items, static array slots) are resolved
//! concurrently and joined before the parent is assembled. Results are
//! written by field name or position, so the output does not depend on
//! completion order.
//!
//! No field-level failure reaches the caller. A bad path, regex, expression,
//! literal or failed join degrades only the affected field to `Null`.

mod generated;

use futures::future::{join_all, BoxFuture};
use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::backends::{Backend, HtmlBackend, JsonBackend, XPathBackend, XmlBackend};
use crate::context::Context;
use crate::error::{EngineError, Result};
use crate::types::config::{ArrayConfig, BaseField, Field, Model, ObjectConfig, ResponseType};
use crate::value::{parse_scalar, Value};

/// Tree-walker over one backend.
pub struct Engine<B: Backend> {
    backend: B,
    context: Context,
}

impl<B: Backend> Engine<B> {
    pub fn new(backend: B, context: Context) -> Self {
        Self { backend, context }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Resolve `model` against the document rooted at `root`.
    ///
    /// A zero root yields `Null`. The only error is a model with no variant.
    pub async fn parse(&self, root: &B::Node, model: &Model) -> Result<Value> {
        if self.backend.is_zero(root) {
            debug!(backend = self.backend.name(), "Empty document");
            return Ok(Value::Null);
        }

        if let Some(field) = &model.base_field {
            Ok(self.build_base_field(root, field, None).await)
        } else if let Some(array) = &model.array_config {
            Ok(self.build_array(root, array, None).await)
        } else if let Some(object) = &model.object_config {
            Ok(self.build_object(root, object, None).await)
        } else {
            Err(EngineError::EmptyModel)
        }
    }

    /// Resolve a field. Precedence: `first_of`, `base_field`,
    /// `object_config`, `array_config`.
    pub fn build_field<'a>(
        &'a self,
        node: &'a B::Node,
        field: &'a Field,
        index: Option<u32>,
    ) -> BoxFuture<'a, Value> {
        Box::pin(async move {
            if !field.first_of.is_empty() {
                for candidate in &field.first_of {
                    let value = self.build_field(node, candidate, index).await;
                    if !value.is_empty() {
                        return value;
                    }
                }
                return Value::Null;
            }

            if let Some(base) = &field.base_field {
                self.build_base_field(node, base, index).await
            } else if let Some(object) = &field.object_config {
                self.build_object(node, object, index).await
            } else if let Some(array) = &field.array_config {
                self.build_array(node, array, index).await
            } else {
                Value::Null
            }
        })
    }

    /// Resolve a leaf: narrow by path, parse the text into the declared
    /// type, then hand the result to the generator if one is set.
    pub fn build_base_field<'a>(
        &'a self,
        node: &'a B::Node,
        field: &'a BaseField,
        index: Option<u32>,
    ) -> BoxFuture<'a, Value> {
        Box::pin(async move {
            if !field.first_of.is_empty() {
                for candidate in &field.first_of {
                    let value = self.build_base_field(node, candidate, index).await;
                    if !value.is_empty() {
                        return value;
                    }
                }
                return Value::Null;
            }

            let target = if field.path.is_empty() {
                node.clone()
            } else {
                self.backend.query_one(node, &field.path)
            };

            let value = if self.backend.is_zero(&target) {
                debug!(path = %field.path, "Path matched nothing");
                Value::Null
            } else {
                parse_scalar(&self.backend.text(&target), field.field_type)
            };

            match &field.generated {
                Some(generated) => {
                    generated::resolve(&self.context, generated, field.field_type, value, index)
                        .await
                }
                None => value,
            }
        })
    }

    /// Resolve an object config. Precedence: `field`, `array_config`,
    /// `fields`. Fields are resolved concurrently and keep declared order.
    pub fn build_object<'a>(
        &'a self,
        node: &'a B::Node,
        config: &'a ObjectConfig,
        index: Option<u32>,
    ) -> BoxFuture<'a, Value> {
        Box::pin(async move {
            if let Some(field) = &config.field {
                return self.build_base_field(node, field, index).await;
            }
            if let Some(array) = &config.array_config {
                return self.build_array(node, array, index).await;
            }

            let tasks = config.fields.iter().map(|(name, field)| async move {
                (name.clone(), self.build_field(node, field, index).await)
            });
            let entries: IndexMap<String, Value> = join_all(tasks).await.into_iter().collect();
            Value::Object(entries)
        })
    }

    /// Resolve an array config, static or dynamic.
    pub fn build_array<'a>(
        &'a self,
        node: &'a B::Node,
        config: &'a ArrayConfig,
        index: Option<u32>,
    ) -> BoxFuture<'a, Value> {
        Box::pin(async move {
            if let Some(fixed) = &config.static_array {
                // Length is the larger of the declared length and the
                // highest declared index + 1
                let highest = fixed.items.keys().next_back().map_or(0, |i| *i as usize + 1);
                let mut slots = vec![Value::Null; (fixed.length as usize).max(highest)];

                let tasks = fixed.items.iter().map(|(i, field)| async move {
                    (*i as usize, self.build_field(node, field, Some(*i)).await)
                });
                for (i, value) in join_all(tasks).await {
                    slots[i] = value;
                }
                return Value::Array(slots);
            }

            let mut nodes = self.backend.query_all(node, &config.root_path);
            if config.reverse {
                nodes.reverse();
            }
            if config.length_limit > 0 {
                nodes.truncate(config.length_limit as usize);
            }
            debug!(
                root_path = %config.root_path,
                items = nodes.len(),
                parent_index = ?index,
                "Building array"
            );

            let default_item = ObjectConfig::scalar(BaseField::default());
            let item_config = config.item_config.as_ref().unwrap_or(&default_item);

            let tasks = nodes.iter().enumerate().map(|(i, item)| {
                self.build_object(item, item_config, Some(i as u32))
            });
            Value::Array(join_all(tasks).await)
        })
    }
}

/// Parse `bytes` with the backend for `response_type` and resolve `model`.
///
/// Documents that fail to parse, and models with no variant, yield `Null`.
pub fn parse_response<'a>(
    context: &'a Context,
    response_type: ResponseType,
    bytes: &'a [u8],
    model: &'a Model,
) -> BoxFuture<'a, Value> {
    Box::pin(async move {
        match response_type {
            ResponseType::Json => run(JsonBackend, context, bytes, model).await,
            ResponseType::Html => run(HtmlBackend, context, bytes, model).await,
            ResponseType::Xml => run(XmlBackend, context, bytes, model).await,
            ResponseType::Xpath => run(XPathBackend, context, bytes, model).await,
        }
    })
}

async fn run<B: Backend>(backend: B, context: &Context, bytes: &[u8], model: &Model) -> Value {
    let root = match backend.parse(bytes) {
        Ok(root) => root,
        Err(e) => {
            debug!(backend = backend.name(), error = %e, "Unparsable document");
            return Value::Null;
        }
    };

    let engine = Engine::new(backend, context.clone());
    match engine.parse(&root, model).await {
        Ok(value) => value,
        Err(e) => {
            warn!(error = %e, "Cannot resolve model");
            Value::Null
        }
    }
}
