//! Declarative Data Extraction Library
//!
//! Turns a fetched document (JSON, HTML, XML, or HTML addressed by XPath)
//! and a configuration describing the desired output shape into a typed,
//! JSON-serializable value tree.
//!
//! # Design Philosophy
//!
//! - One generic engine for every document format
//! - Siblings resolve concurrently, output order is fixed by the config
//! - Field failures degrade to `null`, never abort the run
//! - Collaborators (connectors, plugins, references) are explicit objects
//!
//! # Usage
//!
//! ```rust,ignore
//! use harvest::{Config, Context, Runner, Settings};
//!
//! let settings = Settings::from_env()?;
//! let runner = Runner::new(Context::from_settings(&settings)?);
//! let config = Config::from_path("harvest.json")?;
//!
//! for (name, result) in runner.run(&config).await {
//!     println!("{name}: {}", result.json);
//! }
//! ```
//!
//! # Modules
//!
//! - [`types`] - Configuration shape
//! - [`value`] - Output value tree
//! - [`backends`] - Document formats and their query languages
//! - [`engine`] - The resolution engine
//! - [`template`] - Placeholders, tokens and expressions
//! - [`connectors`] - Document sources (static, HTTP, plugin, mock)
//! - [`references`] - Named values shared across a run
//! - [`plugins`] - Capability registry for custom connectors and generators
//! - [`runner`] - Fetch, parse and resolve configured items

pub mod backends;
pub mod connectors;
pub mod context;
pub mod engine;
pub mod error;
pub mod plugins;
pub mod references;
pub mod runner;
pub mod settings;
pub mod template;
pub mod types;
pub mod value;

// Re-export core types at crate root
pub use backends::{
    Backend, HtmlBackend, HtmlNode, JsonBackend, JsonNode, MarkupNode, XPathBackend, XmlBackend,
};
pub use connectors::{build_connector, Connector, MockConnector, ResourceLimiter};
pub use context::Context;
pub use engine::{parse_response, Engine};
pub use error::{BackendError, ConfigError, ConnectorError, EngineError};
pub use plugins::{ConnectorPlugin, FieldPlugin, Registry};
pub use references::{populate_references, RefStore};
pub use runner::{ParseResult, Runner};
pub use settings::Settings;
pub use types::config::{
    ArrayConfig, BaseField, Config, ConnectorConfig, Field, FieldType, GeneratedFieldConfig,
    Item, Model, ModelFieldConfig, ObjectConfig, Reference, ResponseType, StaticArrayConfig,
};
pub use value::{to_jsonable, Value};
