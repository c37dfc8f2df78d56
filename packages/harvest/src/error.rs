//! Typed errors for the harvest library.
//!
//! Uses `thiserror` for library errors (not `anyhow`). None of these ever
//! escape a single field resolution: the engine logs them and degrades the
//! affected sub-tree to `Null`.

use thiserror::Error;

/// Errors surfaced by [`Engine::parse`](crate::engine::Engine::parse).
///
/// These are programmer errors (a malformed configuration shape), not
/// runtime faults. Malformed leaves never produce one.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The model has none of `base_field`, `array_config`, `object_config`
    #[error("model has no base_field, array_config or object_config")]
    EmptyModel,
}

/// Errors that can occur while fetching a document through a connector.
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Server answered with a non-success status
    #[error("HTTP {status} for {url}")]
    Status { status: u16, url: String },

    /// Invalid URL after template rendering
    #[error("invalid URL: {url}")]
    InvalidUrl { url: String },

    /// Unknown HTTP method in a server config
    #[error("invalid HTTP method: {method}")]
    InvalidMethod { method: String },

    /// Connector config names no source
    #[error("connector config has no static_config, server_config or plugin_config")]
    NoSource,

    /// No plugin registered under this name
    #[error("no connector plugin registered as {name}")]
    UnknownPlugin { name: String },

    /// The source answered with an empty body
    #[error("empty response")]
    EmptyResponse,

    /// Plugin-defined failure
    #[error("plugin {name} failed: {reason}")]
    Plugin { name: String, reason: String },

    /// Injected failure from a mock or test double
    #[error("unavailable: {0}")]
    Unavailable(String),
}

/// Errors raised while turning raw bytes into a document node.
#[derive(Debug, Error)]
pub enum BackendError {
    /// JSON parsing error
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// XML parsing error
    #[error("XML parse error: {0}")]
    Xml(#[from] roxmltree::Error),

    /// Body is not valid UTF-8
    #[error("document is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
}

/// Errors raised while loading configuration or settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Config text is not a valid config document
    #[error("invalid config: {0}")]
    Decode(#[from] serde_json::Error),

    /// An environment setting has an unparsable value
    #[error("invalid value for {name}: {value}")]
    InvalidSetting { name: String, value: String },
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Result type alias for connector operations.
pub type ConnectorResult<T> = std::result::Result<T, ConnectorError>;

/// Result type alias for backend parsing.
pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// Result type alias for configuration loading.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
