//! Error types for encoding, decoding and registry management.

use thiserror::Error;

/// Failure of a whole `dumps`/`dump` call.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// No encoding strategy produced a representation for the value.
    #[error("type `{0}` is not JSON serializable")]
    UnsupportedType(String),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure of a whole `loads`/`load` call.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("type resolution failed: {0}")]
    TypeResolution(#[from] ResolveError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DecodeError {
    pub fn is_type_resolution(&self) -> bool {
        matches!(self, DecodeError::TypeResolution(_))
    }
}

/// A type locator that does not lead to a registered type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("no module named `{0}`")]
    UnknownModule(String),
    #[error("module `{module}` has no type `{class}`")]
    UnknownType { module: String, class: String },
    #[error("malformed locator: {0}")]
    Malformed(String),
}

/// Misuse of the registry API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// Failure of a single strategy (a registered function, a hook or a
/// constructor). The strategy chains catch these and move on.
#[derive(Debug, Error)]
pub enum HookError {
    #[error("missing field `{0}`")]
    MissingField(String),
    #[error("field `{field}` is not {expected}")]
    InvalidField {
        field: String,
        expected: &'static str,
    },
    #[error("{0}")]
    Message(String),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Time(#[from] chrono::ParseError),
}

impl HookError {
    pub fn msg(message: impl Into<String>) -> Self {
        HookError::Message(message.into())
    }
}

pub type EncodeResult<T> = Result<T, EncodeError>;
pub type DecodeResult<T> = Result<T, DecodeError>;
pub type HookResult<T> = Result<T, HookError>;
