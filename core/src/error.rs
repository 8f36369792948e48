//! Error types for the amoCRM client.
//!
//! # Design
//! Each stage of an operation has its own error enum so callers can match on
//! the stage that failed: validation, authentication, the status guard,
//! collection parsing, caller preconditions, and transport. `CrmError` wraps
//! them all for the client's public operations. No error path terminates the
//! process; every variant keeps the parameter path or field it concerns and,
//! for server rejections, the server's own message and code.

use std::path::PathBuf;

use serde_json::Value;
use thiserror::Error;

use crate::rules::{JsonKind, ValueType};

/// A parameter value broke its rule in the `RuleTable`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("parameter '{path}' must be {expected}, got {actual}")]
    TypeMismatch {
        path: String,
        expected: ValueType,
        actual: JsonKind,
    },

    #[error("parameter '{path}' does not accept {value}; allowed: {}", join_values(.allowed))]
    ValueNotAllowed {
        path: String,
        value: Value,
        allowed: Vec<Value>,
    },
}

fn join_values(values: &[Value]) -> String {
    values.iter().map(Value::to_string).collect::<Vec<_>>().join(", ")
}

/// Authentication could not be performed or was refused.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid credentials: {reason}")]
    InvalidCredentialsFormat { reason: &'static str },

    #[error("authentication rejected: {message} (code {code})")]
    Rejected { message: String, code: String },

    #[error("authentication request failed: {0}")]
    Transport(#[from] TransportError),

    #[error("could not encode credentials: {0}")]
    Encode(#[from] serde_json::Error),
}

/// A completed request came back with a status other than 200 or 204.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("request failed with HTTP {status}: {message} (code {code})")]
    Failed {
        message: String,
        code: String,
        status: u16,
    },
}

/// A response collection could not be turned into the requested column.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("collection is empty or absent")]
    EmptyCollection,

    #[error("record {index} has no '{field}' field")]
    MissingField { index: usize, field: &'static str },

    #[error("record {index} has an unusable '{field}' value")]
    InvalidValue { index: usize, field: &'static str },

    #[error("record {index} is malformed: {source}")]
    Malformed {
        index: usize,
        source: serde_json::Error,
    },
}

/// Malformed caller input detected before anything is validated or sent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PreconditionError {
    #[error("task {index} is not a JSON object")]
    TaskNotObject { index: usize },

    #[error("task {index} is missing required field '{field}'")]
    MissingTaskField { index: usize, field: &'static str },
}

/// The request never produced a response.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP transport error: {0}")]
    Http(String),

    #[error("could not read response body: {0}")]
    Body(String),

    #[error(transparent)]
    Session(#[from] SessionStoreError),
}

/// The persisted session could not be read or written.
#[derive(Debug, Error)]
pub enum SessionStoreError {
    #[error("could not access session file `{path}`: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("could not decode session file `{path}`: {source}")]
    Decode {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("could not encode session: {0}")]
    Encode(serde_json::Error),
}

/// Client configuration could not be loaded.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("could not parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("configuration validation failed: {0}")]
    Validation(String),
}

/// Errors returned by `CrmApiClient` operations.
#[derive(Debug, Error)]
pub enum CrmError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Request(#[from] RequestError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Precondition(#[from] PreconditionError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("could not encode request body: {0}")]
    Serialization(#[from] serde_json::Error),
}
