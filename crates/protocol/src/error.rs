use thiserror::Error;

use crate::envelope::{Response, ResultCode};
use crate::state::SessionState;

/// A value could not be encoded because it is incomplete.
///
/// These are local state-validation failures: the value was never fully
/// populated before being handed to the encoder. They are never retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    #[error("Required field not set: {0}")]
    MissingField(&'static str),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// Wire data did not match the expected shape.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Malformed XML: {0}")]
    Xml(String),

    #[error("Unexpected element: expected {expected}, found {found}")]
    UnexpectedElement { expected: String, found: String },

    #[error("Missing required element: {0}")]
    MissingElement(String),

    #[error("Missing required attribute: {0}")]
    MissingAttribute(String),

    #[error("Invalid value for {field}: {value:?}")]
    InvalidValue { field: String, value: String },

    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

/// No registered module claims an element found on the wire.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("No module registered for namespace {0}")]
    UnknownNamespace(String),

    #[error("Namespace {namespace} has no handler for <{tag}>")]
    UnknownTag { namespace: String, tag: String },
}

/// Registry misconfiguration detected while registering modules.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Namespace already registered: {0}")]
    DuplicateNamespace(String),

    #[error("Duplicate registration for <{tag}> in namespace {namespace}")]
    DuplicateTag { namespace: String, tag: String },

    #[error("Type {type_name} belongs to namespace {actual}, not {expected}")]
    NamespaceMismatch {
        type_name: &'static str,
        expected: String,
        actual: String,
    },
}

/// RFC 5734 frame header violations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("Frame length {0} is smaller than the frame header")]
    InvalidLength(u32),

    #[error("Frame of {size} bytes exceeds limit of {max} bytes")]
    TooLarge { size: usize, max: usize },
}

/// Greeting and client capabilities have nothing in common.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NegotiationError {
    #[error("Server does not offer EPP version {required} (offers {offered:?})")]
    UnsupportedVersion {
        required: &'static str,
        offered: Vec<String>,
    },

    #[error("Server supports none of the registered object services")]
    NoCommonObjectService,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    #[error("Invalid state transition: {from} -> {to}")]
    InvalidStateTransition { from: SessionState, to: SessionState },
}

/// The server rejected a command.
///
/// Ordinary data, not a transport failure: the round-trip succeeded and the
/// full response stays available for inspection.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Command failed with code {code}: {message}")]
pub struct CommandError {
    pub code: ResultCode,
    pub message: String,
    pub response: Box<Response>,
}

pub type DecodeResult<T> = std::result::Result<T, DecodeError>;
pub type EncodeResult<T> = std::result::Result<T, EncodeError>;
