//! Error types for the grocery client layer.
//!
//! # Design
//! `NotFound` gets a dedicated variant because the object store's "no such
//! key" answer is an expected steady state for the print signal, while every
//! other failure must reach the caller. All other non-2xx responses land in
//! `HttpError` with the raw status code and body untouched.

use thiserror::Error;

/// Errors returned by the records client, the signal store and their
/// collaborators.
#[derive(Debug, Error)]
pub enum Error {
    /// A required configuration key was absent at construction time.
    #[error("missing required configuration key `{0}`")]
    MissingConfig(String),

    /// The secret-retrieval service could not produce the named parameter.
    #[error("secret `{name}` unavailable (HTTP {status}): {body}")]
    Secret {
        name: String,
        status: u16,
        body: String,
    },

    /// The server returned 404 for the requested object.
    #[error("resource not found")]
    NotFound,

    /// The server returned a non-2xx status other than 404.
    #[error("HTTP {status}: {body}")]
    HttpError { status: u16, body: String },

    /// The request never produced a response (DNS, connect, TLS, IO).
    #[error("transport failed: {0}")]
    Transport(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// A record came back without a field the caller asked to project.
    #[error("record {id} has no `{field}` field")]
    MissingField { id: String, field: String },
}

pub type Result<T> = std::result::Result<T, Error>;
