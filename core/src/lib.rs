//! Blocking client layer for the grocery-list service.
//!
//! # Overview
//! Two independent components, each built from an explicit configuration
//! value:
//! - `RecordsClient` lists, resolves, creates and updates grocery records in
//!   a tabular-data API, hiding pagination and authorization.
//! - `SignalStore` keeps the "print requested" flag as the existence of one
//!   object in an object store, with the pending items as its body.
//!
//! # Design
//! - Requests and responses are plain data (`http`); clients split every
//!   operation into a pure `build_*` and `parse_*` step and run the
//!   round-trip through a `Transport`.
//! - Payloads are typed (`types`) and serialized only at the boundary.
//! - Nothing is cached and nothing is retried; coordination between the two
//!   components is left to the caller.

pub mod config;
pub mod error;
pub mod http;
pub mod objects;
pub mod records;
pub mod secrets;
pub mod signal;
pub mod transport;
pub mod types;

pub use config::{Config, RecordsConfig, SecretsConfig, SignalConfig};
pub use error::{Error, Result};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use objects::{HttpObjectStore, MemoryObjectStore, ObjectStore};
pub use records::RecordsClient;
pub use secrets::{ParameterStoreClient, SecretSource};
pub use signal::SignalStore;
pub use transport::{Transport, UreqTransport};
pub use types::{Fields, ListPage, Record, RecordsResponse};
