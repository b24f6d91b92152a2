//! Object storage behind the print signal.
//!
//! # Design
//! `ObjectStore` is the seam between `SignalStore` and a concrete backend.
//! A missing object is always reported as `Error::NotFound` so callers can
//! tell it apart from permission, network or service failures.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use tracing::debug;

use crate::error::{Error, Result};
use crate::http::{path_segment, HttpMethod, HttpRequest, HttpResponse};
use crate::transport::Transport;

/// Minimal key-value object storage addressed by bucket and key.
pub trait ObjectStore {
    /// Succeeds when the object exists; `Error::NotFound` when it does not.
    fn head_object(&self, bucket: &str, key: &str) -> Result<()>;

    /// Create or unconditionally overwrite the object.
    fn put_object(&self, bucket: &str, key: &str, body: String) -> Result<()>;

    fn get_object(&self, bucket: &str, key: &str) -> Result<String>;

    /// Remove the object. Deleting a missing object follows the backend's
    /// own semantics.
    fn delete_object(&self, bucket: &str, key: &str) -> Result<()>;
}

impl<S: ObjectStore + ?Sized> ObjectStore for &S {
    fn head_object(&self, bucket: &str, key: &str) -> Result<()> {
        (**self).head_object(bucket, key)
    }

    fn put_object(&self, bucket: &str, key: &str, body: String) -> Result<()> {
        (**self).put_object(bucket, key, body)
    }

    fn get_object(&self, bucket: &str, key: &str) -> Result<String> {
        (**self).get_object(bucket, key)
    }

    fn delete_object(&self, bucket: &str, key: &str) -> Result<()> {
        (**self).delete_object(bucket, key)
    }
}

/// Path-style HTTP object store: `{endpoint}/{bucket}/{key}`.
///
/// Requests carry no credentials of their own; the endpoint is expected to
/// be reachable with whatever ambient authorization the deployment provides.
#[derive(Debug, Clone)]
pub struct HttpObjectStore<T> {
    endpoint: String,
    transport: T,
}

impl<T: Transport> HttpObjectStore<T> {
    pub fn new(endpoint: &str, transport: T) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            transport,
        }
    }

    /// Bucket and every `/`-separated part of the key are encoded on their own.
    fn object_url(&self, bucket: &str, key: &str) -> String {
        let key = key
            .trim_start_matches('/')
            .split('/')
            .map(path_segment)
            .collect::<Vec<_>>()
            .join("/");
        format!("{}/{}/{}", self.endpoint, path_segment(bucket), key)
    }

    pub fn build_head_object(&self, bucket: &str, key: &str) -> HttpRequest {
        HttpRequest::new(HttpMethod::Head, self.object_url(bucket, key))
    }

    pub fn build_put_object(&self, bucket: &str, key: &str, body: String) -> HttpRequest {
        HttpRequest::new(HttpMethod::Put, self.object_url(bucket, key)).with_text_body(body)
    }

    pub fn build_get_object(&self, bucket: &str, key: &str) -> HttpRequest {
        HttpRequest::new(HttpMethod::Get, self.object_url(bucket, key))
    }

    pub fn build_delete_object(&self, bucket: &str, key: &str) -> HttpRequest {
        HttpRequest::new(HttpMethod::Delete, self.object_url(bucket, key))
    }

    pub fn parse_empty(&self, response: HttpResponse) -> Result<()> {
        check_status(&response)
    }

    pub fn parse_get_object(&self, response: HttpResponse) -> Result<String> {
        check_status(&response)?;
        Ok(response.body)
    }
}

impl<T: Transport> ObjectStore for HttpObjectStore<T> {
    fn head_object(&self, bucket: &str, key: &str) -> Result<()> {
        let response = self.transport.execute(&self.build_head_object(bucket, key))?;
        self.parse_empty(response)
    }

    fn put_object(&self, bucket: &str, key: &str, body: String) -> Result<()> {
        debug!(bucket, key, bytes = body.len(), "putting object");
        let response = self.transport.execute(&self.build_put_object(bucket, key, body))?;
        self.parse_empty(response)
    }

    fn get_object(&self, bucket: &str, key: &str) -> Result<String> {
        let response = self.transport.execute(&self.build_get_object(bucket, key))?;
        self.parse_get_object(response)
    }

    fn delete_object(&self, bucket: &str, key: &str) -> Result<()> {
        debug!(bucket, key, "deleting object");
        let response = self.transport.execute(&self.build_delete_object(bucket, key))?;
        self.parse_empty(response)
    }
}

/// Map non-success status codes to the appropriate `Error` variant.
fn check_status(response: &HttpResponse) -> Result<()> {
    if response.is_success() {
        return Ok(());
    }
    if response.status == 404 {
        return Err(Error::NotFound);
    }
    Err(Error::HttpError {
        status: response.status,
        body: response.body.clone(),
    })
}

/// Thread-safe in-process object store. Deleting a missing object succeeds.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: Mutex<HashMap<(String, String), String>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_objects<R>(&self, f: impl FnOnce(&mut HashMap<(String, String), String>) -> R) -> R {
        let mut objects = self.objects.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut objects)
    }
}

fn object_id(bucket: &str, key: &str) -> (String, String) {
    (bucket.to_string(), key.to_string())
}

impl ObjectStore for MemoryObjectStore {
    fn head_object(&self, bucket: &str, key: &str) -> Result<()> {
        self.with_objects(|objects| {
            objects
                .contains_key(&object_id(bucket, key))
                .then_some(())
                .ok_or(Error::NotFound)
        })
    }

    fn put_object(&self, bucket: &str, key: &str, body: String) -> Result<()> {
        self.with_objects(|objects| {
            objects.insert(object_id(bucket, key), body);
        });
        Ok(())
    }

    fn get_object(&self, bucket: &str, key: &str) -> Result<String> {
        self.with_objects(|objects| objects.get(&object_id(bucket, key)).cloned().ok_or(Error::NotFound))
    }

    fn delete_object(&self, bucket: &str, key: &str) -> Result<()> {
        self.with_objects(|objects| {
            objects.remove(&object_id(bucket, key));
        });
        Ok(())
    }
}
