//! The print signal: a single object whose presence means "print pending".
//!
//! The object's body holds the pending item names, one per line. `exists`
//! only observes; `set` and `delete` move the signal to PRESENT and ABSENT
//! from either state. Concurrent writers race with last-write-wins.

use tracing::info;

use crate::config::SignalConfig;
use crate::error::{Error, Result};
use crate::objects::ObjectStore;

/// A boolean flag persisted as the existence of `bucket/key`.
#[derive(Debug, Clone)]
pub struct SignalStore<S> {
    bucket: String,
    key: String,
    store: S,
}

impl<S: ObjectStore> SignalStore<S> {
    pub fn new(config: &SignalConfig, store: S) -> Self {
        Self {
            bucket: config.bucket.clone(),
            key: config.key.clone(),
            store,
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// `true` when the signal object is present. Only "not found" maps to
    /// `false`; every other failure is returned.
    pub fn exists(&self) -> Result<bool> {
        match self.store.head_object(&self.bucket, &self.key) {
            Ok(()) => Ok(true),
            Err(Error::NotFound) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Write `items` newline-joined, overwriting any existing signal.
    pub fn set<I>(&self, items: &[I]) -> Result<()>
    where
        I: AsRef<str>,
    {
        let body = items.iter().map(AsRef::as_ref).collect::<Vec<_>>().join("\n");
        self.store.put_object(&self.bucket, &self.key, body)?;
        info!(bucket = %self.bucket, key = %self.key, items = items.len(), "print signal set");
        Ok(())
    }

    /// The pending item names, or `None` when no signal is present.
    ///
    /// An empty body reads back as no items, so a signal set with a single
    /// empty string is indistinguishable from one set with an empty list.
    pub fn items(&self) -> Result<Option<Vec<String>>> {
        match self.store.get_object(&self.bucket, &self.key) {
            Ok(body) if body.is_empty() => Ok(Some(Vec::new())),
            Ok(body) => Ok(Some(body.split('\n').map(str::to_string).collect())),
            Err(Error::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn delete(&self) -> Result<()> {
        self.store.delete_object(&self.bucket, &self.key)?;
        info!(bucket = %self.bucket, key = %self.key, "print signal cleared");
        Ok(())
    }
}
