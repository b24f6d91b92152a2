//! Configuration value objects for the records client and the signal store.
//!
//! Keys are read once, up front, into plain structs that are passed to each
//! component's constructor. `from_lookup` accepts any key→value function so
//! tests can inject a fake environment.

use crate::error::{Error, Result};
use crate::http::path_segment;

pub const DEFAULT_API_ROOT: &str = "https://api.airtable.com/v0";
pub const DEFAULT_SECRETS_PORT: u16 = 2773;

/// Settings for `RecordsClient`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordsConfig {
    /// Name of the secret-store parameter holding the API key.
    pub api_key_parameter: String,
    pub base_id: String,
    pub table_name: String,
    /// View filtering records currently on the shopping list.
    pub list_view: String,
    /// View showing every record.
    pub all_view: String,
    pub api_root: String,
}

impl RecordsConfig {
    /// `<api_root>/<base_id>/<table_name>`, with base id and table name
    /// percent-encoded.
    pub fn table_url(&self) -> String {
        format!(
            "{}/{}/{}",
            self.api_root.trim_end_matches('/'),
            path_segment(&self.base_id),
            path_segment(&self.table_name)
        )
    }
}

/// Settings for `SignalStore` and its HTTP object store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalConfig {
    pub bucket: String,
    pub key: String,
    /// Object-store endpoint that already carries the deployment's
    /// authorization (a signing proxy or gateway). Requests sent here are
    /// not signed, so there is no public default.
    pub endpoint: String,
}

/// Settings for the parameter-store secret source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretsConfig {
    pub endpoint: String,
    pub session_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub records: RecordsConfig,
    pub signal: SignalConfig,
    pub secrets: SecretsConfig,
}

impl Config {
    /// Read every setting from process environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read every setting through `lookup`. Required keys that resolve to
    /// `None` fail with `Error::MissingConfig`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| lookup(key).ok_or_else(|| Error::MissingConfig(key.to_string()));

        let records = RecordsConfig {
            api_key_parameter: required("paramNameAirtable")?,
            base_id: required("airtableBaseId")?,
            table_name: required("airtableTableName")?,
            list_view: required("airtableListView")?,
            all_view: required("airtableAllView")?,
            api_root: lookup("airtableApiRoot").unwrap_or_else(|| DEFAULT_API_ROOT.to_string()),
        };

        let signal = SignalConfig {
            bucket: required("printBucketName")?,
            key: required("printListKey")?,
            endpoint: required("printStoreEndpoint")?,
        };

        let port = lookup("PARAMETERS_SECRETS_EXTENSION_HTTP_PORT")
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_SECRETS_PORT);
        let secrets = SecretsConfig {
            endpoint: format!("http://localhost:{port}"),
            session_token: lookup("AWS_SESSION_TOKEN"),
        };

        Ok(Self {
            records,
            signal,
            secrets,
        })
    }
}
