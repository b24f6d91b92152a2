//! Secret retrieval for the tabular API key.
//!
//! `ParameterStoreClient` talks to the AWS Parameters and Secrets extension,
//! a local HTTP endpoint that returns decrypted parameter values. Any failure
//! is propagated unchanged to whoever is constructing a client.

use serde::Deserialize;
use tracing::debug;

use crate::config::SecretsConfig;
use crate::error::{Error, Result};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::transport::Transport;

const TOKEN_HEADER: &str = "X-Aws-Parameters-Secrets-Token";

/// Anything that can turn a parameter name into its decrypted value.
pub trait SecretSource {
    fn get_secret(&self, name: &str) -> Result<String>;
}

impl<S: SecretSource + ?Sized> SecretSource for &S {
    fn get_secret(&self, name: &str) -> Result<String> {
        (**self).get_secret(name)
    }
}

#[derive(Debug, Deserialize)]
struct ParameterEnvelope {
    #[serde(rename = "Parameter")]
    parameter: Parameter,
}

#[derive(Debug, Deserialize)]
struct Parameter {
    #[serde(rename = "Value")]
    value: String,
}

/// Parameter-store lookups over HTTP.
#[derive(Debug, Clone)]
pub struct ParameterStoreClient<T> {
    endpoint: String,
    session_token: Option<String>,
    transport: T,
}

impl<T: Transport> ParameterStoreClient<T> {
    pub fn new(config: &SecretsConfig, transport: T) -> Self {
        Self {
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            session_token: config.session_token.clone(),
            transport,
        }
    }

    pub fn build_get_parameter(&self, name: &str) -> HttpRequest {
        let req = HttpRequest::new(
            HttpMethod::Get,
            format!("{}/systemsmanager/parameters/get", self.endpoint),
        )
        .with_query("name", name)
        .with_query("withDecryption", "true");
        match &self.session_token {
            Some(token) => req.with_header(TOKEN_HEADER, token),
            None => req,
        }
    }

    pub fn parse_get_parameter(&self, name: &str, response: HttpResponse) -> Result<String> {
        if !response.is_success() {
            return Err(Error::Secret {
                name: name.to_string(),
                status: response.status,
                body: response.body,
            });
        }
        let envelope: ParameterEnvelope = serde_json::from_str(&response.body)
            .map_err(|e| Error::Deserialization(e.to_string()))?;
        Ok(envelope.parameter.value)
    }
}

impl<T: Transport> SecretSource for ParameterStoreClient<T> {
    fn get_secret(&self, name: &str) -> Result<String> {
        debug!(parameter = name, "fetching secret");
        let response = self.transport.execute(&self.build_get_parameter(name))?;
        self.parse_get_parameter(name, response)
    }
}
