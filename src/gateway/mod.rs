//! Remote access gateway
//!
//! The only suspension point of the sync layer. Everything that talks to
//! the records API goes through [`Gateway::request`]; the rest of the crate
//! treats responses as opaque JSON decoded into the entity shapes in
//! [`crate::models`].

#[cfg(feature = "client")]
mod http;

#[cfg(feature = "client")]
pub use http::HttpGateway;

use crate::error::Result;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// HTTP verbs used by the records API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Query string parameters, in order
pub type Query = Vec<(String, String)>;

/// Generic request capability against the records API.
///
/// `path` is relative to the API base (e.g. `activities/a1`). Implementations
/// own no application state.
#[async_trait]
pub trait Gateway: Send + Sync {
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        query: Query,
    ) -> Result<Value>;
}

/// Issue a request and decode the body into `T`.
pub async fn fetch<T: DeserializeOwned>(
    gateway: &dyn Gateway,
    method: Method,
    path: &str,
    body: Option<Value>,
    query: Query,
) -> Result<T> {
    let value = gateway.request(method, path, body, query).await?;
    Ok(serde_json::from_value(value)?)
}

/// Build a query from optional filters, dropping absent ones.
pub fn query_of(params: &[(&str, Option<&str>)]) -> Query {
    params
        .iter()
        .filter_map(|(key, value)| value.map(|v| (key.to_string(), v.to_string())))
        .collect()
}
