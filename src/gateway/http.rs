//! reqwest-backed gateway for the records REST API

use super::{Gateway, Method, Query};
use crate::config::ClientConfig;
use crate::error::{server_message, ClientError, Result};
use crate::session::{SessionStorage, TOKEN_KEY};
use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// HTTP gateway
///
/// # Example
///
/// ```rust,no_run
/// use roster_sync::{ClientConfig, HttpGateway, Gateway, Method};
///
/// # async fn example() -> roster_sync::Result<()> {
/// let gateway = HttpGateway::new(&ClientConfig::default())?;
/// let groups = gateway.request(Method::Get, "groups", None, Vec::new()).await?;
/// # Ok(())
/// # }
/// ```
pub struct HttpGateway {
    base_url: String,
    client: Client,
    /// When set, the persisted token is attached as a bearer credential
    session: Option<Arc<dyn SessionStorage>>,
}

impl HttpGateway {
    /// Create an anonymous gateway
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            base_url: config.api_url.trim_end_matches('/').to_string(),
            client,
            session: None,
        })
    }

    /// Attach `Authorization: Bearer <token>` from durable session storage.
    ///
    /// The token is read per request so a login or logout takes effect on
    /// the very next call.
    pub fn with_session(mut self, storage: Arc<dyn SessionStorage>) -> Self {
        self.session = Some(storage);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn bearer(&self) -> Option<String> {
        let storage = self.session.as_ref()?;
        match storage.get(TOKEN_KEY) {
            Ok(token) => token,
            Err(e) => {
                tracing::warn!("Could not read session token: {}", e);
                None
            }
        }
    }
}

#[async_trait]
impl Gateway for HttpGateway {
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        query: Query,
    ) -> Result<Value> {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));

        let mut request = match method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
            Method::Put => self.client.put(&url),
            Method::Delete => self.client.delete(&url),
        };
        if !query.is_empty() {
            request = request.query(&query);
        }
        if let Some(ref body) = body {
            request = request
                .header(header::CONTENT_TYPE, "application/json")
                .json(body);
        }
        if let Some(token) = self.bearer() {
            request = request.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        tracing::debug!(%method, %url, "records api request");
        let response = request.send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(ClientError::NotFound(path.to_string()));
        }

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let text = response.text().await.unwrap_or_default();
            return Err(ClientError::Server {
                status,
                message: server_message(&text),
            });
        }

        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }
}
