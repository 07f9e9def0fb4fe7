//! Typed client for the product API.

use axum::http::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

use crate::client::idempotency::IdempotencyKeyManager;
use crate::client::resilient::{ClientError, RequestSpec, ResilienceConfig, ResilientClient};
use crate::http::request::X_REQUEST_ID;
use crate::products::types::NewProduct;

/// Final reply of a call, after any retries.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiReply {
    pub status: StatusCode,
    /// `X-Request-Id` echoed by the server.
    pub request_id: Option<String>,
    /// JSON body; non-JSON bodies are kept as a string, empty ones as null.
    pub body: Value,
}

impl ApiReply {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Deserialize the body into `T`.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.body.clone())
    }
}

pub struct ProductsClient {
    base_url: Url,
    client: ResilientClient,
    keys: IdempotencyKeyManager,
    config: ResilienceConfig,
}

impl ProductsClient {
    pub fn new(
        base_url: &str,
        client: ResilientClient,
        keys: IdempotencyKeyManager,
        config: ResilienceConfig,
    ) -> Result<Self, ClientError> {
        let mut base_url = Url::parse(base_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self {
            base_url,
            client,
            keys,
            config,
        })
    }

    /// Create a product. Identical payloads reuse one idempotency key, so
    /// resubmitting never creates a second product.
    pub async fn create(&self, product: &NewProduct) -> Result<ApiReply, ClientError> {
        let key = self.keys.key_for(product)?;
        let config = ResilienceConfig {
            idempotency_key: Some(key),
            ..self.config.clone()
        };
        let spec = RequestSpec::post_json(product)?;
        self.execute("products", &spec, &config).await
    }

    pub async fn list(&self) -> Result<ApiReply, ClientError> {
        self.execute("products", &RequestSpec::get(), &self.config).await
    }

    pub async fn get(&self, id: &str) -> Result<ApiReply, ClientError> {
        self.execute(&format!("products/{id}"), &RequestSpec::get(), &self.config)
            .await
    }

    pub async fn health(&self) -> Result<ApiReply, ClientError> {
        self.execute("health", &RequestSpec::get(), &self.config).await
    }

    async fn execute(
        &self,
        path: &str,
        spec: &RequestSpec,
        config: &ResilienceConfig,
    ) -> Result<ApiReply, ClientError> {
        let url = self.base_url.join(path)?;
        let response = self.client.send(url.as_str(), spec, config).await?;

        let status = response.status();
        let request_id = response
            .headers()
            .get(X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().await.map_err(ClientError::Decode)?;

        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };

        Ok(ApiReply {
            status,
            request_id,
            body,
        })
    }
}
