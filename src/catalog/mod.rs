pub mod fields;
pub mod model;
mod response;

use std::time::Duration;

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

pub use fields::{CreateFields, CreateForm, UpdateFields, UpdateForm, ValidationError};
pub use model::{Category, Product};

pub const DEFAULT_API_URL: &str = "https://api.escuelajs.co/api/v1/products";

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("invalid catalog URL: {url}")]
    InvalidUrl { url: String },

    #[error("failed to build HTTP client: {source}")]
    HttpClientBuild {
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to setup proxy: {proxy}: {source}")]
    ProxySetup {
        proxy: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("catalog returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("failed to decode catalog response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

/// The remote source of truth for product records.
///
/// Implementations only talk to the catalog; merging results into the table
/// is up to the caller (see [`crate::session::Session`]).
#[allow(async_fn_in_trait)]
pub trait Catalog {
    async fn list(&self) -> Result<Vec<Product>, CatalogError>;

    async fn create(&self, fields: &CreateFields) -> Result<Product, CatalogError>;

    /// Returns the raw JSON object the server answered with, so the caller can
    /// overlay it on the record it already holds.
    async fn update(
        &self,
        id: i64,
        fields: &UpdateFields,
    ) -> Result<Map<String, Value>, CatalogError>;
}

#[derive(Clone, Debug)]
pub struct ClientOptions {
    pub api_url: String,
    pub timeout_seconds: u64,
    pub proxy: Option<String>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            timeout_seconds: 10,
            proxy: None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct HttpCatalog {
    client: reqwest::Client,
    base_url: String,
}

impl HttpCatalog {
    pub fn new(options: &ClientOptions) -> Result<Self, CatalogError> {
        let base_url = options.api_url.trim().trim_end_matches('/').to_string();
        if reqwest::Url::parse(&base_url).is_err() {
            return Err(CatalogError::InvalidUrl {
                url: options.api_url.clone(),
            });
        }

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static(concat!(
                "prodtable/",
                env!("CARGO_PKG_VERSION")
            )),
        );
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/json"),
        );

        let mut builder = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(options.timeout_seconds.max(1)));

        // only an explicitly configured proxy is used, never the environment's
        match options.proxy.as_deref().filter(|p| !p.trim().is_empty()) {
            Some(proxy) => {
                let proxy = reqwest::Proxy::all(proxy).map_err(|e| CatalogError::ProxySetup {
                    proxy: proxy.to_string(),
                    source: e,
                })?;
                builder = builder.proxy(proxy);
            }
            None => builder = builder.no_proxy(),
        }

        let client = builder
            .build()
            .map_err(|e| CatalogError::HttpClientBuild { source: e })?;
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn item_url(&self, id: i64) -> String {
        format!("{}/{id}", self.base_url)
    }

    async fn send(
        &self,
        url: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, CatalogError> {
        request.send().await.map_err(|e| CatalogError::Transport {
            url: url.to_string(),
            source: e,
        })
    }
}

// a malformed record is dropped on its own instead of failing the whole list
fn decode_records(records: Vec<Value>) -> Vec<Product> {
    records
        .into_iter()
        .enumerate()
        .filter_map(|(index, record)| match serde_json::from_value::<Product>(record) {
            Ok(product) => Some(product),
            Err(e) => {
                warn!(index, error = %e, "skipping malformed product record");
                None
            }
        })
        .collect()
}

impl Catalog for HttpCatalog {
    async fn list(&self) -> Result<Vec<Product>, CatalogError> {
        debug!(url = %self.base_url, "listing products");
        let response = self.send(&self.base_url, self.client.get(&self.base_url)).await?;
        let records: Vec<Value> = response::read_json(&self.base_url, response).await?;
        Ok(decode_records(records))
    }

    async fn create(&self, fields: &CreateFields) -> Result<Product, CatalogError> {
        debug!(url = %self.base_url, title = %fields.title, "creating product");
        let request = self.client.post(&self.base_url).json(fields);
        let response = self.send(&self.base_url, request).await?;
        response::read_json(&self.base_url, response).await
    }

    async fn update(
        &self,
        id: i64,
        fields: &UpdateFields,
    ) -> Result<Map<String, Value>, CatalogError> {
        let url = self.item_url(id);
        debug!(url = %url, "updating product");
        let request = self.client.put(&url).json(fields);
        let response = self.send(&url, request).await?;
        response::read_json(&url, response).await
    }
}
