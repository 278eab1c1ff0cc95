//! Cloud append-blob store over the storage REST protocol.
//!
//! # Responsibilities
//! - Parse `Key=Value;...` storage connection strings
//! - Create containers and append blobs if they do not exist
//! - Append blocks with the service's atomic append-block primitive
//!
//! # Design Decisions
//! - Authorization via shared access signature only; the signature's query
//!   string is appended to every request URL
//! - "Already exists" conflicts on the ensure calls count as success
//! - One request per append; the service places each block at the tail as a unit

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use url::Url;

use crate::storage::store::{AppendStore, StoreError};
use crate::storage::target::RemoteAppendTarget;

/// Storage service API version sent with every request.
pub const API_VERSION: &str = "2021-12-02";

const ERROR_CODE_HEADER: &str = "x-ms-error-code";

/// Parsed storage connection string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobConnection {
    /// Blob service endpoint, e.g. `https://account.blob.core.windows.net/`.
    pub endpoint: Url,
    /// Shared access signature without the leading `?`.
    pub sas: Option<String>,
}

impl FromStr for BlobConnection {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut pairs: HashMap<String, &str> = HashMap::new();
        for part in s.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, value) = part
                .split_once('=')
                .ok_or_else(|| StoreError::InvalidConnection(format!("segment '{}' has no '='", part)))?;
            pairs.insert(key.trim().to_ascii_lowercase(), value.trim());
        }

        let endpoint = match pairs.get("blobendpoint") {
            Some(endpoint) => endpoint.to_string(),
            None => {
                let account = pairs.get("accountname").ok_or_else(|| {
                    StoreError::InvalidConnection("either BlobEndpoint or AccountName is required".to_string())
                })?;
                let protocol = pairs.get("defaultendpointsprotocol").copied().unwrap_or("https");
                let suffix = pairs.get("endpointsuffix").copied().unwrap_or("core.windows.net");
                format!("{}://{}.blob.{}", protocol, account, suffix)
            }
        };
        let endpoint = Url::parse(&endpoint)
            .map_err(|e| StoreError::InvalidConnection(format!("invalid endpoint '{}': {}", endpoint, e)))?;

        let sas = pairs
            .get("sharedaccesssignature")
            .map(|sas| sas.trim_start_matches('?').to_string())
            .filter(|sas| !sas.is_empty());

        if sas.is_none() && pairs.contains_key("accountkey") {
            return Err(StoreError::InvalidConnection(
                "shared key authorization is not supported, provide a SharedAccessSignature".to_string(),
            ));
        }

        Ok(Self { endpoint, sas })
    }
}

/// Append store talking to a blob service endpoint.
#[derive(Debug, Clone)]
pub struct BlobStore {
    client: Client,
    connection: BlobConnection,
}

impl BlobStore {
    pub fn new(connection: BlobConnection, timeout: Duration) -> Result<Self, StoreError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, connection })
    }

    pub fn from_connection_string(connection: &str, timeout: Duration) -> Result<Self, StoreError> {
        Self::new(connection.parse()?, timeout)
    }

    fn resource_url(&self, segments: &[&str], params: &[(&str, &str)]) -> Result<Url, StoreError> {
        let mut url = self.connection.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| StoreError::InvalidConnection("endpoint cannot be a base URL".to_string()))?
            .pop_if_empty()
            .extend(segments);

        let mut query: Vec<String> = params.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        if let Some(sas) = &self.connection.sas {
            query.push(sas.clone());
        }
        if query.is_empty() {
            url.set_query(None);
        } else {
            url.set_query(Some(&query.join("&")));
        }
        Ok(url)
    }

    fn request(&self, url: Url) -> RequestBuilder {
        self.client
            .request(Method::PUT, url)
            .header("x-ms-version", API_VERSION)
            .header("x-ms-date", chrono::Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string())
    }
}

fn error_code(response: &Response) -> Option<String> {
    response
        .headers()
        .get(ERROR_CODE_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Accept `201 Created`, or `409 Conflict` carrying `already_exists_code`.
fn ensure_created(response: Response, already_exists_code: &str) -> Result<(), StoreError> {
    let status = response.status();
    if status == StatusCode::CREATED {
        return Ok(());
    }
    let code = error_code(&response);
    if status == StatusCode::CONFLICT && code.as_deref() == Some(already_exists_code) {
        return Ok(());
    }
    Err(StoreError::Status {
        status: status.as_u16(),
        code,
    })
}

#[async_trait]
impl AppendStore for BlobStore {
    async fn create_container_if_not_exists(&self, container: &str) -> Result<(), StoreError> {
        let url = self.resource_url(&[container], &[("restype", "container")])?;
        let response = self.request(url).body(Vec::<u8>::new()).send().await?;
        ensure_created(response, "ContainerAlreadyExists")
    }

    async fn create_append_object_if_not_exists(
        &self,
        target: &RemoteAppendTarget,
    ) -> Result<(), StoreError> {
        let url = self.resource_url(&[target.container_id.as_str(), target.object_id.as_str()], &[])?;
        let response = self
            .request(url)
            .header("x-ms-blob-type", "AppendBlob")
            .header("If-None-Match", "*")
            .header("Content-Type", "text/plain; charset=utf-8")
            .body(Vec::<u8>::new())
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound(format!("container '{}'", target.container_id)));
        }
        ensure_created(response, "BlobAlreadyExists")
    }

    async fn append_block(&self, target: &RemoteAppendTarget, block: Vec<u8>) -> Result<(), StoreError> {
        let url = self.resource_url(&[target.container_id.as_str(), target.object_id.as_str()], &[("comp", "appendblock")])?;
        let response = self.request(url).body(block).send().await?;

        match response.status() {
            StatusCode::CREATED => Ok(()),
            StatusCode::NOT_FOUND => Err(StoreError::NotFound(format!("object '{}'", target))),
            status => Err(StoreError::Status {
                status: status.as_u16(),
                code: error_code(&response),
            }),
        }
    }

    fn kind(&self) -> &'static str {
        "blob"
    }
}
