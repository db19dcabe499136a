//! `reqwest`-backed transport.

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, ClientBuilder};
use std::time::Duration;

use crate::request::{headers, FieldMap, FilePart, RequestDescriptor};
use crate::response::{Payload, Response};
use crate::transport::{Transport, TransportError};

/// HTTP client configuration.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Connection timeout.
    pub connect_timeout: Duration,
    /// Request timeout.
    pub request_timeout: Duration,
    /// User agent string.
    pub user_agent: String,
    /// Maximum connections per host.
    pub pool_max_idle_per_host: usize,
    /// Enable gzip decompression.
    pub gzip: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            user_agent: format!("courier/{}", env!("CARGO_PKG_VERSION")),
            pool_max_idle_per_host: 10,
            gzip: true,
        }
    }
}

/// Build a configured HTTP client.
pub fn build_client(config: HttpConfig) -> Result<Client, TransportError> {
    let mut builder = ClientBuilder::new()
        .connect_timeout(config.connect_timeout)
        .timeout(config.request_timeout)
        .user_agent(&config.user_agent)
        .pool_max_idle_per_host(config.pool_max_idle_per_host);

    if config.gzip {
        builder = builder.gzip(true);
    }

    builder.build().map_err(TransportError::ClientBuild)
}

/// Check response status and convert errors.
pub async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, TransportError> {
    let status = response.status();

    if status.is_success() {
        return Ok(response);
    }

    if status.as_u16() == 429 {
        let retry_after = response
            .headers()
            .get(headers::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs);

        return Err(TransportError::RateLimited { retry_after });
    }

    let body = response.text().await.unwrap_or_default();

    if status.is_server_error() {
        Err(TransportError::ServerError {
            status: status.as_u16(),
            body,
        })
    } else {
        Err(TransportError::ClientError {
            status: status.as_u16(),
            body,
        })
    }
}

/// Transport that performs real HTTP requests.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    inner: Client,
}

impl HttpTransport {
    /// Create a transport with default config.
    pub fn new() -> Result<Self, TransportError> {
        Self::with_config(HttpConfig::default())
    }

    /// Create a transport with custom config.
    pub fn with_config(config: HttpConfig) -> Result<Self, TransportError> {
        let inner = build_client(config)?;
        Ok(Self { inner })
    }

    /// Get the inner reqwest client.
    pub fn inner(&self) -> &Client {
        &self.inner
    }

    fn request(&self, descriptor: &RequestDescriptor) -> reqwest::RequestBuilder {
        match descriptor.method() {
            crate::request::Method::Get => self.inner.get(descriptor.url()),
            crate::request::Method::Post => self.inner.post(descriptor.url()),
        }
    }

    async fn build(&self, descriptor: &RequestDescriptor) -> Result<reqwest::RequestBuilder, TransportError> {
        let mut request = self.request(descriptor);

        if let Some(extra) = descriptor.headers() {
            for (name, value) in extra {
                let (name, value) = header_pair(name, value)?;
                request = request.header(name, value);
            }
        }

        let request = match descriptor {
            RequestDescriptor::Get { .. } | RequestDescriptor::Download { .. } => request,
            RequestDescriptor::GetWithParams { params, .. } => request.query(params),
            RequestDescriptor::PostForm { .. } | RequestDescriptor::PostFormWithHeaders { .. } => {
                request.header(CONTENT_TYPE, headers::CONTENT_TYPE_FORM)
            }
            RequestDescriptor::PostFormWithParams { params, .. }
            | RequestDescriptor::PostFormWithHeadersAndParams { params, .. } => request.form(params),
            RequestDescriptor::PostJson { body, .. } | RequestDescriptor::PostJsonWithHeaders { body, .. } => {
                request
                    .header(CONTENT_TYPE, headers::CONTENT_TYPE_JSON)
                    .body(body.clone())
            }
            RequestDescriptor::UploadFile { file, .. } => {
                request.multipart(multipart_form(file, None).await?)
            }
            RequestDescriptor::UploadFileWithParams { file, params, .. } => {
                request.multipart(multipart_form(file, Some(params)).await?)
            }
        };

        Ok(request)
    }
}

fn header_pair(name: &str, value: &str) -> Result<(HeaderName, HeaderValue), TransportError> {
    let invalid = || TransportError::InvalidHeader {
        name: name.to_string(),
    };
    let header_name = HeaderName::try_from(name).map_err(|_| invalid())?;
    let header_value = HeaderValue::try_from(value).map_err(|_| invalid())?;
    Ok((header_name, header_value))
}

async fn multipart_form(file: &FilePart, params: Option<&FieldMap>) -> Result<Form, TransportError> {
    let contents = tokio::fs::read(&file.path)
        .await
        .map_err(|source| TransportError::File {
            path: file.path.clone(),
            source,
        })?;

    let part = Part::bytes(contents)
        .file_name(file.file_name.clone())
        .mime_str(&file.media_type)
        .map_err(TransportError::Request)?;

    let mut form = Form::new();
    for (name, value) in params.into_iter().flatten() {
        form = form.text(name.clone(), value.clone());
    }
    Ok(form.part(file.field_name.clone(), part))
}

fn collect_headers(response: &reqwest::Response) -> FieldMap {
    response
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect()
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, descriptor: &RequestDescriptor) -> Result<Response, TransportError> {
        let method = descriptor.method();
        let url = descriptor.url();
        tracing::debug!("Making {} request to: {}", method, url);

        let response = self
            .build(descriptor)
            .await?
            .send()
            .await
            .map_err(TransportError::from)?;
        let response = check_response(response).await?;

        let status = response.status().as_u16();
        let headers = collect_headers(&response);
        tracing::debug!("{} response: {} {}", method, status, url);

        let payload = match descriptor {
            RequestDescriptor::Download { .. } => Payload::Stream(Box::pin(
                response.bytes_stream().map(|chunk| chunk.map_err(TransportError::from)),
            )),
            _ => Payload::Body(response.bytes().await.map_err(TransportError::from)?),
        };

        Ok(Response {
            status,
            headers,
            payload,
        })
    }
}
