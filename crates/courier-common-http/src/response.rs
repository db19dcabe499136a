//! HTTP response types.

use bytes::{Bytes, BytesMut};
use futures_util::{Stream, StreamExt};
use serde::de::DeserializeOwned;
use std::fmt;
use std::pin::Pin;

use crate::request::FieldMap;
use crate::transport::TransportError;

/// Streamed response body.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, TransportError>> + Send>>;

/// Response body.
pub enum Payload {
    /// Fully buffered body.
    Body(Bytes),
    /// Body still arriving from the network (downloads).
    Stream(ByteStream),
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::Body(bytes) => f.debug_tuple("Body").field(&bytes.len()).finish(),
            Payload::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// A successful response.
#[derive(Debug)]
pub struct Response {
    /// HTTP status code.
    pub status: u16,
    /// Response headers, lowercase names.
    pub headers: FieldMap,
    /// Response body.
    pub payload: Payload,
}

impl Response {
    /// A buffered 200 response, mostly for stubs.
    pub fn ok(body: impl Into<Bytes>) -> Self {
        Self {
            status: 200,
            headers: FieldMap::new(),
            payload: Payload::Body(body.into()),
        }
    }

    /// A 200 response whose body is streamed.
    pub fn streaming(stream: ByteStream) -> Self {
        Self {
            status: 200,
            headers: FieldMap::new(),
            payload: Payload::Stream(stream),
        }
    }

    /// Whether the body is still a stream.
    pub fn is_stream(&self) -> bool {
        matches!(self.payload, Payload::Stream(_))
    }

    /// Collect the body into memory.
    pub async fn bytes(self) -> Result<Bytes, ResponseError> {
        match self.payload {
            Payload::Body(bytes) => Ok(bytes),
            Payload::Stream(mut stream) => {
                let mut buf = BytesMut::new();
                while let Some(chunk) = stream.next().await {
                    buf.extend_from_slice(&chunk.map_err(ResponseError::Read)?);
                }
                Ok(buf.freeze())
            }
        }
    }

    /// Collect the body as UTF-8 text, replacing invalid sequences.
    pub async fn text(self) -> Result<String, ResponseError> {
        let bytes = self.bytes().await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Decode the body as JSON.
    pub async fn json<T: DeserializeOwned>(self) -> Result<T, ResponseError> {
        parse_json(self).await
    }

    /// Turn the body into a stream regardless of how it was received.
    pub fn into_stream(self) -> ByteStream {
        match self.payload {
            Payload::Stream(stream) => stream,
            Payload::Body(bytes) => Box::pin(futures_util::stream::once(async move { Ok(bytes) })),
        }
    }
}

/// Parse a JSON response.
pub async fn parse_json<T: DeserializeOwned>(response: Response) -> Result<T, ResponseError> {
    let status = response.status;
    let bytes = response.bytes().await?;

    serde_json::from_slice(&bytes).map_err(|e| ResponseError::Parse {
        status,
        body: String::from_utf8_lossy(&bytes).to_string(),
        source: e,
    })
}

/// Response parsing errors.
#[derive(Debug, thiserror::Error)]
pub enum ResponseError {
    #[error("failed to read response body: {0}")]
    Read(#[source] TransportError),

    #[error("failed to parse JSON (status {status}): {source}")]
    Parse {
        status: u16,
        body: String,
        #[source]
        source: serde_json::Error,
    },
}
