//! HTTP transport for Courier.
//!
//! This crate owns the normalized request shapes ([`RequestDescriptor`]), the
//! [`Transport`] capability that executes them, and a `reqwest`-backed
//! implementation ([`HttpTransport`]).

pub mod client;
pub mod request;
pub mod response;
pub mod transport;

pub use client::{build_client, check_response, HttpConfig, HttpTransport};
pub use request::{headers, FieldMap, FilePart, Method, RequestDescriptor, RequestKind};
pub use response::{parse_json, ByteStream, Payload, Response, ResponseError};
pub use transport::{Transport, TransportError};
