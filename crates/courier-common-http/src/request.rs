//! Request descriptors.
//!
//! A [`RequestDescriptor`] is the normalized form of one request. Every
//! caller-facing request shape maps onto exactly one variant.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Common HTTP header values.
pub mod headers {
    pub const CONTENT_TYPE_JSON: &str = "application/json; charset=utf-8";
    pub const CONTENT_TYPE_FORM: &str = "application/x-www-form-urlencoded";
    pub const CONTENT_TYPE_MULTIPART: &str = "multipart/form-data";
    pub const RETRY_AFTER: &str = "retry-after";
}

/// Ordered string map used for headers and parameters.
pub type FieldMap = BTreeMap<String, String>;

/// Field name used for uploaded files unless overridden.
pub const DEFAULT_FILE_FIELD: &str = "headimg";

/// A file to be sent as one multipart part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    /// Location on disk. Read on every attempt.
    pub path: PathBuf,
    /// File name reported in the part's content disposition.
    pub file_name: String,
    /// Multipart field name.
    pub field_name: String,
    /// Media type of the part.
    pub media_type: String,
}

impl FilePart {
    /// Describe the file at `path` with the default field name and media type.
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            path,
            file_name,
            field_name: DEFAULT_FILE_FIELD.to_string(),
            media_type: headers::CONTENT_TYPE_MULTIPART.to_string(),
        }
    }

    /// Override the multipart field name.
    pub fn with_field_name(mut self, name: impl Into<String>) -> Self {
        self.field_name = name.into();
        self
    }

    /// Override the media type.
    pub fn with_media_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = media_type.into();
        self
    }
}

/// HTTP method used by a descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => f.write_str("GET"),
            Method::Post => f.write_str("POST"),
        }
    }
}

/// Shape class of a descriptor, without its data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    Get,
    GetWithParams,
    PostForm,
    PostFormWithParams,
    PostFormWithHeaders,
    PostFormWithHeadersAndParams,
    PostJson,
    PostJsonWithHeaders,
    UploadFile,
    UploadFileWithParams,
    Download,
}

impl RequestKind {
    /// Short name used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestKind::Get => "get",
            RequestKind::GetWithParams => "get_with_params",
            RequestKind::PostForm => "post_form",
            RequestKind::PostFormWithParams => "post_form_with_params",
            RequestKind::PostFormWithHeaders => "post_form_with_headers",
            RequestKind::PostFormWithHeadersAndParams => "post_form_with_headers_and_params",
            RequestKind::PostJson => "post_json",
            RequestKind::PostJsonWithHeaders => "post_json_with_headers",
            RequestKind::UploadFile => "upload_file",
            RequestKind::UploadFileWithParams => "upload_file_with_params",
            RequestKind::Download => "download",
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized description of one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestDescriptor {
    Get { url: String },
    GetWithParams { url: String, params: FieldMap },
    PostForm { url: String },
    PostFormWithParams { url: String, params: FieldMap },
    PostFormWithHeaders { url: String, headers: FieldMap },
    PostFormWithHeadersAndParams { url: String, headers: FieldMap, params: FieldMap },
    PostJson { url: String, body: String },
    PostJsonWithHeaders { url: String, headers: FieldMap, body: String },
    UploadFile { url: String, file: FilePart },
    UploadFileWithParams { url: String, file: FilePart, params: FieldMap },
    Download { url: String },
}

impl RequestDescriptor {
    /// Target address.
    pub fn url(&self) -> &str {
        match self {
            RequestDescriptor::Get { url }
            | RequestDescriptor::GetWithParams { url, .. }
            | RequestDescriptor::PostForm { url }
            | RequestDescriptor::PostFormWithParams { url, .. }
            | RequestDescriptor::PostFormWithHeaders { url, .. }
            | RequestDescriptor::PostFormWithHeadersAndParams { url, .. }
            | RequestDescriptor::PostJson { url, .. }
            | RequestDescriptor::PostJsonWithHeaders { url, .. }
            | RequestDescriptor::UploadFile { url, .. }
            | RequestDescriptor::UploadFileWithParams { url, .. }
            | RequestDescriptor::Download { url } => url,
        }
    }

    /// Shape class.
    pub fn kind(&self) -> RequestKind {
        match self {
            RequestDescriptor::Get { .. } => RequestKind::Get,
            RequestDescriptor::GetWithParams { .. } => RequestKind::GetWithParams,
            RequestDescriptor::PostForm { .. } => RequestKind::PostForm,
            RequestDescriptor::PostFormWithParams { .. } => RequestKind::PostFormWithParams,
            RequestDescriptor::PostFormWithHeaders { .. } => RequestKind::PostFormWithHeaders,
            RequestDescriptor::PostFormWithHeadersAndParams { .. } => {
                RequestKind::PostFormWithHeadersAndParams
            }
            RequestDescriptor::PostJson { .. } => RequestKind::PostJson,
            RequestDescriptor::PostJsonWithHeaders { .. } => RequestKind::PostJsonWithHeaders,
            RequestDescriptor::UploadFile { .. } => RequestKind::UploadFile,
            RequestDescriptor::UploadFileWithParams { .. } => RequestKind::UploadFileWithParams,
            RequestDescriptor::Download { .. } => RequestKind::Download,
        }
    }

    /// HTTP method.
    pub fn method(&self) -> Method {
        match self {
            RequestDescriptor::Get { .. }
            | RequestDescriptor::GetWithParams { .. }
            | RequestDescriptor::Download { .. } => Method::Get,
            _ => Method::Post,
        }
    }

    /// Extra request headers, if this shape carries any.
    pub fn headers(&self) -> Option<&FieldMap> {
        match self {
            RequestDescriptor::PostFormWithHeaders { headers, .. }
            | RequestDescriptor::PostFormWithHeadersAndParams { headers, .. }
            | RequestDescriptor::PostJsonWithHeaders { headers, .. } => Some(headers),
            _ => None,
        }
    }

    /// Query, form or multipart parameters, if this shape carries any.
    pub fn params(&self) -> Option<&FieldMap> {
        match self {
            RequestDescriptor::GetWithParams { params, .. }
            | RequestDescriptor::PostFormWithParams { params, .. }
            | RequestDescriptor::PostFormWithHeadersAndParams { params, .. }
            | RequestDescriptor::UploadFileWithParams { params, .. } => Some(params),
            _ => None,
        }
    }

    /// Raw JSON body, for JSON shapes.
    pub fn json_body(&self) -> Option<&str> {
        match self {
            RequestDescriptor::PostJson { body, .. }
            | RequestDescriptor::PostJsonWithHeaders { body, .. } => Some(body),
            _ => None,
        }
    }

    /// File part, for upload shapes.
    pub fn file(&self) -> Option<&FilePart> {
        match self {
            RequestDescriptor::UploadFile { file, .. }
            | RequestDescriptor::UploadFileWithParams { file, .. } => Some(file),
            _ => None,
        }
    }
}
