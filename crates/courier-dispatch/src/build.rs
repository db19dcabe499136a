//! Descriptor builders.
//!
//! Each function turns caller arguments into exactly one
//! [`RequestDescriptor`]. Empty maps are treated as absent, so
//! `get_with_params(url, Some(&FieldMap::new()))` builds the same descriptor
//! as `get(url)`.

use courier_common_http::{FieldMap, FilePart, RequestDescriptor};
use std::path::Path;

use crate::error::Malformed;

/// Result of building a descriptor.
pub type BuildResult = Result<RequestDescriptor, Malformed>;

fn present(map: Option<&FieldMap>) -> Option<&FieldMap> {
    map.filter(|m| !m.is_empty())
}

fn target(url: &str) -> Result<String, Malformed> {
    if url.is_empty() {
        return Err(Malformed::EmptyUrl);
    }
    Ok(url.to_string())
}

/// Plain GET.
pub fn get(url: &str) -> BuildResult {
    Ok(RequestDescriptor::Get { url: target(url)? })
}

/// GET with a query mapping.
pub fn get_with_params(url: &str, params: Option<&FieldMap>) -> BuildResult {
    let url = target(url)?;
    Ok(match present(params) {
        Some(params) => RequestDescriptor::GetWithParams {
            url,
            params: params.clone(),
        },
        None => RequestDescriptor::Get { url },
    })
}

/// Bare form POST.
pub fn post_form(url: &str) -> BuildResult {
    Ok(RequestDescriptor::PostForm { url: target(url)? })
}

/// Form POST with a body mapping.
pub fn post_form_with_params(url: &str, params: Option<&FieldMap>) -> BuildResult {
    post_form_with_headers_and_params(url, None, params)
}

/// Form POST with headers and a body mapping.
///
/// All four combinations of present and absent maps are distinct arms.
pub fn post_form_with_headers_and_params(
    url: &str,
    headers: Option<&FieldMap>,
    params: Option<&FieldMap>,
) -> BuildResult {
    let url = target(url)?;
    Ok(match (present(headers), present(params)) {
        (Some(headers), Some(params)) => RequestDescriptor::PostFormWithHeadersAndParams {
            url,
            headers: headers.clone(),
            params: params.clone(),
        },
        (Some(headers), None) => RequestDescriptor::PostFormWithHeaders {
            url,
            headers: headers.clone(),
        },
        (None, Some(params)) => RequestDescriptor::PostFormWithParams {
            url,
            params: params.clone(),
        },
        (None, None) => RequestDescriptor::PostForm { url },
    })
}

/// JSON POST. An empty body is rejected before the URL is looked at.
pub fn post_json(url: &str, body: &str) -> BuildResult {
    post_json_with_headers(url, None, body)
}

/// JSON POST with extra headers.
pub fn post_json_with_headers(url: &str, headers: Option<&FieldMap>, body: &str) -> BuildResult {
    if body.is_empty() {
        return Err(Malformed::EmptyJsonBody);
    }
    let url = target(url)?;
    let body = body.to_string();
    Ok(match present(headers) {
        Some(headers) => RequestDescriptor::PostJsonWithHeaders {
            url,
            headers: headers.clone(),
            body,
        },
        None => RequestDescriptor::PostJson { url, body },
    })
}

/// Streamed download.
pub fn download(url: &str) -> BuildResult {
    Ok(RequestDescriptor::Download { url: target(url)? })
}

/// Multipart upload of one file under the `headimg` field.
pub fn upload_single_file(url: &str, path: impl AsRef<Path>) -> BuildResult {
    upload_with_params(url, path, None)
}

/// Multipart upload of one file plus text fields.
pub fn upload_with_params(url: &str, path: impl AsRef<Path>, params: Option<&FieldMap>) -> BuildResult {
    let url = target(url)?;
    let file = FilePart::new(path);
    Ok(match present(params) {
        Some(params) => RequestDescriptor::UploadFileWithParams {
            url,
            file,
            params: params.clone(),
        },
        None => RequestDescriptor::UploadFile { url, file },
    })
}

/// Apply the builder rules to a descriptor built elsewhere.
///
/// Empty maps collapse to the smaller shape, an empty URL or JSON body is
/// rejected the same way the builders reject it.
pub fn normalize(descriptor: RequestDescriptor) -> BuildResult {
    match descriptor {
        RequestDescriptor::Get { url } => get(&url),
        RequestDescriptor::GetWithParams { url, params } => get_with_params(&url, Some(&params)),
        RequestDescriptor::PostForm { url } => post_form(&url),
        RequestDescriptor::PostFormWithParams { url, params } => post_form_with_params(&url, Some(&params)),
        RequestDescriptor::PostFormWithHeaders { url, headers } => {
            post_form_with_headers_and_params(&url, Some(&headers), None)
        }
        RequestDescriptor::PostFormWithHeadersAndParams { url, headers, params } => {
            post_form_with_headers_and_params(&url, Some(&headers), Some(&params))
        }
        RequestDescriptor::PostJson { url, body } => post_json(&url, &body),
        RequestDescriptor::PostJsonWithHeaders { url, headers, body } => {
            post_json_with_headers(&url, Some(&headers), &body)
        }
        RequestDescriptor::UploadFile { url, file } => {
            target(&url)?;
            Ok(RequestDescriptor::UploadFile { url, file })
        }
        RequestDescriptor::UploadFileWithParams { url, file, params } => {
            target(&url)?;
            Ok(if params.is_empty() {
                RequestDescriptor::UploadFile { url, file }
            } else {
                RequestDescriptor::UploadFileWithParams { url, file, params }
            })
        }
        RequestDescriptor::Download { url } => download(&url),
    }
}
