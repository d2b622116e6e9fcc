//! Helpers shared by the request translators.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use gateway_core::{File, GatewayError, GatewayResult};
use serde_json::Value;

/// Generate a response id with a protocol prefix
#[must_use]
pub fn new_id(prefix: &str) -> String {
    format!("{prefix}_{}", uuid::Uuid::new_v4().simple())
}

/// Decode base64 file content
pub(crate) fn decode_base64(data: &str, field: &str) -> GatewayResult<Vec<u8>> {
    STANDARD.decode(data.trim()).map_err(|e| {
        GatewayError::translation(
            format!("invalid base64 data: {e}"),
            Some(field),
            "invalid_file_data",
        )
    })
}

/// Encode file content as base64
pub(crate) fn encode_base64(content: &[u8]) -> String {
    STANDARD.encode(content)
}

/// Parse a `data:` URL into a file.
///
/// Remote URLs are rejected: the gateway does not fetch on behalf of clients.
pub(crate) fn file_from_url(url: &str, name: Option<String>, field: &str) -> GatewayResult<File> {
    if url.starts_with("http://") || url.starts_with("https://") {
        return Err(GatewayError::translation(
            "remote file urls are not supported, send the content inline",
            Some(field),
            "unsupported_file_url",
        ));
    }

    let rest = url.strip_prefix("data:").ok_or_else(|| {
        GatewayError::translation("file url must be a data url", Some(field), "invalid_file_url")
    })?;
    let (header, data) = rest.split_once(',').ok_or_else(|| {
        GatewayError::translation("malformed data url", Some(field), "invalid_file_url")
    })?;
    let content_type = header.strip_suffix(";base64").ok_or_else(|| {
        GatewayError::translation(
            "only base64 data urls are supported",
            Some(field),
            "invalid_file_url",
        )
    })?;

    Ok(File {
        name,
        content_type: if content_type.is_empty() {
            "application/octet-stream".to_string()
        } else {
            content_type.to_string()
        },
        content: decode_base64(data, field)?,
    })
}

/// Render a file as a `data:` URL
pub(crate) fn data_url(file: &File) -> String {
    format!("data:{};base64,{}", file.content_type, encode_base64(&file.content))
}

/// Parse tool arguments into a JSON value.
///
/// Empty arguments become an empty object; text that is not JSON is kept as
/// a string so nothing the model produced is lost.
pub(crate) fn arguments_value(arguments: &str) -> Value {
    if arguments.trim().is_empty() {
        return Value::Object(serde_json::Map::new());
    }
    serde_json::from_str(arguments).unwrap_or_else(|_| Value::String(arguments.to_string()))
}

/// Check that client-supplied tool arguments are JSON and return them as text
pub(crate) fn arguments_text(value: &Value, field: &str) -> GatewayResult<String> {
    match value {
        Value::String(text) => {
            if !text.trim().is_empty() {
                serde_json::from_str::<Value>(text).map_err(|e| {
                    GatewayError::translation(
                        format!("tool call arguments are not valid JSON: {e}"),
                        Some(field),
                        "invalid_tool_arguments",
                    )
                })?;
            }
            Ok(text.clone())
        }
        other => Ok(other.to_string()),
    }
}

/// Map a request deserialization error to a translation error
pub fn invalid_request(err: &serde_json::Error) -> GatewayError {
    GatewayError::translation(format!("invalid request body: {err}"), None, "invalid_request")
}
