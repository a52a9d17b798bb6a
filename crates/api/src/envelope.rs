//! The `{"status": "success", "data": ...}` response envelope.
//!
//! Every Survox endpoint wraps its payload in this envelope. A response is
//! only accepted when the HTTP status is 2xx, the body is a JSON object,
//! `status` is exactly `"success"` and a `data` key is present. Anything
//! else fails closed with the raw exchange attached.

use serde_json::Value;

use crate::error::{Error, Method, RequestFailure};

/// Value of the `status` key on success.
pub const STATUS_SUCCESS: &str = "success";

/// Converts a raw response into its `data` payload or a request error.
pub fn check_response(method: Method, url: &str, status: u16, body: &str) -> Result<Value, Error> {
    if !(200..300).contains(&status) {
        return Err(request_error(method, url, status, body));
    }
    unwrap_envelope(body).ok_or_else(|| {
        Error::RequestFailed(Box::new(RequestFailure {
            method,
            url: url.to_string(),
            status,
            body: body.to_string(),
        }))
    })
}

/// Builds the error for a rejected exchange: `NotFound` for 404,
/// `RequestFailed` for everything else.
pub(crate) fn request_error(method: Method, url: &str, status: u16, body: &str) -> Error {
    let failure = Box::new(RequestFailure {
        method,
        url: url.to_string(),
        status,
        body: body.to_string(),
    });
    if status == 404 {
        Error::NotFound(failure)
    } else {
        Error::RequestFailed(failure)
    }
}

/// Extracts `data` from a success envelope, ignoring the HTTP status.
///
/// Returns `None` for unparseable bodies, non-object bodies, a missing or
/// non-success `status`, or a missing `data` key. A `null` payload is kept.
pub fn unwrap_envelope(body: &str) -> Option<Value> {
    let Ok(Value::Object(mut map)) = serde_json::from_str::<Value>(body) else {
        return None;
    };
    match map.get("status") {
        Some(Value::String(s)) if s == STATUS_SUCCESS => {}
        _ => return None,
    }
    map.remove("data")
}
