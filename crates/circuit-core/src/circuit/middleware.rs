//! Response interception: status mapping and body decoding.

use log::{debug, trace};
use reqwest::blocking::Response;
use reqwest::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{CircuitError, Result};

/// Turn a non-2xx response into an error before anyone reads its body.
///
/// 4xx responses go through [`CircuitError::from_client_response`]; every
/// other failure status becomes a generic [`CircuitError::Http`].
pub fn check_response(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    let body = response.text()?;
    debug!("request failed with status {status}: {body}");

    if status.is_client_error() {
        return Err(CircuitError::from_client_response(
            status.as_u16(),
            content_type.as_deref(),
            &body,
        ));
    }

    Err(CircuitError::Http {
        status: status.as_u16(),
        content_type,
        body,
    })
}

/// Decode a successful response body; an empty body decodes as `null`.
pub fn decode_body<T: DeserializeOwned>(
    response: Response,
    context: &str,
    trace: bool,
) -> Result<T> {
    let body = response.text()?;
    if trace {
        trace!("{context} response body: {body}");
    }
    let text = if body.trim().is_empty() { "null" } else { body.as_str() };
    serde_json::from_str(text).map_err(|source| CircuitError::Decode {
        context: context.to_string(),
        source,
    })
}

/// Flatten a JSON object into query parameters.
///
/// Scalars become `key=value`, arrays become repeated `key[]=value` and
/// nulls are dropped.
pub fn query_pairs(payload: &Value) -> Vec<(String, String)> {
    let Some(object) = payload.as_object() else {
        return Vec::new();
    };

    let mut pairs = Vec::new();
    for (key, value) in object {
        match value {
            Value::Null => {}
            Value::Array(items) => {
                pairs.extend(items.iter().map(|item| (format!("{key}[]"), scalar(item))));
            }
            other => pairs.push((key.clone(), scalar(other))),
        }
    }
    pairs
}

fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
