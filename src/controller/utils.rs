//! Helpers for reading requests and forming responses
use std::collections::HashMap;

use failure::{Error as FailureError, Fail};
use futures::{Future, Stream};
use hyper;
use hyper::header::{ContentLength, ContentType};
use hyper::server::Response;
use hyper::StatusCode;
use mime;
use serde::de::DeserializeOwned;
use serde::ser::Serialize;
use serde_json::{self, Map, Value};
use url::form_urlencoded;

use errors::Error;

/// Reads the whole body and deserializes it. Urlencoded bodies are read
/// field by field, every value a string.
pub fn parse_body<T>(body: hyper::Body, content_type: Option<ContentType>) -> Box<Future<Item = T, Error = FailureError>>
where
    T: DeserializeOwned + 'static,
{
    Box::new(
        body.concat2()
            .map_err(|e| FailureError::from(e.context("Failed to read request body").context(Error::Parse)))
            .and_then(move |chunk| {
                let parsed = if is_urlencoded(content_type.as_ref()) {
                    serde_json::from_value::<T>(urlencoded_object(&chunk))
                } else {
                    serde_json::from_slice::<T>(&chunk)
                };
                parsed.map_err(|e| {
                    FailureError::from(
                        e.context(format!("Failed to parse request body: {}", String::from_utf8_lossy(&chunk)))
                            .context(Error::Parse),
                    )
                })
            }),
    )
}

fn is_urlencoded(content_type: Option<&ContentType>) -> bool {
    content_type.map_or(false, |content_type| {
        content_type.0.type_() == mime::APPLICATION && content_type.0.subtype() == mime::WWW_FORM_URLENCODED
    })
}

fn urlencoded_object(body: &[u8]) -> Value {
    let fields = form_urlencoded::parse(body)
        .map(|(key, value)| (key.into_owned(), Value::String(value.into_owned())))
        .collect::<Map<_, _>>();
    Value::Object(fields)
}

/// Query params, the last one wins for a repeated key
pub fn parse_query(query: Option<&str>) -> HashMap<String, String> {
    query
        .map(|query| form_urlencoded::parse(query.as_bytes()).into_owned().collect())
        .unwrap_or_default()
}

/// Non-empty query param parsed into `T`
pub fn query_param<T>(params: &HashMap<String, String>, key: &str) -> Result<Option<T>, FailureError>
where
    T: ::std::str::FromStr,
    T::Err: ::std::fmt::Display,
{
    match params.get(key).map(|value| value.trim()).filter(|value| !value.is_empty()) {
        None => Ok(None),
        Some(value) => value.parse::<T>().map(Some).map_err(|e| {
            format_err!("Query param {} = {} is invalid: {}", key, value, e)
                .context(Error::Parse)
                .into()
        }),
    }
}

pub fn response_with_body(body: String, content_type: ContentType) -> Response {
    Response::new()
        .with_header(ContentLength(body.len() as u64))
        .with_header(content_type)
        .with_body(body)
}

pub fn response_with_json<T: Serialize>(value: &T) -> Result<Response, FailureError> {
    let body = serde_json::to_string(value)?;
    Ok(response_with_body(body, ContentType::json()))
}

/// CSV offered to the browser as a file download
pub fn response_with_csv(body: String, file_name: &str) -> Response {
    let mut response = response_with_body(body, ContentType(mime::TEXT_CSV_UTF_8));
    response
        .headers_mut()
        .set_raw("Content-Disposition", format!("attachment; filename=\"{}\"", file_name));
    response
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ErrorMessage {
    pub code: u16,
    pub message: String,
}

pub fn response_with_error(status: StatusCode, message: String) -> Response {
    let body = ErrorMessage {
        code: status.as_u16(),
        message,
    };
    let body = serde_json::to_string(&body).unwrap_or_else(|_| "{}".to_string());
    response_with_body(body, ContentType::json()).with_status(status)
}
