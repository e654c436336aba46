use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, FromRequestParts};
use axum_extra::extract::QueryRejection;

use crate::error::KeepsakeError;

/// `axum::Json` whose rejections become `KeepsakeError::Validation`.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(KeepsakeError))]
pub struct AppJson<T>(pub T);

/// `axum_extra::extract::Query` with the same error envelope as bodies.
#[derive(FromRequestParts)]
#[from_request(via(axum_extra::extract::Query), rejection(KeepsakeError))]
pub struct AppQuery<T>(pub T);

impl From<JsonRejection> for KeepsakeError {
    fn from(rejection: JsonRejection) -> Self {
        map_json_rejection(rejection)
    }
}

impl From<QueryRejection> for KeepsakeError {
    fn from(rejection: QueryRejection) -> Self {
        KeepsakeError::validation("query", rejection.to_string())
    }
}

fn map_json_rejection(rejection: JsonRejection) -> KeepsakeError {
    match rejection {
        JsonRejection::JsonDataError(err) => data_error(&err.body_text()),
        JsonRejection::JsonSyntaxError(err) => {
            KeepsakeError::validation("body", format!("JSON syntax error: {}", err.body_text()))
        }
        JsonRejection::MissingJsonContentType(_) => KeepsakeError::validation(
            "content-type",
            "Missing `Content-Type: application/json` header",
        ),
        JsonRejection::BytesRejection(err) => {
            KeepsakeError::validation("body", format!("Failed to read request body: {err}"))
        }
        _ => KeepsakeError::validation("body", rejection.body_text()),
    }
}

/// Name the failing input of a serde data error, including its nesting,
/// e.g. `media.images_data[0].filename`.
fn data_error(message: &str) -> KeepsakeError {
    let detail = message
        .split_once("target type: ")
        .map_or(message, |(_, detail)| detail);
    let detail = detail.split(" at line ").next().unwrap_or(detail);
    let (path, reason) = split_path(detail).unwrap_or(("", detail));

    if let Some(name) = extract_quoted(reason, "missing field `") {
        let field = join_path(path, name);
        KeepsakeError::validation(&field, format!("Missing required field: {field}"))
    } else if let Some(name) = extract_quoted(reason, "unknown field `") {
        let field = join_path(path, name);
        KeepsakeError::validation(&field, format!("Unknown field: {field}"))
    } else if !path.is_empty() {
        KeepsakeError::validation(path, reason)
    } else {
        KeepsakeError::validation("body", format!("Invalid JSON: {message}"))
    }
}

fn extract_quoted<'a>(message: &'a str, prefix: &str) -> Option<&'a str> {
    let start = message.find(prefix)? + prefix.len();
    let remaining = message.get(start..)?;
    let end = remaining.find('`')?;
    remaining.get(..end)
}

/// Split `"location.coordinates.lat: invalid type ..."` into the failing path
/// and serde's description. Top-level errors carry no path.
fn split_path(detail: &str) -> Option<(&str, &str)> {
    let (path, reason) = detail.split_once(": ")?;
    if path.is_empty() || path == "." || path.contains(char::is_whitespace) {
        return None;
    }
    Some((path, reason))
}

fn join_path(path: &str, name: &str) -> String {
    if path.is_empty() {
        name.to_string()
    } else {
        format!("{path}.{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field_of(err: KeepsakeError) -> String {
        match err {
            KeepsakeError::Validation { field, .. } => field,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn extracts_missing_and_unknown_fields() {
        let missing = "Failed to deserialize the JSON body into the target type: missing field `title` at line 1 column 2";
        assert_eq!(field_of(data_error(missing)), "title");

        let unknown = "Failed to deserialize the JSON body into the target type: unknown field `colour`, expected one of `title`";
        assert_eq!(field_of(data_error(unknown)), "colour");
    }

    #[test]
    fn nested_fields_keep_their_path() {
        let missing = "Failed to deserialize the JSON body into the target type: media.images_data[0]: missing field `filename` at line 1 column 80";
        assert_eq!(field_of(data_error(missing)), "media.images_data[0].filename");

        let unknown = "Failed to deserialize the JSON body into the target type: location: unknown field `altitude`, expected `name` or `coordinates` at line 1 column 60";
        assert_eq!(field_of(data_error(unknown)), "location.altitude");
    }

    #[test]
    fn extracts_error_path() {
        let message = "Failed to deserialize the JSON body into the target type: location.coordinates.lat: invalid type: string \"x\", expected f64 at line 1 column 40";
        match data_error(message) {
            KeepsakeError::Validation { field, message } => {
                assert_eq!(field, "location.coordinates.lat");
                assert_eq!(message, "invalid type: string \"x\", expected f64");
            }
            other => panic!("expected validation error, got {other:?}"),
        }

        let top_level = "Failed to deserialize the JSON body into the target type: invalid type: map";
        assert_eq!(field_of(data_error(top_level)), "body");
    }
}
