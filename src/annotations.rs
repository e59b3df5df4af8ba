//! Annotation model - per-field visibility lookup and annotation validation.

use serde_json::{Map, Value};

use crate::error::AnnotationError;
use crate::types::{
    json_type_name, Operation, Selector, Visibility, ANNOTATION_PREFIX, REQUEST_ANNOTATION,
    RESPONSE_ANNOTATION, SHARED_REQUEST_ANNOTATION, UCP_ANNOTATIONS,
};

/// Get visibility for a single property under `selector`.
///
/// Returns `(visibility, explicit)`. `explicit` is true when a `ucp_request`
/// annotation fired for this property, including the per-operation form
/// where this operation is not named and falls back to `Include`.
/// Response lookups are never explicit.
pub fn visibility(prop: &Value, selector: Selector) -> (Visibility, bool) {
    let Value::Object(map) = prop else {
        return (Visibility::Include, false);
    };

    match selector {
        Selector::Request(op) => {
            let Some(annotation) = map.get(REQUEST_ANNOTATION) else {
                return (Visibility::Include, false);
            };
            let value = match annotation {
                // Shorthand: "ucp_request": "omit" - applies to all operations
                Value::String(s) => Some(s.as_str()),
                // Object form: "ucp_request": { "create": "omit" }
                Value::Object(ops) => ops.get(op.as_str()).and_then(Value::as_str),
                _ => None,
            };
            let vis = value.and_then(Visibility::parse).unwrap_or_default();
            (vis, true)
        }
        Selector::Response => match map.get(RESPONSE_ANNOTATION).and_then(Value::as_str) {
            Some("omit") => (Visibility::Omit, false),
            _ => (Visibility::Include, false),
        },
    }
}

/// Returns true if the schema carries a `ucp_request` or `ucp_response`
/// annotation anywhere in its tree.
///
/// The shared-request flag alone does not make a document annotated.
pub fn has_annotations(value: &Value) -> bool {
    match value {
        Value::Object(map) => {
            map.contains_key(REQUEST_ANNOTATION)
                || map.contains_key(RESPONSE_ANNOTATION)
                || map.values().any(has_annotations)
        }
        Value::Array(arr) => arr.iter().any(has_annotations),
        _ => false,
    }
}

/// Returns the document-level shared-request flag (false when absent).
pub fn is_shared_request(document: &Value) -> bool {
    document
        .get(SHARED_REQUEST_ANNOTATION)
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

/// Validate every `ucp_*` annotation in a source document.
///
/// Returns all errors found; an empty list means the document is valid.
pub fn validate_annotations(document: &Value) -> Vec<AnnotationError> {
    let mut errors = Vec::new();
    validate_value(document, "", true, &mut errors);
    errors
}

fn validate_value(value: &Value, path: &str, is_root: bool, errors: &mut Vec<AnnotationError>) {
    match value {
        Value::Object(map) => validate_object(map, path, is_root, errors),
        Value::Array(arr) => {
            for (i, item) in arr.iter().enumerate() {
                validate_value(item, &format!("{}/{}", path, i), false, errors);
            }
        }
        _ => {}
    }
}

fn validate_object(
    map: &Map<String, Value>,
    path: &str,
    is_root: bool,
    errors: &mut Vec<AnnotationError>,
) {
    for (key, value) in map {
        let key_path = format!("{}/{}", path, escape_pointer(key));

        if key.starts_with(ANNOTATION_PREFIX) && !UCP_ANNOTATIONS.contains(&key.as_str()) {
            errors.push(AnnotationError {
                path: key_path,
                message: format!("unknown annotation \"{}\"", key),
            });
            continue;
        }

        match key.as_str() {
            REQUEST_ANNOTATION => check_request(value, &key_path, errors),
            RESPONSE_ANNOTATION => {
                let legal = value
                    .as_str()
                    .map(|s| Visibility::RESPONSE_VALUES.contains(&s))
                    .unwrap_or(false);
                if !legal {
                    errors.push(AnnotationError {
                        path: key_path,
                        message: format!(
                            "invalid value {}: expected \"omit\"",
                            describe(value)
                        ),
                    });
                }
            }
            SHARED_REQUEST_ANNOTATION => {
                if !is_root {
                    errors.push(AnnotationError {
                        path: key_path,
                        message: "only allowed at the document root".to_string(),
                    });
                } else if !value.is_boolean() {
                    errors.push(AnnotationError {
                        path: key_path,
                        message: format!(
                            "invalid value type: expected boolean, got {}",
                            json_type_name(value)
                        ),
                    });
                }
            }
            _ => validate_value(value, &key_path, false, errors),
        }
    }
}

fn check_request(value: &Value, path: &str, errors: &mut Vec<AnnotationError>) {
    match value {
        Value::String(s) => {
            if Visibility::parse(s).is_none() {
                errors.push(invalid_request_value(path.to_string(), value));
            }
        }
        Value::Object(ops) => {
            for (op, op_value) in ops {
                let op_path = format!("{}/{}", path, escape_pointer(op));
                if Operation::ALL.iter().all(|known| known.as_str() != op.as_str()) {
                    errors.push(AnnotationError {
                        path: op_path,
                        message: format!(
                            "unknown operation \"{}\": expected {}",
                            op,
                            Operation::names()
                        ),
                    });
                } else if op_value.as_str().and_then(Visibility::parse).is_none() {
                    errors.push(invalid_request_value(op_path, op_value));
                }
            }
        }
        other => errors.push(AnnotationError {
            path: path.to_string(),
            message: format!(
                "invalid type: expected string or object, got {}",
                json_type_name(other)
            ),
        }),
    }
}

fn invalid_request_value(path: String, value: &Value) -> AnnotationError {
    AnnotationError {
        path,
        message: format!(
            "invalid value {}: expected {}",
            describe(value),
            Visibility::REQUEST_VALUES.join(", ")
        ),
    }
}

/// Render a value for messages: strings quoted, everything else by type.
fn describe(value: &Value) -> String {
    match value {
        Value::String(s) => format!("\"{}\"", s),
        other => json_type_name(other).to_string(),
    }
}

/// Escape a key for use as a JSON Pointer segment (`~` → `~0`, `/` → `~1`).
fn escape_pointer(key: &str) -> String {
    key.replace('~', "~0").replace('/', "~1")
}
