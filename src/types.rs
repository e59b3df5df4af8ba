//! Core types for UCP schema variant generation.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Field-level request annotation.
pub const REQUEST_ANNOTATION: &str = "ucp_request";

/// Field-level response annotation.
pub const RESPONSE_ANNOTATION: &str = "ucp_response";

/// Document-level flag collapsing create/update into one request variant.
pub const SHARED_REQUEST_ANNOTATION: &str = "ucp_shared_request";

/// Every recognized UCP annotation key. Stripped from all emitted schemas.
pub const UCP_ANNOTATIONS: &[&str] = &[
    REQUEST_ANNOTATION,
    RESPONSE_ANNOTATION,
    SHARED_REQUEST_ANNOTATION,
];

/// Prefix reserved for UCP annotation keys.
pub const ANNOTATION_PREFIX: &str = "ucp_";

/// Returns true if `key` is one of the recognized annotation keys.
pub fn is_annotation_key(key: &str) -> bool {
    UCP_ANNOTATIONS.contains(&key)
}

/// Returns the JSON type name for error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Request operation a variant is generated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Create,
    Update,
}

impl Operation {
    /// Every request operation, in emission order.
    pub const ALL: [Operation; 2] = [Operation::Create, Operation::Update];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Update => "update",
        }
    }

    /// Capitalized name used in title suffixes ("Create", "Update").
    pub fn title(&self) -> &'static str {
        match self {
            Operation::Create => "Create",
            Operation::Update => "Update",
        }
    }

    /// Parse an operation name, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "create" => Some(Operation::Create),
            "update" => Some(Operation::Update),
            _ => None,
        }
    }

    /// Comma-separated list of operation names for error messages.
    pub fn names() -> String {
        Self::ALL
            .iter()
            .map(Operation::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which annotation branch governs one transformation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Selector {
    Request(Operation),
    Response,
}

impl Selector {
    /// Returns the operation for request selectors.
    pub fn operation(&self) -> Option<Operation> {
        match self {
            Selector::Request(op) => Some(*op),
            Selector::Response => None,
        }
    }
}

/// Visibility of a field in one variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Visibility {
    /// Keep field; requiredness follows the document's base `required`.
    #[default]
    Include,
    /// Remove field from properties and required.
    Omit,
    /// Keep field and ensure it's in required.
    Required,
    /// Keep field but keep it out of required.
    Optional,
}

impl Visibility {
    /// Legal annotation values for `ucp_request`.
    pub const REQUEST_VALUES: &'static [&'static str] = &["omit", "optional", "required"];

    /// Legal annotation values for `ucp_response`.
    pub const RESPONSE_VALUES: &'static [&'static str] = &["omit"];

    /// Parse a visibility value from a string.
    ///
    /// Returns `None` for unknown values (caller should error).
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "omit" => Some(Visibility::Omit),
            "required" => Some(Visibility::Required),
            "optional" => Some(Visibility::Optional),
            _ => None,
        }
    }
}

/// The kind of file emitted for one source document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variant {
    /// One request variant reused for every operation (`foo_req.json`).
    SharedRequest,
    /// Per-operation request variant (`foo.create_req.json`).
    Request(Operation),
    /// Response variant (`foo_resp.json`).
    Response,
    /// Unannotated document, written under its own name.
    Passthrough,
}

impl Variant {
    /// Selector the transform runs under for this variant.
    ///
    /// Shared request variants use `create` as the representative operation.
    pub fn selector(&self) -> Selector {
        match self {
            Variant::SharedRequest => Selector::Request(Operation::Create),
            Variant::Request(op) => Selector::Request(*op),
            Variant::Response | Variant::Passthrough => Selector::Response,
        }
    }

    /// Suffix inserted between file stem and extension.
    pub fn file_suffix(&self) -> String {
        match self {
            Variant::SharedRequest => "_req".to_string(),
            Variant::Request(op) => format!(".{}_req", op),
            Variant::Response => "_resp".to_string(),
            Variant::Passthrough => String::new(),
        }
    }

    /// Suffix appended to every `title` in the variant.
    pub fn title_suffix(&self) -> String {
        match self {
            Variant::SharedRequest => " Request".to_string(),
            Variant::Request(op) => format!(" {} Request", op.title()),
            Variant::Response => " Response".to_string(),
            Variant::Passthrough => String::new(),
        }
    }

    /// Variants emitted for an annotated document, request variants first.
    pub fn for_annotated(shared: bool) -> Vec<Variant> {
        let mut variants = if shared {
            vec![Variant::SharedRequest]
        } else {
            Operation::ALL.iter().map(|op| Variant::Request(*op)).collect()
        };
        variants.push(Variant::Response);
        variants
    }
}
