//! Variant transformation - derives one per-operation schema from an
//! annotated source schema.
//!
//! The transform filters properties by their `ucp_request`/`ucp_response`
//! annotations, recomputes `required`, rewrites `$ref`s into annotated files
//! to the matching variant file, strips annotations, and suffixes titles.
//! Key order of the source is preserved for every retained key.

use std::path::Path;

use serde_json::{Map, Value};

use crate::annotations::visibility;
use crate::refs::{rewrite_ref, Registry};
use crate::types::{is_annotation_key, Selector, Visibility};

/// Parameters of one transformation pass.
#[derive(Debug, Clone, Copy)]
pub struct Transform<'a> {
    /// Annotation branch governing field filtering.
    pub selector: Selector,
    /// Canonical path of the document being transformed; refs resolve against it.
    pub file: &'a Path,
    /// Annotated documents of this run.
    pub registry: &'a Registry,
    /// Appended to every `title` (empty for pass-through documents).
    pub title_suffix: &'a str,
}

impl<'a> Transform<'a> {
    pub fn new(selector: Selector, file: &'a Path, registry: &'a Registry) -> Self {
        Self {
            selector,
            file,
            registry,
            title_suffix: "",
        }
    }

    pub fn title_suffix(mut self, suffix: &'a str) -> Self {
        self.title_suffix = suffix;
        self
    }

    /// Transform a schema tree. Shorthand for [`transform`].
    pub fn apply(&self, node: Value) -> Value {
        transform(node, self)
    }
}

/// Shape of a schema node, decided once before dispatch.
enum Node {
    /// Object carrying `$ref`.
    Ref(Map<String, Value>),
    /// Object declaring `properties`; fields are filtered here.
    Properties(Map<String, Value>),
    /// Any other object (definition blocks, leaf schemas).
    Schema(Map<String, Value>),
    Array(Vec<Value>),
    Scalar(Value),
}

impl Node {
    fn classify(value: Value) -> Node {
        match value {
            Value::Object(map) if map.contains_key("$ref") => Node::Ref(map),
            Value::Object(map) if map.contains_key("properties") => Node::Properties(map),
            Value::Object(map) => Node::Schema(map),
            Value::Array(arr) => Node::Array(arr),
            other => Node::Scalar(other),
        }
    }
}

/// Transform `node` under `ctx`, consuming it.
///
/// Callers deriving several variants from one document pass each pass its
/// own clone.
pub fn transform(node: Value, ctx: &Transform<'_>) -> Value {
    match Node::classify(node) {
        Node::Ref(map) => transform_ref(map, ctx),
        Node::Properties(map) => transform_properties(map, ctx),
        Node::Schema(map) => {
            let mut result = transform_entries(map, ctx);
            apply_title_suffix(&mut result, ctx.title_suffix);
            Value::Object(result)
        }
        Node::Array(arr) => Value::Array(arr.into_iter().map(|v| transform(v, ctx)).collect()),
        Node::Scalar(value) => value,
    }
}

fn transform_ref(map: Map<String, Value>, ctx: &Transform<'_>) -> Value {
    let mut result = Map::new();
    for (key, value) in map {
        if is_annotation_key(&key) {
            continue;
        }
        let value = match (key.as_str(), value) {
            ("$ref", Value::String(reference)) => Value::String(rewrite_ref(
                &reference,
                ctx.file,
                ctx.registry,
                ctx.selector,
            )),
            ("$ref", other) => other,
            (_, other) => transform(other, ctx),
        };
        result.insert(key, value);
    }
    Value::Object(result)
}

/// Recurse into every value, dropping annotation keys.
fn transform_entries(map: Map<String, Value>, ctx: &Transform<'_>) -> Map<String, Value> {
    map.into_iter()
        .filter(|(key, _)| !is_annotation_key(key))
        .map(|(key, value)| (key, transform(value, ctx)))
        .collect()
}

fn transform_properties(map: Map<String, Value>, ctx: &Transform<'_>) -> Value {
    // Captured before any rewriting
    let base_required: Vec<String> = map
        .get("required")
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default();

    let mut entries: Vec<(String, Value)> = map.into_iter().collect();
    let mut new_required = Vec::new();

    for (key, value) in entries.iter_mut() {
        if key == "properties" {
            let props = std::mem::take(value);
            *value = filter_properties(props, &base_required, &mut new_required, ctx);
        }
    }

    let mut result = Map::new();
    let mut required_seen = false;
    for (key, value) in entries {
        if is_annotation_key(&key) {
            continue;
        }
        match key.as_str() {
            "properties" => {
                result.insert(key, value);
            }
            "required" => {
                required_seen = true;
                if !new_required.is_empty() {
                    result.insert(key, required_value(std::mem::take(&mut new_required)));
                }
            }
            _ => {
                let transformed = transform(value, ctx);
                result.insert(key, transformed);
            }
        }
    }

    // An explicit "required" annotation can create the list from nothing
    if !required_seen && !new_required.is_empty() {
        result.insert("required".to_string(), required_value(new_required));
    }

    apply_title_suffix(&mut result, ctx.title_suffix);
    Value::Object(result)
}

/// Filter a `properties` map and collect the names that stay required.
///
/// Base-required names that don't declare a property are carried over
/// untouched after the declared ones.
fn filter_properties(
    props: Value,
    base_required: &[String],
    new_required: &mut Vec<String>,
    ctx: &Transform<'_>,
) -> Value {
    let props = match props {
        Value::Object(props) => props,
        other => {
            new_required.extend(base_required.iter().cloned());
            return transform(other, ctx);
        }
    };

    let undeclared: Vec<String> = base_required
        .iter()
        .filter(|name| !props.contains_key(name.as_str()))
        .cloned()
        .collect();

    let mut result = Map::new();
    for (name, field) in props {
        let (vis, explicit) = visibility(&field, ctx.selector);

        let required = match vis {
            Visibility::Omit => continue,
            Visibility::Required => true,
            Visibility::Optional if explicit => false,
            _ => base_required.contains(&name),
        };

        if required {
            new_required.push(name.clone());
        }
        result.insert(name, transform(field, ctx));
    }

    new_required.extend(undeclared);
    Value::Object(result)
}

fn required_value(names: Vec<String>) -> Value {
    Value::Array(names.into_iter().map(Value::String).collect())
}

fn apply_title_suffix(map: &mut Map<String, Value>, suffix: &str) {
    if suffix.is_empty() {
        return;
    }
    if let Some(Value::String(title)) = map.get_mut("title") {
        title.push_str(suffix);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Operation;
    use serde_json::json;
    use std::path::PathBuf;

    const CREATE: Selector = Selector::Request(Operation::Create);
    const UPDATE: Selector = Selector::Request(Operation::Update);

    fn run(schema: Value, selector: Selector) -> Value {
        let registry = Registry::new();
        Transform::new(selector, Path::new("/src/a.json"), &registry).apply(schema)
    }

    #[test]
    fn omit_removes_field_and_requiredness() {
        let schema = json!({
            "type": "object",
            "properties": {
                "a": { "type": "string" },
                "b": { "type": "string", "ucp_request": "omit" }
            },
            "required": ["a", "b"]
        });

        let create = run(schema.clone(), CREATE);
        assert_eq!(create["properties"], json!({ "a": { "type": "string" } }));
        assert_eq!(create["required"], json!(["a"]));

        let response = run(schema, Selector::Response);
        assert_eq!(
            response["properties"],
            json!({ "a": { "type": "string" }, "b": { "type": "string" } })
        );
        assert_eq!(response["required"], json!(["a", "b"]));
    }

    #[test]
    fn explicit_optional_drops_required_key_when_empty() {
        let schema = json!({
            "properties": {
                "a": { "type": "string", "ucp_request": { "update": "optional" } }
            },
            "required": ["a"]
        });

        let create = run(schema.clone(), CREATE);
        assert_eq!(create["required"], json!(["a"]));

        let update = run(schema, UPDATE);
        assert!(update["properties"].get("a").is_some());
        assert!(update.get("required").is_none());
    }

    #[test]
    fn required_annotation_adds_required_list() {
        let schema = json!({
            "title": "Item",
            "properties": {
                "id": { "type": "string", "ucp_request": "required" }
            }
        });
        let result = run(schema, CREATE);
        assert_eq!(result["required"], json!(["id"]));
        let keys: Vec<&String> = result.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["title", "properties", "required"]);
    }

    #[test]
    fn required_keeps_source_position() {
        let schema = json!({
            "required": ["b", "a"],
            "properties": { "a": {}, "b": {} },
            "type": "object"
        });
        let result = run(schema, CREATE);
        let keys: Vec<&String> = result.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["required", "properties", "type"]);
        // Declaration order of the properties decides list order
        assert_eq!(result["required"], json!(["a", "b"]));
    }

    #[test]
    fn undeclared_required_names_survive() {
        let schema = json!({
            "properties": { "a": {} },
            "required": ["a", "extra"]
        });
        assert_eq!(run(schema, Selector::Response)["required"], json!(["a", "extra"]));
    }

    #[test]
    fn response_omit_only_affects_response() {
        let schema = json!({
            "properties": { "secret": { "ucp_response": "omit" } },
            "required": ["secret"]
        });
        let response = run(schema.clone(), Selector::Response);
        assert_eq!(response["properties"], json!({}));
        assert!(response.get("required").is_none());

        let create = run(schema, CREATE);
        assert_eq!(create["required"], json!(["secret"]));
    }

    #[test]
    fn strips_annotations_everywhere() {
        let schema = json!({
            "ucp_shared_request": true,
            "$defs": {
                "x": { "type": "string", "ucp_response": "omit" }
            },
            "items": [{ "ucp_request": "omit", "type": "number" }]
        });
        let result = run(schema, CREATE);
        assert_eq!(
            result,
            json!({
                "$defs": { "x": { "type": "string" } },
                "items": [{ "type": "number" }]
            })
        );
    }

    #[test]
    fn titles_get_suffix() {
        let schema = json!({
            "title": "Checkout",
            "properties": { "a": { "title": "Inner" } },
            "$defs": { "line": { "title": "Line", "type": "object" } }
        });
        let registry = Registry::new();
        let ctx = Transform::new(CREATE, Path::new("/src/a.json"), &registry)
            .title_suffix(" Create Request");
        let result = ctx.apply(schema);
        assert_eq!(result["title"], "Checkout Create Request");
        assert_eq!(result["properties"]["a"]["title"], "Inner Create Request");
        assert_eq!(result["$defs"]["line"]["title"], "Line Create Request");
    }

    #[test]
    fn ref_nodes_keep_title_and_rewrite() {
        let mut registry = Registry::new();
        registry.insert(PathBuf::from("/src/types/item.json"), false);
        let ctx = Transform::new(UPDATE, Path::new("/src/checkout.json"), &registry)
            .title_suffix(" Update Request");

        let schema = json!({
            "properties": {
                "items": {
                    "type": "array",
                    "items": { "$ref": "types/item.json", "title": "Line Items" }
                }
            }
        });
        let result = ctx.apply(schema);
        assert_eq!(
            result["properties"]["items"]["items"],
            json!({ "$ref": "types/item.update_req.json", "title": "Line Items" })
        );
    }

    #[test]
    fn unannotated_response_is_noop() {
        let schema = json!({
            "$id": "https://ucp.dev/schemas/plain.json",
            "title": "Plain",
            "type": "object",
            "properties": {
                "a": { "type": "string" },
                "b": { "allOf": [{ "$ref": "#/$defs/x" }] }
            },
            "required": ["a"],
            "$defs": { "x": { "type": "integer" } }
        });
        assert_eq!(run(schema.clone(), Selector::Response), schema);
    }

    #[test]
    fn scalars_pass_through() {
        assert_eq!(run(json!("text"), CREATE), json!("text"));
        assert_eq!(run(json!(null), CREATE), json!(null));
    }
}
