//! Method catalog - assembles the embedded protocol OpenRPC document from an
//! entry document plus extension schemas.

use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::GenerateError;
use crate::loader::{canonical_path, load_schema};
use crate::refs::{split_anchor, with_suffix, Registry};

/// Where the catalog inputs live and what the output looks like.
///
/// Paths are relative to the source (inputs) or output (catalog) directory.
#[derive(Debug, Clone)]
pub struct CatalogOptions {
    pub entry: PathBuf,
    pub extensions_dir: PathBuf,
    /// File names in `extensions_dir` never scanned for extension blocks.
    pub excluded: Vec<String>,
    /// Key of the block carrying methods inside an extension schema.
    pub extension_key: String,
    /// Ref prefix identifying schema refs eligible for rewriting.
    pub schema_prefix: String,
    pub output: PathBuf,
    pub openrpc_version: String,
    pub version: String,
    pub default_title: String,
    pub default_description: String,
}

impl Default for CatalogOptions {
    fn default() -> Self {
        Self {
            entry: PathBuf::from("services/shopping/embedded.json"),
            extensions_dir: PathBuf::from("schemas/shopping"),
            excluded: ["checkout.json", "payment.json", "order.json"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            extension_key: "embedded".to_string(),
            schema_prefix: "schemas/shopping/".to_string(),
            output: PathBuf::from("services/shopping/embedded.openrpc.json"),
            openrpc_version: "1.3.2".to_string(),
            version: "2026-01-11".to_string(),
            default_title: "Embedded Protocol".to_string(),
            default_description: "Embedded Protocol methods for UCP capabilities.".to_string(),
        }
    }
}

impl CatalogOptions {
    pub fn entry(mut self, entry: impl Into<PathBuf>) -> Self {
        self.entry = entry.into();
        self
    }

    pub fn output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = output.into();
        self
    }

    pub fn extensions_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.extensions_dir = dir.into();
        self
    }
}

// --- Input shapes ---

#[derive(Debug, Deserialize)]
struct SourceMethod {
    name: String,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    params: Option<Vec<SourceParam>>,
    #[serde(default)]
    result: Option<SourceResult>,
    #[serde(default)]
    errors: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct SourceParam {
    name: String,
    #[serde(default)]
    required: bool,
    schema: Value,
}

#[derive(Debug, Deserialize)]
struct SourceResult {
    #[serde(default)]
    name: Option<String>,
    schema: Value,
}

/// `methods` + `delegations`, as found in the entry document and in every
/// extension block.
#[derive(Debug, Default, Deserialize)]
struct MethodBlock {
    #[serde(default)]
    methods: Vec<SourceMethod>,
    #[serde(default)]
    delegations: Vec<String>,
}

// --- Output shapes ---

/// The generated OpenRPC document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpenRpcDocument {
    pub openrpc: String,
    pub info: Info,
    #[serde(rename = "x-delegations")]
    pub delegations: Vec<String>,
    pub methods: Vec<Method>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Info {
    pub title: String,
    pub description: String,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Method {
    pub name: String,
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Vec<Param>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<MethodResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Param {
    pub name: String,
    pub required: bool,
    pub schema: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MethodResult {
    pub name: String,
    pub schema: Value,
}

/// Counts reported after the catalog is built.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CatalogStats {
    pub entry_methods: usize,
    pub extension_methods: usize,
}

/// Rewrite schema refs in a method's params/result.
///
/// A ref naming `prefix` once, whose prefix-relative file is annotated, gets
/// `_resp` inserted before `.json`. Anchor-only and non-matching refs pass
/// through.
pub fn rewrite_catalog_refs(value: Value, annotated: &HashSet<String>, prefix: &str) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, value)| {
                    let value = match value {
                        Value::String(reference) if key == "$ref" => {
                            Value::String(rewrite_catalog_ref(reference, annotated, prefix))
                        }
                        other => rewrite_catalog_refs(other, annotated, prefix),
                    };
                    (key, value)
                })
                .collect(),
        ),
        Value::Array(arr) => Value::Array(
            arr.into_iter()
                .map(|v| rewrite_catalog_refs(v, annotated, prefix))
                .collect(),
        ),
        other => other,
    }
}

fn rewrite_catalog_ref(reference: String, annotated: &HashSet<String>, prefix: &str) -> String {
    if reference.starts_with('#') || prefix.is_empty() {
        return reference;
    }
    let mut parts = reference.split(prefix);
    let (Some(head), Some(tail), None) = (parts.next(), parts.next(), parts.next()) else {
        return reference;
    };

    let (schema_path, anchor) = split_anchor(tail);
    if schema_path.ends_with(".json") && annotated.contains(schema_path) {
        format!(
            "{}{}{}{}",
            head,
            prefix,
            with_suffix(schema_path, "_resp"),
            anchor
        )
    } else {
        reference
    }
}

fn convert_method(method: SourceMethod, annotated: &HashSet<String>, prefix: &str) -> Method {
    let params = method.params.map(|params| {
        params
            .into_iter()
            .map(|param| {
                let description = param.schema.get("description").cloned();
                Param {
                    name: param.name,
                    required: param.required,
                    schema: rewrite_catalog_refs(param.schema, annotated, prefix),
                    description,
                }
            })
            .collect()
    });

    let result = method.result.map(|result| MethodResult {
        name: result.name.unwrap_or_else(|| "result".to_string()),
        schema: rewrite_catalog_refs(result.schema, annotated, prefix),
    });

    Method {
        name: method.name,
        summary: method.summary.unwrap_or_default(),
        description: method.description.filter(|d| !d.is_empty()),
        params,
        result,
        errors: method.errors,
    }
}

fn parse_block(value: Value, file: &Path) -> Result<MethodBlock, GenerateError> {
    serde_json::from_value(value).map_err(|e| GenerateError::Catalog {
        file: file.to_path_buf(),
        message: e.to_string(),
    })
}

/// Output of [`build_catalog`]: the document (when every input was usable)
/// plus collected errors.
#[derive(Debug, Default)]
pub struct CatalogOutcome {
    pub document: Option<OpenRpcDocument>,
    pub stats: CatalogStats,
    pub errors: Vec<GenerateError>,
}

/// Build the OpenRPC catalog from `source_dir`.
///
/// A missing entry document falls back to the default title and
/// description; unreadable or malformed inputs are reported as errors and
/// no document is produced.
pub fn build_catalog(
    source_dir: &Path,
    registry: &Registry,
    options: &CatalogOptions,
) -> CatalogOutcome {
    let mut outcome = CatalogOutcome::default();
    let source_dir = canonical_path(source_dir);
    let ext_dir = source_dir.join(&options.extensions_dir);
    let annotated: HashSet<String> = registry.relative_to(&ext_dir).into_iter().collect();
    let prefix = options.schema_prefix.as_str();

    let mut title = options.default_title.clone();
    let mut description = options.default_description.clone();
    let mut methods = Vec::new();
    let mut delegations = BTreeSet::new();

    let entry_path = source_dir.join(&options.entry);
    if entry_path.exists() {
        match load_schema(&entry_path) {
            Ok(entry) => {
                if let Some(t) = entry.get("title").and_then(Value::as_str) {
                    title = t.to_string();
                }
                if let Some(d) = entry.get("description").and_then(Value::as_str) {
                    description = d.to_string();
                }
                match parse_block(entry, &options.entry) {
                    Ok(block) => {
                        outcome.stats.entry_methods = block.methods.len();
                        methods.extend(
                            block
                                .methods
                                .into_iter()
                                .map(|m| convert_method(m, &annotated, prefix)),
                        );
                        delegations.extend(block.delegations);
                    }
                    Err(err) => outcome.errors.push(err),
                }
            }
            Err(err) => outcome.errors.push(err.into()),
        }
    } else {
        tracing::warn!(entry = %options.entry.display(), "catalog entry document not found");
    }

    for file in extension_files(&ext_dir, &options.excluded) {
        let rel = options.extensions_dir.join(file.file_name().unwrap_or_default());
        let mut document = match load_schema(&file) {
            Ok(document) => document,
            Err(err) => {
                outcome.errors.push(err.into());
                continue;
            }
        };
        let Some(block) = document
            .as_object_mut()
            .and_then(|map| map.remove(&options.extension_key))
        else {
            continue;
        };
        match parse_block(block, &rel) {
            Ok(block) => {
                tracing::debug!(file = %rel.display(), methods = block.methods.len(), "extension methods");
                outcome.stats.extension_methods += block.methods.len();
                methods.extend(
                    block
                        .methods
                        .into_iter()
                        .map(|m| convert_method(m, &annotated, prefix)),
                );
                delegations.extend(block.delegations);
            }
            Err(err) => outcome.errors.push(err),
        }
    }

    if outcome.errors.is_empty() {
        outcome.document = Some(OpenRpcDocument {
            openrpc: options.openrpc_version.clone(),
            info: Info {
                title,
                description,
                version: options.version.clone(),
            },
            delegations: delegations.into_iter().collect(),
            methods,
        });
    }

    outcome
}

/// `.json` files directly in `dir`, name-sorted, minus `excluded` names.
fn extension_files(dir: &Path, excluded: &[String]) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };

    let mut files: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && path.extension().map(|e| e == "json").unwrap_or(false))
        .filter(|path| {
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
            !excluded.iter().any(|x| x == name)
        })
        .collect();
    files.sort();
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::tempdir;

    const PREFIX: &str = "schemas/shopping/";

    fn annotated() -> HashSet<String> {
        ["checkout.json", "types/buyer.json"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    #[test]
    fn rewrites_annotated_schema_refs() {
        let schema = json!({
            "type": "object",
            "properties": {
                "checkout": { "$ref": "../../schemas/shopping/checkout.json" },
                "buyer": { "$ref": "../../schemas/shopping/types/buyer.json#/$defs/x" },
                "plain": { "$ref": "../../schemas/shopping/types/plain.json" },
                "local": { "$ref": "#/$defs/local" },
                "other": { "$ref": "../common/thing.json" }
            }
        });
        let out = rewrite_catalog_refs(schema, &annotated(), PREFIX);
        let props = &out["properties"];
        assert_eq!(
            props["checkout"]["$ref"],
            "../../schemas/shopping/checkout_resp.json"
        );
        assert_eq!(
            props["buyer"]["$ref"],
            "../../schemas/shopping/types/buyer_resp.json#/$defs/x"
        );
        assert_eq!(
            props["plain"]["$ref"],
            "../../schemas/shopping/types/plain.json"
        );
        assert_eq!(props["local"]["$ref"], "#/$defs/local");
        assert_eq!(props["other"]["$ref"], "../common/thing.json");
    }

    #[test]
    fn method_conversion_defaults() {
        let method: SourceMethod = serde_json::from_value(json!({
            "name": "ec.start",
            "description": "",
            "params": [
                { "name": "checkout", "schema": { "description": "The checkout", "type": "object" } }
            ],
            "result": { "schema": { "type": "null" } }
        }))
        .unwrap();

        let converted = convert_method(method, &annotated(), PREFIX);
        let value = serde_json::to_value(&converted).unwrap();
        assert_eq!(
            value,
            json!({
                "name": "ec.start",
                "summary": "",
                "params": [{
                    "name": "checkout",
                    "required": false,
                    "schema": { "description": "The checkout", "type": "object" },
                    "description": "The checkout"
                }],
                "result": { "name": "result", "schema": { "type": "null" } }
            })
        );
    }

    #[test]
    fn builds_catalog_from_entry_and_extensions() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("services/shopping")).unwrap();
        fs::create_dir_all(root.join("schemas/shopping")).unwrap();

        fs::write(
            root.join("services/shopping/embedded.json"),
            r#"{
                "title": "EP",
                "methods": [{ "name": "ec.ready", "summary": "Ready" }],
                "delegations": ["payment.credential", "fulfillment.address"]
            }"#,
        )
        .unwrap();
        fs::write(
            root.join("schemas/shopping/checkout.json"),
            r#"{ "embedded": { "methods": [{ "name": "ignored" }] } }"#,
        )
        .unwrap();
        fs::write(
            root.join("schemas/shopping/b_ext.json"),
            r#"{ "embedded": { "methods": [{ "name": "ec.b" }], "delegations": ["payment.credential"] } }"#,
        )
        .unwrap();
        fs::write(
            root.join("schemas/shopping/a_ext.json"),
            r#"{ "embedded": { "methods": [{ "name": "ec.a" }], "delegations": ["discount.apply"] } }"#,
        )
        .unwrap();
        fs::write(root.join("schemas/shopping/plain.json"), r#"{ "type": "object" }"#).unwrap();

        let outcome = build_catalog(root, &Registry::new(), &CatalogOptions::default());
        assert!(outcome.errors.is_empty());
        let doc = outcome.document.unwrap();

        assert_eq!(doc.info.title, "EP");
        assert_eq!(
            doc.info.description,
            "Embedded Protocol methods for UCP capabilities."
        );
        assert_eq!(
            doc.delegations,
            vec!["discount.apply", "fulfillment.address", "payment.credential"]
        );
        let names: Vec<&str> = doc.methods.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["ec.ready", "ec.a", "ec.b"]);
        assert_eq!(
            outcome.stats,
            CatalogStats {
                entry_methods: 1,
                extension_methods: 2
            }
        );
    }

    #[test]
    fn missing_entry_uses_defaults() {
        let dir = tempdir().unwrap();
        let outcome = build_catalog(dir.path(), &Registry::new(), &CatalogOptions::default());
        let doc = outcome.document.unwrap();
        assert_eq!(doc.info.title, "Embedded Protocol");
        assert_eq!(doc.info.version, "2026-01-11");
        assert!(doc.methods.is_empty());

        let value = serde_json::to_value(&doc).unwrap();
        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["openrpc", "info", "x-delegations", "methods"]);
    }

    #[test]
    fn malformed_method_is_an_error() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("services/shopping")).unwrap();
        fs::write(
            dir.path().join("services/shopping/embedded.json"),
            r#"{ "methods": [{ "summary": "no name" }] }"#,
        )
        .unwrap();

        let outcome = build_catalog(dir.path(), &Registry::new(), &CatalogOptions::default());
        assert!(outcome.document.is_none());
        assert!(matches!(outcome.errors[0], GenerateError::Catalog { .. }));
    }
}
