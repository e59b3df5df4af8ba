//! UCP Spec Generator
//!
//! Derives per-operation JSON Schemas from `ucp_request` / `ucp_response`
//! annotated source schemas, and aggregates the embedded protocol OpenRPC
//! method catalog.
//!
//! Every annotated `types/foo.json` produces `types/foo.create_req.json`,
//! `types/foo.update_req.json` (or one shared `types/foo_req.json`) and
//! `types/foo_resp.json`. `$ref`s into annotated files are rewritten to the
//! variant matching the schema being generated.
//!
//! # Example
//!
//! ```
//! use std::path::Path;
//! use serde_json::json;
//! use ucp_spec_gen::{Operation, Registry, Selector, Transform};
//!
//! let schema = json!({
//!     "type": "object",
//!     "properties": {
//!         "id": { "type": "string", "ucp_request": { "create": "omit" } },
//!         "name": { "type": "string" }
//!     },
//!     "required": ["id", "name"]
//! });
//!
//! let registry = Registry::new();
//! let file = Path::new("/source/types/item.json");
//! let create = Transform::new(Selector::Request(Operation::Create), file, &registry);
//! let resolved = create.apply(schema);
//!
//! assert!(resolved["properties"].get("id").is_none());
//! assert_eq!(resolved["required"], json!(["name"]));
//! ```
//!
//! # Visibility Rules
//!
//! | Visibility | Effect on `properties` | Effect on `required` |
//! |------------|------------------------|----------------------|
//! | `"omit"` | Remove field | Remove from required |
//! | `"required"` | Keep field | Add to required |
//! | `"optional"` | Keep field | Remove from required |
//! | (none) | Keep field | Preserve original |
//!
//! An operation not named in the object form behaves like (none).
//!
//! # Annotation Format
//!
//! ```json
//! { "ucp_request": "omit" }
//! { "ucp_request": { "create": "omit", "update": "required" } }
//! { "ucp_response": "omit" }
//! ```
//!
//! A document-level `"ucp_shared_request": true` collapses the two request
//! variants into one.

mod annotations;
mod catalog;
mod emit;
mod error;
mod generate;
mod linter;
mod loader;
mod refs;
mod transform;
mod types;

pub use annotations::{has_annotations, is_shared_request, validate_annotations, visibility};
pub use catalog::{
    build_catalog, rewrite_catalog_refs, CatalogOptions, CatalogOutcome, CatalogStats, Info,
    Method, MethodResult, OpenRpcDocument, Param,
};
pub use emit::{derive_variants, emit_schema, variant_path, write_json, EmitOutcome};
pub use error::{AnnotationError, GenerateError, LoadError};
pub use generate::{generate, GenerateOptions, GenerateReport};
pub use linter::{lint, lint_file, Diagnostic, FileResult, FileStatus, LintResult, Severity};
pub use loader::{
    build_registry, canonical_path, collect_source_files, load_schema, load_schema_str,
    navigate_fragment, normalize_path, SourceFile,
};
pub use refs::{resolve_ref_path, rewrite_ref, Registry};
pub use transform::{transform, Transform};
pub use types::{Operation, Selector, Variant, Visibility, UCP_ANNOTATIONS};
