//! Variant emission - decides which variants a source document produces and
//! writes them to the output tree.

use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::annotations::validate_annotations;
use crate::error::GenerateError;
use crate::loader::{load_schema, SourceFile};
use crate::refs::{split_anchor, split_extension, with_suffix, Registry};
use crate::transform::Transform;
use crate::types::Variant;

/// Files written and errors collected for one source document.
#[derive(Debug, Default)]
pub struct EmitOutcome {
    /// Output paths relative to the output directory.
    pub generated: Vec<PathBuf>,
    pub errors: Vec<GenerateError>,
}

/// Output path of `variant` for a source file at `rel_path`.
pub fn variant_path(rel_path: &Path, variant: Variant) -> PathBuf {
    let suffix = variant.file_suffix();
    let Some(stem) = rel_path.file_stem() else {
        return rel_path.to_path_buf();
    };
    if suffix.is_empty() {
        return rel_path.to_path_buf();
    }

    let mut name = stem.to_os_string();
    name.push(&suffix);
    if let Some(ext) = rel_path.extension() {
        name.push(".");
        name.push(ext);
    }
    rel_path.with_file_name(name)
}

/// Derive every variant of a loaded, validated document.
///
/// Request variants each transform their own clone; the response (or
/// pass-through) variant consumes `document` last.
pub fn derive_variants(document: Value, file: &Path, registry: &Registry) -> Vec<(Variant, Value)> {
    let variants = match registry.get(file) {
        Some(shared) => Variant::for_annotated(shared),
        None => vec![Variant::Passthrough],
    };

    let mut document = Some(document);
    let last = variants.len() - 1;
    variants
        .into_iter()
        .enumerate()
        .filter_map(|(i, variant)| {
            let source = if i == last {
                document.take()?
            } else {
                document.clone()?
            };
            let title_suffix = variant.title_suffix();
            let ctx = Transform::new(variant.selector(), file, registry).title_suffix(&title_suffix);
            let mut output = ctx.apply(source);
            rewrite_id(&mut output, variant);
            Some((variant, output))
        })
        .collect()
}

/// Insert the variant's file suffix into a `.json` `$id`, keeping any fragment.
fn rewrite_id(schema: &mut Value, variant: Variant) {
    let suffix = variant.file_suffix();
    if suffix.is_empty() {
        return;
    }
    if let Some(Value::String(id)) = schema.get_mut("$id") {
        let (base, fragment) = split_anchor(id);
        if split_extension(base).1 == ".json" {
            let rewritten = format!("{}{}", with_suffix(base, &suffix), fragment);
            *id = rewritten;
        }
    }
}

/// Load, validate, transform and write one source document.
///
/// A document that fails to load or validate emits nothing.
pub fn emit_schema(source: &SourceFile, output_dir: &Path, registry: &Registry) -> EmitOutcome {
    let mut outcome = EmitOutcome::default();

    let document = match load_schema(&source.path) {
        Ok(document) => document,
        Err(err) => {
            outcome.errors.push(err.into());
            return outcome;
        }
    };

    let errors = validate_annotations(&document);
    if !errors.is_empty() {
        tracing::debug!(file = %source.rel_path.display(), count = errors.len(), "annotation errors");
        outcome.errors.push(GenerateError::Annotation {
            file: source.rel_path.clone(),
            errors,
        });
        return outcome;
    }

    for (variant, schema) in derive_variants(document, &source.path, registry) {
        let rel = variant_path(&source.rel_path, variant);
        match write_json(&schema, &output_dir.join(&rel)) {
            Ok(()) => outcome.generated.push(rel),
            Err(err) => outcome.errors.push(err),
        }
    }

    outcome
}

/// Write pretty-printed JSON with a trailing newline, creating parent dirs.
pub fn write_json(value: &Value, path: &Path) -> Result<(), GenerateError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| GenerateError::Write {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let mut content =
        serde_json::to_string_pretty(value).map_err(|source| GenerateError::Serialize {
            path: path.to_path_buf(),
            source,
        })?;
    content.push('\n');

    std::fs::write(path, content).map_err(|source| GenerateError::Write {
        path: path.to_path_buf(),
        source,
    })
}
