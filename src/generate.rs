//! Generation run - scans the source tree, emits every variant, then builds
//! the method catalog.

use std::path::{Path, PathBuf};

use crate::catalog::{build_catalog, CatalogOptions, CatalogStats};
use crate::emit::{emit_schema, write_json};
use crate::error::GenerateError;
use crate::loader::{build_registry, canonical_path, collect_source_files, SourceFile};

/// Options for a generation run.
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    pub source_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Remove the output directory before writing.
    pub clean: bool,
    /// Method catalog settings; `None` skips the catalog pass.
    pub catalog: Option<CatalogOptions>,
    /// Directory, relative to the source, holding transport specs.
    pub services_dir: PathBuf,
    /// Transport spec file names under `services_dir` and their output
    /// names. Matching files are copied byte-for-byte, refs untouched.
    pub transport_renames: Vec<(String, String)>,
}

impl GenerateOptions {
    /// Create options with the default catalog, transport renames, and a
    /// clean output directory.
    pub fn new(source_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            source_dir: source_dir.into(),
            output_dir: output_dir.into(),
            clean: true,
            catalog: Some(CatalogOptions::default()),
            services_dir: PathBuf::from("services"),
            transport_renames: vec![
                ("openapi.json".to_string(), "rest.openapi.json".to_string()),
                ("openrpc.json".to_string(), "mcp.openrpc.json".to_string()),
            ],
        }
    }

    pub fn clean(mut self, clean: bool) -> Self {
        self.clean = clean;
        self
    }

    pub fn catalog(mut self, catalog: Option<CatalogOptions>) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn services_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.services_dir = dir.into();
        self
    }

    pub fn transport_renames(mut self, renames: Vec<(String, String)>) -> Self {
        self.transport_renames = renames;
        self
    }

    /// Output path for a transport spec at `rel_path`, or `None` when the
    /// file is an ordinary source file.
    pub fn transport_dest(&self, rel_path: &Path) -> Option<PathBuf> {
        if !rel_path.starts_with(&self.services_dir) {
            return None;
        }
        let name = rel_path.file_name()?.to_str()?;
        self.transport_renames
            .iter()
            .find(|(from, _)| from == name)
            .map(|(_, to)| rel_path.with_file_name(to))
    }
}

/// Result of a generation run.
#[derive(Debug, Default)]
pub struct GenerateReport {
    /// Number of annotated schemas found in pass 1.
    pub annotated: usize,
    /// Written files, relative to the output directory, in write order.
    pub generated: Vec<PathBuf>,
    pub catalog: Option<CatalogStats>,
    pub errors: Vec<GenerateError>,
}

impl GenerateReport {
    /// Returns true if no file failed.
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Run all passes.
///
/// # Errors
///
/// Returns `GenerateError` only for setup failures (missing source, nested
/// source and output directories, failed clean). Per-file failures land in
/// the report.
pub fn generate(options: &GenerateOptions) -> Result<GenerateReport, GenerateError> {
    let source_dir = canonical_path(&options.source_dir);
    let output_dir = canonical_path(&options.output_dir);

    if !source_dir.is_dir() {
        return Err(GenerateError::SourceNotFound {
            path: options.source_dir.clone(),
        });
    }
    if output_dir.starts_with(&source_dir) {
        return Err(GenerateError::OutputInsideSource {
            output: options.output_dir.clone(),
            source_dir: options.source_dir.clone(),
        });
    }
    if source_dir.starts_with(&output_dir) {
        return Err(GenerateError::SourceInsideOutput {
            source_dir: options.source_dir.clone(),
            output: options.output_dir.clone(),
        });
    }

    let mut report = GenerateReport::default();

    // Pass 1: every annotated schema must be known before any ref is rewritten
    let registry = build_registry(&source_dir);
    report.annotated = registry.len();
    tracing::info!(annotated = registry.len(), "pass 1 complete");

    if options.clean && output_dir.exists() {
        tracing::info!(dir = %output_dir.display(), "removing existing output");
        std::fs::remove_dir_all(&output_dir).map_err(|source| GenerateError::Clean {
            path: options.output_dir.clone(),
            source,
        })?;
    }

    // Pass 2
    let catalog_entry = options.catalog.as_ref().map(|c| source_dir.join(&c.entry));
    for file in collect_source_files(&source_dir) {
        if catalog_entry.as_deref() == Some(file.path.as_path()) {
            continue;
        }
        let transport = options.transport_dest(&file.rel_path);
        if file.is_json() && transport.is_none() {
            let outcome = emit_schema(&file, &output_dir, &registry);
            report.generated.extend(outcome.generated);
            report.errors.extend(outcome.errors);
        } else {
            let dest = transport.unwrap_or_else(|| file.rel_path.clone());
            match copy_file(&file, &output_dir, &dest) {
                Ok(()) => report.generated.push(dest),
                Err(err) => report.errors.push(err),
            }
        }
    }
    tracing::info!(files = report.generated.len(), "pass 2 complete");

    // Pass 3
    if let Some(catalog) = &options.catalog {
        let outcome = build_catalog(&source_dir, &registry, catalog);
        report.errors.extend(outcome.errors);
        if let Some(document) = outcome.document {
            let written = serde_json::to_value(&document)
                .map_err(|source| GenerateError::Serialize {
                    path: catalog.output.clone(),
                    source,
                })
                .and_then(|value| write_json(&value, &output_dir.join(&catalog.output)));
            match written {
                Ok(()) => {
                    report.generated.push(catalog.output.clone());
                    report.catalog = Some(outcome.stats);
                }
                Err(err) => report.errors.push(err),
            }
        }
    }

    Ok(report)
}

/// Copy a source file verbatim to `rel_dest` under the output directory.
fn copy_file(file: &SourceFile, output_dir: &Path, rel_dest: &Path) -> Result<(), GenerateError> {
    let dest = output_dir.join(rel_dest);
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent).map_err(|source| GenerateError::Write {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    std::fs::copy(&file.path, &dest)
        .map(|_| ())
        .map_err(|source| GenerateError::Copy {
            from: file.path.clone(),
            to: dest,
            source,
        })
}
