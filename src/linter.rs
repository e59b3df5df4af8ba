//! Schema linting - static analysis of source schema files.
//!
//! Checks a file or tree without writing anything:
//! - JSON syntax errors
//! - Broken $ref references (file not found, anchor not found)
//! - Invalid ucp_* annotations

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;

use crate::annotations::validate_annotations;
use crate::loader::{collect_source_files, load_schema, navigate_fragment};
use crate::refs::{resolve_ref_path, split_anchor};

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A single diagnostic message from linting.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: String,
    /// JSON path to the issue (e.g., "/properties/id/ucp_request")
    pub path: String,
    pub message: String,
}

impl Diagnostic {
    fn error(code: &str, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code: code.to_string(),
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Status of a linted file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Ok,
    Error,
    Warning,
}

/// Result of linting a single file.
#[derive(Debug, Clone, Serialize)]
pub struct FileResult {
    pub file: PathBuf,
    pub status: FileStatus,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

/// Result of linting a directory or set of files.
#[derive(Debug, Clone, Serialize)]
pub struct LintResult {
    pub path: PathBuf,
    pub files_checked: usize,
    pub passed: usize,
    pub failed: usize,
    pub errors: usize,
    pub warnings: usize,
    pub results: Vec<FileResult>,
}

impl LintResult {
    /// Returns true if all files passed (no errors).
    pub fn is_ok(&self) -> bool {
        self.errors == 0
    }
}

/// Lint a file or directory.
///
/// If path is a directory, recursively finds all .json files.
/// If `strict` is true, files with warnings count as failed.
pub fn lint(path: &Path, strict: bool) -> LintResult {
    let (files, base) = if path.is_file() {
        let base = path.parent().unwrap_or(Path::new("")).to_path_buf();
        (vec![path.to_path_buf()], base)
    } else {
        let files = collect_source_files(path)
            .into_iter()
            .filter(|f| f.is_json())
            .map(|f| f.path)
            .collect();
        (files, crate::loader::canonical_path(path))
    };

    let results: Vec<FileResult> = files.iter().map(|file| lint_file(file, &base)).collect();

    let count = |severity: Severity| {
        results
            .iter()
            .flat_map(|r| &r.diagnostics)
            .filter(|d| d.severity == severity)
            .count()
    };
    let errors = count(Severity::Error);
    let warnings = count(Severity::Warning);

    let failed = results
        .iter()
        .filter(|r| match r.status {
            FileStatus::Error => true,
            FileStatus::Warning => strict,
            FileStatus::Ok => false,
        })
        .count();

    LintResult {
        path: path.to_path_buf(),
        files_checked: files.len(),
        passed: files.len() - failed,
        failed,
        errors,
        warnings,
        results,
    }
}

/// Lint a single schema file. The reported path is relative to `base_path`.
pub fn lint_file(file: &Path, base_path: &Path) -> FileResult {
    let display = file.strip_prefix(base_path).unwrap_or(file).to_path_buf();

    let schema = match load_schema(file) {
        Ok(s) => s,
        Err(e) => {
            return FileResult {
                file: display,
                status: FileStatus::Error,
                diagnostics: vec![Diagnostic::error("E001", "/", format!("syntax error: {}", e))],
            };
        }
    };

    let mut diagnostics = Vec::new();

    check_refs(&schema, file, "", &schema, &mut diagnostics);

    diagnostics.extend(
        validate_annotations(&schema)
            .into_iter()
            .map(|e| Diagnostic::error("E004", e.path, e.message)),
    );

    if schema.get("$id").is_none() {
        diagnostics.push(Diagnostic {
            severity: Severity::Warning,
            code: "W002".to_string(),
            path: "/".to_string(),
            message: "schema missing $id field".to_string(),
        });
    }

    let status = if diagnostics.iter().any(|d| d.severity == Severity::Error) {
        FileStatus::Error
    } else if diagnostics.is_empty() {
        FileStatus::Ok
    } else {
        FileStatus::Warning
    };

    FileResult {
        file: display,
        status,
        diagnostics,
    }
}

/// Recursively check $ref values in a schema.
fn check_refs(
    value: &Value,
    file: &Path,
    path: &str,
    root: &Value,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match value {
        Value::Object(map) => {
            if let Some(Value::String(ref_val)) = map.get("$ref") {
                check_single_ref(ref_val, file, path, root, diagnostics);
            }
            for (key, val) in map {
                let child_path = format!("{}/{}", path, key);
                check_refs(val, file, &child_path, root, diagnostics);
            }
        }
        Value::Array(arr) => {
            for (i, item) in arr.iter().enumerate() {
                let child_path = format!("{}/{}", path, i);
                check_refs(item, file, &child_path, root, diagnostics);
            }
        }
        _ => {}
    }
}

fn check_single_ref(
    ref_val: &str,
    file: &Path,
    path: &str,
    root: &Value,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let (file_part, fragment) = split_anchor(ref_val);

    if file_part.is_empty() {
        if fragment.len() > 1 && navigate_fragment(root, fragment).is_none() {
            diagnostics.push(Diagnostic::error(
                "E003",
                path,
                format!("anchor not found: {}", ref_val),
            ));
        }
        return;
    }

    // URLs can't be checked locally
    let Some(ref_path) = resolve_ref_path(ref_val, file) else {
        return;
    };

    if !ref_path.exists() {
        diagnostics.push(Diagnostic::error(
            "E002",
            path,
            format!("file not found: {}", file_part),
        ));
        return;
    }

    if fragment.len() > 1 {
        // An unloadable target is reported when that file itself is linted
        if let Ok(target) = load_schema(&ref_path) {
            if navigate_fragment(&target, fragment).is_none() {
                diagnostics.push(Diagnostic::error(
                    "E003",
                    path,
                    format!("anchor not found in {}: {}", file_part, fragment),
                ));
            }
        }
    }
}
