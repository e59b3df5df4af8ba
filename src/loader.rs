//! Schema loading and source tree walking.
//!
//! Pass 1 of a generation run lives here: every JSON file under the source
//! directory is loaded and classified, and the annotated ones are recorded
//! in a [`Registry`] before any ref rewriting happens.

use std::path::{Component, Path, PathBuf};

use serde_json::Value;
use walkdir::WalkDir;

use crate::annotations::{has_annotations, is_shared_request};
use crate::error::LoadError;
use crate::refs::Registry;

/// Load a schema from a file path.
///
/// # Errors
///
/// Returns `LoadError::FileNotFound` if the file doesn't exist,
/// or `LoadError::InvalidJson` if the file isn't valid JSON.
pub fn load_schema(path: &Path) -> Result<Value, LoadError> {
    if !path.exists() {
        return Err(LoadError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|source| LoadError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;

    serde_json::from_str(&content).map_err(|source| LoadError::InvalidJson {
        path: path.to_path_buf(),
        source,
    })
}

/// Load a schema from a JSON string.
///
/// `origin` is only used for error context.
pub fn load_schema_str(content: &str, origin: &Path) -> Result<Value, LoadError> {
    serde_json::from_str(content).map_err(|source| LoadError::InvalidJson {
        path: origin.to_path_buf(),
        source,
    })
}

/// Navigate a JSON Pointer fragment (e.g., "#/$defs/foo" or "#/properties/bar").
///
/// Returns `None` when any segment is missing.
pub fn navigate_fragment<'a>(schema: &'a Value, fragment: &str) -> Option<&'a Value> {
    let path = fragment.trim_start_matches('#').trim_start_matches('/');
    if path.is_empty() {
        return Some(schema);
    }

    let mut current = schema;
    for part in path.split('/') {
        // Unescape JSON Pointer encoding (~1 = /, ~0 = ~)
        let key = part.replace("~1", "/").replace("~0", "~");
        current = match current {
            Value::Array(arr) => arr.get(key.parse::<usize>().ok()?)?,
            other => other.get(&key)?,
        };
    }
    Some(current)
}

/// Lexically normalize a path: fold `.` and `..` without touching the
/// filesystem. Symlinks are not resolved.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                // Keep leading ".." on relative paths; drop it at the root
                match out.components().next_back() {
                    Some(Component::Normal(_)) => {
                        out.pop();
                    }
                    Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                    _ => out.push(".."),
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Make a path absolute against the current directory, then normalize it.
pub fn canonical_path(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return normalize_path(path);
    }
    match std::env::current_dir() {
        Ok(cwd) => normalize_path(&cwd.join(path)),
        Err(_) => normalize_path(path),
    }
}

/// A file found under the source directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Canonical absolute path.
    pub path: PathBuf,
    /// Path relative to the source directory.
    pub rel_path: PathBuf,
}

impl SourceFile {
    pub fn is_json(&self) -> bool {
        is_json_path(&self.path)
    }
}

fn is_json_path(path: &Path) -> bool {
    path.extension().map(|e| e == "json").unwrap_or(false)
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_str().map(|s| s.starts_with('.')).unwrap_or(false)
}

/// Walk a source directory, returning every non-hidden file in a stable
/// (name-sorted) order.
pub fn collect_source_files(source_dir: &Path) -> Vec<SourceFile> {
    let root = canonical_path(source_dir);

    WalkDir::new(&root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry.file_name()))
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                tracing::warn!(error = %err, "skipping unreadable entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| {
            let path = entry.into_path();
            let rel_path = path.strip_prefix(&root).unwrap_or(&path).to_path_buf();
            SourceFile { path, rel_path }
        })
        .collect()
}

/// Pass 1: scan the source tree and register every annotated document.
///
/// Files that fail to load are skipped here; pass 2 reports them.
pub fn build_registry(source_dir: &Path) -> Registry {
    let mut registry = Registry::new();

    for file in collect_source_files(source_dir) {
        if !file.is_json() {
            continue;
        }
        let Ok(document) = load_schema(&file.path) else {
            continue;
        };
        if has_annotations(&document) {
            let shared = is_shared_request(&document);
            tracing::debug!(file = %file.rel_path.display(), shared, "annotated schema");
            registry.insert(file.path, shared);
        }
    }

    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn load_missing_file() {
        let err = load_schema(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(matches!(err, LoadError::FileNotFound { .. }));
    }

    #[test]
    fn load_invalid_json_names_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "{ nope").unwrap();

        let err = load_schema(&path).unwrap_err();
        assert!(matches!(err, LoadError::InvalidJson { .. }));
        assert!(err.to_string().contains("bad.json"));
    }

    #[test]
    fn load_preserves_key_order() {
        let value = load_schema_str(r#"{"z":1,"a":2,"m":3}"#, Path::new("inline")).unwrap();
        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["z", "a", "m"]);
    }

    #[test]
    fn navigate_fragment_paths() {
        let schema = json!({
            "$defs": { "a/b": { "type": "string" } },
            "allOf": [{ "title": "first" }]
        });
        assert_eq!(navigate_fragment(&schema, "#"), Some(&schema));
        assert_eq!(
            navigate_fragment(&schema, "#/$defs/a~1b"),
            Some(&json!({ "type": "string" }))
        );
        assert_eq!(
            navigate_fragment(&schema, "#/allOf/0/title"),
            Some(&json!("first"))
        );
        assert_eq!(navigate_fragment(&schema, "#/$defs/missing"), None);
    }

    #[test]
    fn normalize_folds_dots() {
        assert_eq!(
            normalize_path(Path::new("/a/b/./../c/d.json")),
            PathBuf::from("/a/c/d.json")
        );
        assert_eq!(normalize_path(Path::new("/../x")), PathBuf::from("/x"));
        assert_eq!(normalize_path(Path::new("../x/./y")), PathBuf::from("../x/y"));
    }

    #[test]
    fn walk_is_sorted_and_skips_hidden() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("types")).unwrap();
        fs::create_dir_all(dir.path().join(".git")).unwrap();
        fs::write(dir.path().join("b.json"), "{}").unwrap();
        fs::write(dir.path().join("a.json"), "{}").unwrap();
        fs::write(dir.path().join(".hidden.json"), "{}").unwrap();
        fs::write(dir.path().join(".git/config"), "").unwrap();
        fs::write(dir.path().join("types/c.json"), "{}").unwrap();

        let rel: Vec<PathBuf> = collect_source_files(dir.path())
            .into_iter()
            .map(|f| f.rel_path)
            .collect();
        assert_eq!(
            rel,
            vec![
                PathBuf::from("a.json"),
                PathBuf::from("b.json"),
                PathBuf::from("types/c.json"),
            ]
        );
    }

    #[test]
    fn registry_records_annotated_files_only() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("item.json"),
            r#"{"properties":{"id":{"ucp_request":"omit"}}}"#,
        )
        .unwrap();
        fs::write(
            dir.path().join("shared.json"),
            r#"{"ucp_shared_request":true,"properties":{"id":{"ucp_response":"omit"}}}"#,
        )
        .unwrap();
        fs::write(dir.path().join("plain.json"), r#"{"type":"object"}"#).unwrap();
        fs::write(dir.path().join("broken.json"), "{").unwrap();

        let registry = build_registry(dir.path());
        let root = canonical_path(dir.path());
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get(&root.join("item.json")), Some(false));
        assert_eq!(registry.get(&root.join("shared.json")), Some(true));
        assert_eq!(registry.get(&root.join("plain.json")), None);
    }
}
