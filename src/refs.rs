//! Reference resolution and variant file naming.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::loader::normalize_path;
use crate::types::{Selector, Variant};

/// Annotated documents of one run: canonical source path → shared-request flag.
///
/// Built completely in pass 1 and only read afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registry {
    entries: BTreeMap<PathBuf, bool>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: PathBuf, shared: bool) {
        self.entries.insert(path, shared);
    }

    /// Shared flag for a registered path.
    pub fn get(&self, path: &Path) -> Option<bool> {
        self.entries.get(path).copied()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Path, bool)> {
        self.entries.iter().map(|(p, s)| (p.as_path(), *s))
    }

    /// Resolve `reference` from `containing_file` to a registered target.
    ///
    /// Returns the target path and its shared flag, or `None` when the ref is
    /// not a local file ref or its target is not annotated.
    pub fn lookup(&self, reference: &str, containing_file: &Path) -> Option<(PathBuf, bool)> {
        let target = resolve_ref_path(reference, containing_file)?;
        let shared = self.get(&target)?;
        Some((target, shared))
    }

    /// Registered paths under `base`, relative to it, with `/` separators.
    pub fn relative_to(&self, base: &Path) -> Vec<String> {
        self.entries
            .keys()
            .filter_map(|p| p.strip_prefix(base).ok())
            .map(|rel| {
                rel.components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/")
            })
            .collect()
    }
}

/// Split a ref into its file part and anchor (`#...`, possibly empty).
pub fn split_anchor(reference: &str) -> (&str, &str) {
    match reference.find('#') {
        Some(idx) => reference.split_at(idx),
        None => (reference, ""),
    }
}

/// Returns true for refs carrying a URL scheme (`https://...`, `urn:...`).
fn has_scheme(reference: &str) -> bool {
    match reference.find(':') {
        Some(idx) => {
            let scheme = &reference[..idx];
            // A single letter is a Windows drive, not a scheme
            scheme.len() > 1
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        None => false,
    }
}

/// Resolve a `$ref` to the canonical path of the file it targets.
///
/// Returns `None` for anchor-only refs, URLs, and empty file parts.
/// Resolution is purely lexical; the target is not required to exist.
pub fn resolve_ref_path(reference: &str, containing_file: &Path) -> Option<PathBuf> {
    let (file_part, _) = split_anchor(reference);
    if file_part.is_empty() || has_scheme(file_part) {
        return None;
    }
    let dir = containing_file.parent().unwrap_or(Path::new(""));
    Some(normalize_path(&dir.join(file_part)))
}

/// Split a path string into stem and extension at the last `.` of its final
/// component. A leading dot does not start an extension.
pub fn split_extension(path: &str) -> (&str, &str) {
    let name_start = path.rfind('/').map(|i| i + 1).unwrap_or(0);
    match path[name_start..].rfind('.') {
        Some(0) | None => (path, ""),
        Some(dot) => path.split_at(name_start + dot),
    }
}

/// Insert `suffix` between stem and extension: `a/foo.json` → `a/foo_resp.json`.
pub fn with_suffix(path: &str, suffix: &str) -> String {
    let (stem, ext) = split_extension(path);
    format!("{}{}{}", stem, suffix, ext)
}

/// Variant a ref to a registered target should point at under `selector`.
pub fn target_variant(selector: Selector, shared: bool) -> Variant {
    match selector {
        Selector::Response => Variant::Response,
        Selector::Request(_) if shared => Variant::SharedRequest,
        Selector::Request(op) => Variant::Request(op),
    }
}

/// Rewrite a `$ref` whose target is annotated to point at the variant file
/// matching `selector`. Any anchor is preserved. Other refs are returned
/// unchanged.
pub fn rewrite_ref(
    reference: &str,
    containing_file: &Path,
    registry: &Registry,
    selector: Selector,
) -> String {
    let Some((_, shared)) = registry.lookup(reference, containing_file) else {
        return reference.to_string();
    };

    let (file_part, anchor) = split_anchor(reference);
    let suffix = target_variant(selector, shared).file_suffix();
    format!("{}{}", with_suffix(file_part, &suffix), anchor)
}
