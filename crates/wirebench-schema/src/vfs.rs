//! Virtual source files — import resolution for uploaded proto blobs.
//!
//! Uploads arrive as flat `(logical path, bytes)` pairs with no real
//! directory structure, yet their `import` statements reference files the
//! way the author's original tree was laid out. Before compilation the
//! registry rewrites every import whose **basename** matches an uploaded
//! file so the import path equals the actual uploaded filename; the
//! rewritten set then compiles from a single import root.
//!
//! Well-known imports (paths under `google/protobuf/`) are never rewritten —
//! the compiler resolves those from its built-in descriptors.
//!
//! A basename shared by more than one upload makes resolution ambiguous;
//! that is a hard error naming all candidates, never a silent pick.

use std::collections::BTreeMap;

use crate::error::{Error, Result};

/// Import prefix reserved for the compiler's built-in well-known types.
pub const WELL_KNOWN_PREFIX: &str = "google/protobuf/";

/// Whether `path` belongs to the compiler's built-in well-known types.
#[must_use]
pub fn is_well_known(path: &str) -> bool {
    path.starts_with(WELL_KNOWN_PREFIX)
}

/// The bare filename of a logical path.
#[must_use]
pub fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Build the basename → uploaded-paths index over non-well-known uploads.
///
/// `BTreeMap` keys and the per-basename path lists keep a stable order so
/// ambiguity errors are deterministic.
#[must_use]
pub fn basename_index<V>(files: &BTreeMap<String, V>) -> BTreeMap<String, Vec<String>> {
    let mut index: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for path in files.keys() {
        if is_well_known(path) {
            continue;
        }
        index
            .entry(basename(path).to_string())
            .or_default()
            .push(path.clone());
    }
    index
}

/// Rewrite every `import "X";` statement whose basename matches an uploaded
/// file so the import path equals the actual uploaded filename.
///
/// Well-known imports and imports matching no upload are left untouched
/// (the latter surface as the compiler's own missing-file diagnostic).
///
/// # Errors
///
/// Returns [`Error::AmbiguousImport`] when an import's basename matches more
/// than one uploaded file.
pub fn rewrite_imports(source: &str, index: &BTreeMap<String, Vec<String>>) -> Result<String> {
    let mut out = String::with_capacity(source.len());
    for line in source.lines() {
        rewrite_import_line(line, index, &mut out)?;
        out.push('\n');
    }
    Ok(out)
}

/// Rewrite a single line, appending the result to `out`.
fn rewrite_import_line(
    line: &str,
    index: &BTreeMap<String, Vec<String>>,
    out: &mut String,
) -> Result<()> {
    let trimmed = line.trim_start();
    // Must be an `import` statement, not an identifier that merely starts
    // with the word (`imports`, `important_field`, ...).
    let is_import = trimmed
        .strip_prefix("import")
        .is_some_and(|rest| rest.starts_with(char::is_whitespace) || rest.starts_with('"'));
    if !is_import {
        out.push_str(line);
        return Ok(());
    }
    let Some(open) = line.find('"') else {
        out.push_str(line);
        return Ok(());
    };
    let Some(close) = line[open + 1..].find('"').map(|i| open + 1 + i) else {
        out.push_str(line);
        return Ok(());
    };
    let path = &line[open + 1..close];
    if is_well_known(path) {
        out.push_str(line);
        return Ok(());
    }
    match index.get(basename(path)) {
        Some(candidates) if candidates.len() == 1 => {
            out.push_str(&line[..=open]);
            out.push_str(&candidates[0]);
            out.push_str(&line[close..]);
            Ok(())
        }
        Some(candidates) => Err(Error::AmbiguousImport {
            import: basename(path).to_string(),
            candidates: candidates.clone(),
        }),
        None => {
            out.push_str(line);
            Ok(())
        }
    }
}
