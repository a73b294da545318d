// Utility functions
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Turns a label or code into a lowercase file-name stem: `Body Mass Index` -> `body_mass_index`.
pub fn to_snake_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.trim().chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.ends_with('_') && !out.is_empty() {
            out.push('_');
        }
    }
    while out.ends_with('_') {
        out.pop();
    }
    if out.is_empty() { "unnamed".to_string() } else { out }
}

/// Output sub-directory name for an input file, taken from its stem.
pub fn source_slug(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    to_snake_case(&stem)
}

/// One distinct output folder name per input; a repeated stem gets `_2`, `_3`, ...
pub fn output_slugs(inputs: &[PathBuf]) -> Vec<String> {
    let mut used = HashSet::new();
    inputs
        .iter()
        .map(|input| {
            let base = source_slug(input);
            let mut slug = base.clone();
            let mut n = 1;
            while !used.insert(slug.clone()) {
                n += 1;
                slug = format!("{}_{}", base, n);
            }
            slug
        })
        .collect()
}
