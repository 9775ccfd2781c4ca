use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::config::Config;
use crate::error::Error;

/// A markdown document read from disk.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    /// Document text.
    pub content: String,
    /// Document name: relative path without extension, `/`-separated.
    pub name: String,
    /// Path relative to the project root.
    pub path: PathBuf,
}

/// Document name for a relative markdown path: `docs/options.md` -> `docs/options`.
pub fn document_name(relative: &Path) -> String {
    let without_extension = relative.with_extension("");
    return without_extension
        .components()
        .map(|c| return c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/");
}

/// Read every markdown document under `root` that the config lets through.
/// Documents come back sorted by name so that builds are reproducible.
///
/// # Errors
///
/// Returns `Error::Io` if any markdown file cannot be read.
pub fn scan(root: &Path, config: &Config) -> Result<Vec<SourceDocument>, Error> {
    let mut documents = Vec::new();

    for entry in WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| return e.file_type().is_file())
        .filter(|e| return e.path().extension().is_some_and(|ext| return ext == "md"))
    {
        let md_path = entry.path();
        let relative = md_path.strip_prefix(root).unwrap_or(md_path).to_path_buf();

        let relative_str = relative.to_string_lossy().replace('\\', "/");
        if !config.should_scan(&relative_str) {
            tracing::debug!(path = %relative_str, "skipped by config");
            continue;
        }

        let content = std::fs::read_to_string(md_path)?;
        documents.push(SourceDocument {
            content,
            name: document_name(&relative),
            path: relative,
        });
    }

    documents.sort_by(|a, b| return a.name.cmp(&b.name));
    tracing::info!(count = documents.len(), "scanned documents");
    return Ok(documents);
}
