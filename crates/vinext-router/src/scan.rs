use std::path::Path;

use tracing::debug;
use walkdir::WalkDir;

use crate::error::RouterError;

/// Lists every file under `root` as a sorted, `/`-separated relative path
///
/// Hidden entries (`.git`, `.DS_Store`) are skipped with their subtrees. A
/// missing root yields an empty list, since projects often have only one of
/// `app/` and `pages/`.
pub fn list_files(root: &Path) -> Result<Vec<String>, RouterError> {
    if !root.is_dir() {
        debug!(root = %root.display(), "route directory not present");
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    let walker = WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry.file_name()));

    for entry in walker {
        let entry = entry.map_err(|source| RouterError::Scan {
            root: root.to_path_buf(),
            source,
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        let parts: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        files.push(parts.join("/"));
    }

    files.sort();
    Ok(files)
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_str().is_some_and(|s| s.starts_with('.'))
}
