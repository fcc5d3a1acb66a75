//! Candidate module discovery.

use std::path::Path;

use modhost_core::{Error, Result};
use tracing::debug;

/// Marks folders the scan skips.
const HIDDEN_PREFIX: char = '.';

pub fn is_hidden(name: &str) -> bool {
    name.starts_with(HIDDEN_PREFIX)
}

/// Names of the modules to enumerate.
///
/// A non-empty explicit selection is returned as given, in caller order.
/// Otherwise every immediate subfolder of `modules_dir` is a candidate,
/// sorted by name. Hidden names are dropped either way.
pub async fn discover<S: AsRef<str>>(modules_dir: &Path, explicit: &[S]) -> Result<Vec<String>> {
    if !explicit.is_empty() {
        return Ok(explicit
            .iter()
            .map(|s| s.as_ref())
            .filter(|name| {
                let hidden = is_hidden(name);
                if hidden {
                    debug!("Skipping hidden module '{}'", name);
                }
                !hidden
            })
            .map(String::from)
            .collect());
    }

    let discovery_error = |source| Error::Discovery {
        path: modules_dir.to_path_buf(),
        source,
    };

    let mut entries = tokio::fs::read_dir(modules_dir)
        .await
        .map_err(discovery_error)?;

    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(discovery_error)? {
        let name = entry.file_name().to_string_lossy().to_string();
        if is_hidden(&name) {
            continue;
        }
        if entry.file_type().await.map_err(discovery_error)?.is_dir() {
            names.push(name);
        }
    }
    names.sort();

    debug!("Discovered {} module folders in {}", names.len(), modules_dir.display());
    Ok(names)
}
