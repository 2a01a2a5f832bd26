use std::fs::File;
use std::path::Path;

use crate::error::{ExploreError, Result};

pub(crate) fn ensure_not_empty<T>(items: &[T]) -> Result<()> {
    if items.is_empty() {
        return Err(ExploreError::configuration("No results to export"));
    }

    Ok(())
}

/// Create `path`, creating missing parent directories first.
pub(crate) fn create_output_file(path: impl AsRef<Path>) -> Result<File> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(File::create(path)?)
}
