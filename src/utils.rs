//! Common utilities shared across modules.

use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

/// Replace the contents of `path` without ever exposing a partial write.
///
/// The bytes land in a temporary file next to the target and are renamed
/// over it only after a successful flush, so a failure leaves the previous
/// file untouched.
pub fn write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(contents)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;

    Ok(())
}

/// True for names the repository ignores: dotfiles and dot-directories.
pub fn is_hidden_name(name: &str) -> bool {
    name.starts_with('.')
}
