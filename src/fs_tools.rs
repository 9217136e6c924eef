use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use crate::error::SessionError;

pub fn read_text_file(path: &Path) -> Result<String, SessionError> {
    fs::read_to_string(path).map_err(|err| SessionError::fs(path, err))
}

/// Creates or overwrites `path`, creating parent directories as needed.
pub fn write_file(path: &Path, content: &str) -> Result<(), SessionError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|err| SessionError::fs(parent, err))?;
    }
    fs::write(path, content).map_err(|err| SessionError::fs(path, err))
}

/// Appends to an existing text file. A separating newline is inserted first
/// when the file is non-empty and does not already end with one, so the
/// appended content always starts on a fresh line.
pub fn append_file(path: &Path, content: &str) -> Result<(), SessionError> {
    let existing = fs::read_to_string(path).map_err(|err| SessionError::fs(path, err))?;
    let mut file = OpenOptions::new()
        .append(true)
        .open(path)
        .map_err(|err| SessionError::fs(path, err))?;
    if !existing.is_empty() && !existing.ends_with('\n') {
        file.write_all(b"\n").map_err(|err| SessionError::fs(path, err))?;
    }
    file.write_all(content.as_bytes())
        .map_err(|err| SessionError::fs(path, err))
}

pub fn make_dir(path: &Path) -> Result<(), SessionError> {
    fs::create_dir_all(path).map_err(|err| SessionError::fs(path, err))
}

/// Directory listing for display: directories first with a `/` suffix,
/// names sorted case-insensitively.
pub fn list_dir(path: &Path) -> Result<Vec<String>, SessionError> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(path).map_err(|err| SessionError::fs(path, err))? {
        let entry = entry.map_err(|err| SessionError::fs(path, err))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        let is_dir = fs::metadata(entry.path()).map(|meta| meta.is_dir()).unwrap_or(false);
        entries.push((is_dir, name));
    }
    entries.sort_by_key(|(is_dir, name)| (!is_dir, name.to_lowercase(), name.clone()));
    Ok(entries
        .into_iter()
        .map(|(is_dir, name)| if is_dir { format!("{name}/") } else { name })
        .collect())
}
