//! Utility functions for error handling
//!
//! File helpers that attach the path and purpose to every IO failure.

use std::fs;
use std::io;
use std::path::Path;

use crate::error::{MatchError, Result};

/// Open an existing file for reading, with rich error information
///
/// # Arguments
/// * `path` - The path to the file to open
/// * `purpose` - Why the file is being opened (for error context)
pub fn safe_open_file(path: &Path, purpose: &str) -> Result<fs::File> {
    if !path.is_file() {
        return Err(MatchError::io(
            path,
            format!("Expected a file for: {purpose}"),
            io::Error::new(io::ErrorKind::NotFound, "file not found"),
        ));
    }

    fs::File::open(path).map_err(|e| {
        let context = match e.kind() {
            io::ErrorKind::PermissionDenied => {
                "Permission denied - check file permissions".to_string()
            }
            _ => format!("Failed to open file for: {purpose}"),
        };
        MatchError::io(path, context, e)
    })
}

/// Create (or truncate) a file for writing
pub fn safe_create_file(path: &Path, purpose: &str) -> Result<fs::File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.is_dir() {
            return Err(MatchError::io(
                path,
                format!("Parent directory missing for: {purpose}"),
                io::Error::new(io::ErrorKind::NotFound, "directory not found"),
            ));
        }
    }

    fs::File::create(path)
        .map_err(|e| MatchError::io(path, format!("Failed to create file for: {purpose}"), e))
}

/// Read a whole file to string
pub fn safe_read_to_string(path: &Path, purpose: &str) -> Result<String> {
    let mut file = safe_open_file(path, purpose)?;

    let mut content = String::new();
    io::Read::read_to_string(&mut file, &mut content).map_err(|e| {
        let context = match e.kind() {
            io::ErrorKind::InvalidData => {
                "File contains invalid UTF-8 data - cannot read as text".to_string()
            }
            _ => format!("Failed to read file content for: {purpose}"),
        };
        MatchError::io(path, context, e)
    })?;

    Ok(content)
}
