// SPDX-License-Identifier: GPL-3.0-only

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Temporary files handed to external tools.
///
/// Every path allocated here stays on disk until [`TempFiles::cleanup`] runs
/// (or the set is dropped), so a tool may keep reading its input after the
/// call that created it returned.
#[derive(Debug, Default)]
pub struct TempFiles {
    paths: Vec<PathBuf>,
}

impl TempFiles {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a uniquely named empty file and tracks it
    ///
    /// # Errors
    /// Returns the I/O error if the file cannot be created
    pub fn allocate(&mut self, suffix: &str) -> io::Result<PathBuf> {
        let file = tempfile::Builder::new()
            .prefix("shotux-")
            .suffix(suffix)
            .tempfile()?;
        let (_, path) = file.keep().map_err(|err| err.error)?;
        log::debug!("allocated temporary file {}", path.display());
        self.paths.push(path.clone());
        Ok(path)
    }

    #[must_use]
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Deletes every tracked file. Never fails; paths already gone are skipped.
    pub fn cleanup(&mut self) {
        for path in self.paths.drain(..) {
            remove_quietly(&path);
        }
    }
}

impl Drop for TempFiles {
    fn drop(&mut self) {
        self.cleanup();
    }
}

fn remove_quietly(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => log::debug!("removed temporary file {}", path.display()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => log::warn!("failed to remove temporary file {}: {err}", path.display()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocated_files_exist_until_cleanup() {
        let mut temp_files = TempFiles::new();
        let first = temp_files.allocate(".png").unwrap();
        let second = temp_files.allocate(".png").unwrap();

        assert_ne!(first, second);
        assert!(first.exists() && second.exists());
        assert!(first.to_string_lossy().ends_with(".png"));

        temp_files.cleanup();
        assert!(!first.exists());
        assert!(!second.exists());
        assert!(temp_files.is_empty());
    }

    #[test]
    fn cleanup_is_idempotent() {
        let mut temp_files = TempFiles::new();
        temp_files.cleanup();

        let path = temp_files.allocate(".png").unwrap();
        temp_files.cleanup();
        temp_files.cleanup();
        assert!(!path.exists());
    }

    #[test]
    fn cleanup_tolerates_files_removed_elsewhere() {
        let mut temp_files = TempFiles::new();
        let path = temp_files.allocate(".png").unwrap();
        fs::remove_file(&path).unwrap();

        temp_files.cleanup();
        assert!(temp_files.is_empty());
    }

    #[test]
    fn drop_removes_files() {
        let path = {
            let mut temp_files = TempFiles::new();
            temp_files.allocate(".png").unwrap()
        };
        assert!(!path.exists());
    }
}
