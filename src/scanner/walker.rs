//! Directory walker implementation using walkdir.
//!
//! # Overview
//!
//! This module provides the [`Walker`] struct for traversing a directory
//! tree and collecting the regular files it contains. Entries are sorted by
//! file name within each directory, so two walks over an unchanged tree
//! yield files in the same order. That order is the "discovery order" used
//! for group ordering downstream.
//!
//! # Behavior
//!
//! - Symlinks are never followed and never reported
//! - Unreadable directories are yielded as [`ScanError`] and the walk continues
//! - Empty files are reported like any other file
//! - Hidden entries below the root can be skipped
//!
//! # Example
//!
//! ```no_run
//! use psamfinder::scanner::{Walker, WalkerConfig};
//! use std::path::Path;
//!
//! let walker = Walker::new(Path::new("/home/user/Pictures"), WalkerConfig::new(true));
//! let files: Vec<_> = walker.walk().filter_map(Result::ok).collect();
//! println!("Found {} files", files.len());
//! ```

use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

use super::{FileEntry, ScanError, WalkerConfig};

/// Sequential directory walker.
#[derive(Debug)]
pub struct Walker {
    /// Root path to walk
    root: PathBuf,
    /// Walker configuration
    config: WalkerConfig,
}

impl Walker {
    /// Create a new walker for the given path.
    #[must_use]
    pub fn new(path: &Path, config: WalkerConfig) -> Self {
        Self {
            root: path.to_path_buf(),
            config,
        }
    }

    /// Root directory of this walker.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Walk the directory tree, yielding file entries.
    ///
    /// Errors are yielded as [`ScanError`] values rather than stopping
    /// iteration.
    pub fn walk(&self) -> impl Iterator<Item = Result<FileEntry, ScanError>> + '_ {
        let skip_hidden = self.config.skip_hidden;

        WalkDir::new(&self.root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(move |entry| !(skip_hidden && entry.depth() > 0 && is_hidden(entry)))
            .filter_map(move |entry_result| match entry_result {
                Ok(entry) => self.process_entry(&entry),
                Err(e) => Some(Err(self.convert_error(e))),
            })
    }

    /// Turn a walked entry into a [`FileEntry`] when it is a regular file.
    fn process_entry(&self, entry: &DirEntry) -> Option<Result<FileEntry, ScanError>> {
        let file_type = entry.file_type();

        if file_type.is_symlink() {
            log::trace!("Skipping symlink: {}", entry.path().display());
            return None;
        }
        if !file_type.is_file() {
            return None;
        }

        let metadata = match entry.metadata() {
            Ok(m) => m,
            Err(e) => return Some(Err(self.convert_error(e))),
        };

        let mut file = FileEntry::new(entry.path().to_path_buf(), metadata.len());
        if let Ok(modified) = metadata.modified() {
            file = file.with_modified(modified);
        }

        log::trace!("Found file: {} ({} bytes)", file.path.display(), file.size);
        Some(Ok(file))
    }

    fn convert_error(&self, error: walkdir::Error) -> ScanError {
        let path = error
            .path()
            .map_or_else(|| self.root.clone(), Path::to_path_buf);
        let message = error.to_string();

        match error.into_io_error() {
            Some(io_error) => ScanError::from_io(&path, io_error),
            None => ScanError::Traversal { path, message },
        }
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_str().is_some_and(|s| s.starts_with('.'))
}
