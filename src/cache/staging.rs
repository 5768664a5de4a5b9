//! Temporary files holding in-progress downloads

use std::fs::File;
use std::io;
use std::path::Path;
use tempfile::NamedTempFile;

/// An owned temporary file that is removed when dropped.
///
/// The transfer layer writes into it by path; decompression consumes one
/// staging file and hands back another.
#[derive(Debug)]
pub struct StagingFile {
    file: NamedTempFile,
}

impl StagingFile {
    /// Create an empty staging file in the system temp directory
    pub fn new() -> io::Result<Self> {
        let file = tempfile::Builder::new()
            .prefix("repocache-")
            .suffix(".tmp")
            .tempfile()?;
        Ok(Self { file })
    }

    /// Path the transfer layer writes to
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Handle for writing into the staging file
    pub fn as_file(&self) -> &File {
        self.file.as_file()
    }

    /// Open a fresh read handle positioned at the start of the file
    pub fn reopen(&self) -> io::Result<File> {
        self.file.reopen()
    }
}
