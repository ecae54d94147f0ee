//! File system helpers.

use std::{error, fmt, fs, io};
use std::borrow::Cow;
use std::io::Write;
use std::path::{Path, PathBuf};
use log::trace;
use tempfile::NamedTempFile;


/// Creates a directory and all its parents if it does not exist yet.
pub fn create_dir_all(dir: &Path) -> Result<(), FileError> {
    if !dir.is_dir() {
        fs::create_dir_all(dir).map_err(|err| {
            FileError::new(
                format!("could not create dir '{}'", dir.display()), err
            )
        })?;
    }
    Ok(())
}

/// Reads a file.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn read_opt(path: &Path) -> Result<Option<Vec<u8>>, FileError> {
    match fs::read(path) {
        Ok(content) => Ok(Some(content)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => {
            Err(FileError::new(
                format!("could not read '{}'", path.display()), err
            ))
        }
    }
}

/// Replaces the content of a file.
///
/// The content is written to a temporary file in the same directory which
/// is then renamed to the final path, so readers will either see the old
/// or the new content but never a partially written file. If `sync` is
/// set, the temporary file is flushed to disk before the rename.
///
/// The directory of the file must exist.
pub fn save_atomic(
    content: &[u8], path: &Path, sync: bool
) -> Result<(), FileError> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };

    // tempfile removes the temporary file again if anything goes wrong
    // before it is persisted.
    let mut tmp_file = NamedTempFile::new_in(dir).map_err(|err| {
        FileError::new(
            format!("could not create temp file in '{}'", dir.display()),
            err
        )
    })?;

    tmp_file.write_all(content).map_err(|err| {
        FileError::new(
            format!(
                "could not write temp file '{}'",
                tmp_file.path().display()
            ),
            err
        )
    })?;

    if sync {
        tmp_file.as_file().sync_all().map_err(|err| {
            FileError::new(
                format!(
                    "could not sync temp file '{}'",
                    tmp_file.path().display()
                ),
                err
            )
        })?;
    }

    tmp_file.persist(path).map_err(|err| {
        FileError::new(
            format!(
                "could not rename temp file '{}' to '{}'",
                err.file.path().display(),
                path.display()
            ),
            err.error
        )
    })?;

    trace!("Saved file: {}", path.display());
    Ok(())
}

/// Deletes a file.
pub fn delete_file(path: &Path) -> Result<(), FileError> {
    trace!("Removing file: {}", path.display());
    fs::remove_file(path).map_err(|err| {
        FileError::new(
            format!("could not remove file '{}'", path.display()), err
        )
    })
}

/// Returns the paths of all regular files in a directory.
///
/// The result is sorted by file name.
pub fn list_files(dir: &Path) -> Result<Vec<PathBuf>, FileError> {
    let entries = fs::read_dir(dir).map_err(|err| {
        FileError::new(
            format!("could not read directory '{}'", dir.display()), err
        )
    })?;
    let mut res = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| {
            FileError::new(
                format!("could not read directory '{}'", dir.display()),
                err
            )
        })?;
        let path = entry.path();
        if path.is_file() {
            res.push(path)
        }
    }
    res.sort();
    Ok(res)
}


//------------ FileError -----------------------------------------------------

/// An I/O error with some context of what we were trying to do.
#[derive(Debug)]
pub struct FileError {
    context: Cow<'static, str>,
    cause: io::Error,
}

impl FileError {
    pub fn new(context: impl Into<Cow<'static, str>>, cause: io::Error) -> Self {
        FileError { context: context.into(), cause }
    }

    pub fn kind(&self) -> io::ErrorKind {
        self.cause.kind()
    }
}

impl fmt::Display for FileError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {}", self.context, self.cause)
    }
}

impl error::Error for FileError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        Some(&self.cause)
    }
}


//============ Tests =========================================================
