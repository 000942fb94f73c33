//! Persistence of generated files.
//!
//! Nothing is written until every destination has been checked. Every file is
//! then staged as a temporary sibling, and only once all are staged are they
//! renamed into place. A failure while checking or staging leaves the output
//! directory as it was. A rename failing part way (a destination replaced by a
//! directory mid-run, say) can still leave files from two runs side by side.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use permatrix_codegen::{is_generated, GeneratedFile};
use thiserror::Error;
use tracing::debug;

/// A destination cannot be written.
#[derive(Error, Debug)]
pub enum OutputError {
    /// The file exists and was not produced by permatrix.
    #[error(
        "refusing to overwrite {} (no generated-file header; pass --force to replace it)",
        .path.display()
    )]
    NotGenerated {
        /// The existing file.
        path: PathBuf,
    },
    /// An I/O operation failed.
    #[error("{action} {}", .path.display())]
    Io {
        /// What was being done.
        action: &'static str,
        /// The path involved.
        path: PathBuf,
        /// Underlying failure.
        #[source]
        source: io::Error,
    },
}

fn io_error<'a>(action: &'static str, path: &'a Path) -> impl FnOnce(io::Error) -> OutputError + 'a {
    move |source| OutputError::Io {
        action,
        path: path.to_path_buf(),
        source,
    }
}

/// Checks whether `path` may be replaced with generated output.
///
/// A missing file, a file carrying the generated header, or `force` allows it.
///
/// # Errors
///
/// Returns [`OutputError::NotGenerated`] for a hand-written file, or
/// [`OutputError::Io`] if the existing file cannot be read.
pub fn check_overwrite(path: &Path, force: bool) -> Result<(), OutputError> {
    if force {
        return Ok(());
    }
    match fs::read_to_string(path) {
        Ok(existing) if is_generated(&existing) => Ok(()),
        Ok(_) => Err(OutputError::NotGenerated {
            path: path.to_path_buf(),
        }),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        // Not UTF-8 text, so certainly not ours.
        Err(err) if err.kind() == io::ErrorKind::InvalidData => Err(OutputError::NotGenerated {
            path: path.to_path_buf(),
        }),
        Err(err) => Err(io_error("Failed to read", path)(err)),
    }
}

fn staging_path(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{file_name}.tmp"))
}

fn stage(path: &Path, contents: &str) -> Result<PathBuf, OutputError> {
    let tmp = staging_path(path);
    fs::write(&tmp, contents).map_err(io_error("Failed to write", &tmp))?;
    Ok(tmp)
}

fn commit(tmp: &Path, path: &Path) -> Result<(), OutputError> {
    fs::rename(tmp, path).map_err(io_error("Failed to replace", path))?;
    debug!(path = %path.display(), "wrote file");
    Ok(())
}

fn discard(staged: &[PathBuf]) {
    for tmp in staged {
        let _ = fs::remove_file(tmp);
    }
}

/// Writes `contents` to `path` through a temporary file in the same directory.
///
/// # Errors
///
/// Returns [`OutputError::Io`] if the temporary file cannot be written or renamed.
pub fn write_atomic(path: &Path, contents: &str) -> Result<(), OutputError> {
    let tmp = stage(path, contents)?;
    commit(&tmp, path).inspect_err(|_| discard(std::slice::from_ref(&tmp)))
}

/// Writes every file into `out_dir`, returning the paths written in order.
///
/// All destinations are checked before anything is written, and all files are
/// staged before any destination is replaced.
///
/// # Errors
///
/// Returns the first refused destination, or the first I/O failure.
pub fn write_all(
    out_dir: &Path,
    files: &[GeneratedFile],
    force: bool,
) -> Result<Vec<PathBuf>, OutputError> {
    let paths: Vec<PathBuf> = files.iter().map(|f| out_dir.join(&f.file_name)).collect();
    for path in &paths {
        check_overwrite(path, force)?;
    }

    fs::create_dir_all(out_dir).map_err(io_error("Failed to create", out_dir))?;

    let mut staged = Vec::with_capacity(files.len());
    for (path, file) in paths.iter().zip(files) {
        match stage(path, &file.contents) {
            Ok(tmp) => staged.push(tmp),
            Err(err) => {
                discard(&staged);
                return Err(err);
            }
        }
    }

    for (i, (tmp, path)) in staged.iter().zip(&paths).enumerate() {
        if let Err(err) = commit(tmp, path) {
            discard(&staged[i..]);
            return Err(err);
        }
    }
    Ok(paths)
}
