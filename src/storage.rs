//! Filesystem helpers for key files.

use chrono::Local;
use std::fs::{self, File, OpenOptions};
use std::io::Read;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info};
use zeroize::Zeroizing;

use crate::error::{KeyFileError, Result};

/// Arguments for [`create_file`].
#[derive(Debug, Clone)]
pub struct CreateFileArgs {
    /// Directory the file is created in. Created if missing.
    pub directory: PathBuf,
    /// Optional file name prefix, joined to the timestamp with a dash.
    pub prefix: String,
    /// Extension without the leading dot.
    pub file_extension: String,
}

/// Resolves `path` against the current directory and removes `.` and `..`
/// components lexically.
pub fn absolute_path(path: &Path) -> Result<PathBuf> {
    let abs = std::path::absolute(path).map_err(|e| KeyFileError::io(path, e))?;

    let mut cleaned = PathBuf::new();
    for component in abs.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                cleaned.pop();
            }
            other => cleaned.push(other),
        }
    }

    Ok(cleaned)
}

/// Opens the file at `path` read-only. The caller closes it by dropping the handle.
///
/// # Errors
///
/// Returns [`KeyFileError::Io`] carrying the resolved path if the file cannot be opened.
pub fn open_file(path: &Path) -> Result<File> {
    let path = absolute_path(path)?;
    File::open(&path).map_err(|e| KeyFileError::io(path, e))
}

/// Reads the whole file at `path` into memory.
///
/// The handle is released before returning, on success and on error.
pub fn read_file(path: &Path) -> Result<Zeroizing<Vec<u8>>> {
    let path = absolute_path(path)?;
    let mut file = File::open(&path).map_err(|e| KeyFileError::io(&path, e))?;
    // sized up front so the secret bytes are not left behind in reallocations
    let size = file
        .metadata()
        .ok()
        .and_then(|m| usize::try_from(m.len()).ok())
        .unwrap_or(0);
    let mut buf = Zeroizing::new(Vec::with_capacity(size));
    file.read_to_end(&mut buf)
        .map_err(|e| KeyFileError::io(&path, e))?;

    debug!(path = %path.display(), bytes = buf.len(), "read key file");
    Ok(buf)
}

/// Opens `path` for appending, creating it and its parent directories if needed.
///
/// New files are readable and writable by the owner only.
pub fn open_for_append(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| KeyFileError::io(parent, e))?;
    }

    append_options()
        .open(path)
        .map_err(|e| KeyFileError::io(path, e))
}

/// Creates a timestamped file in `args.directory`, named
/// `<prefix>-YYYY-MM-DD-HH-MM-SS.<extension>`.
///
/// An existing file with the same name is appended to. Returns the open handle
/// and the absolute path of the file.
pub fn create_file(args: &CreateFileArgs) -> Result<(File, PathBuf)> {
    let dir = absolute_path(&args.directory)?;
    fs::create_dir_all(&dir).map_err(|e| KeyFileError::io(&dir, e))?;

    let path = dir.join(timestamped_name(&args.prefix, &args.file_extension));
    let file = append_options()
        .open(&path)
        .map_err(|e| KeyFileError::io(&path, e))?;

    info!(path = %path.display(), "created key file");
    Ok((file, path))
}

fn timestamped_name(prefix: &str, extension: &str) -> String {
    let stamp = Local::now().format("%Y-%m-%d-%H-%M-%S").to_string();
    if prefix.is_empty() {
        format!("{stamp}.{extension}")
    } else {
        format!("{prefix}-{stamp}.{extension}")
    }
}

fn append_options() -> OpenOptions {
    let mut options = OpenOptions::new();
    options.create(true).append(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    options
}
