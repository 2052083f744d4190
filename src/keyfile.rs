//! Reading and appending secret keys in a PEM key file.
//!
//! Keys are addressed only by their position in the file. Reads always scan
//! from the start of the file; writes always append.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::error::{FormatViolation, KeyFileError, Result};
use crate::format::{self, frame};
use crate::storage::{self, CreateFileArgs};

/// Every secret key of a file, as two sequences in file order.
///
/// `secret_keys()[i]` was stored under `identifiers()[i]`.
#[derive(Debug, Default)]
pub struct LoadedKeys {
    secret_keys: Vec<Zeroizing<Vec<u8>>>,
    identifiers: Vec<String>,
}

impl LoadedKeys {
    pub fn secret_keys(&self) -> &[Zeroizing<Vec<u8>>] {
        &self.secret_keys
    }

    pub fn identifiers(&self) -> &[String] {
        &self.identifiers
    }

    pub fn len(&self) -> usize {
        self.identifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identifiers.is_empty()
    }

    /// Iterates `(identifier, secret key)` pairs in file order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.identifiers
            .iter()
            .map(String::as_str)
            .zip(self.secret_keys.iter().map(|sk| sk.as_slice()))
    }

    pub fn into_parts(self) -> (Vec<Zeroizing<Vec<u8>>>, Vec<String>) {
        (self.secret_keys, self.identifiers)
    }

    fn push(&mut self, secret_key: Vec<u8>, identifier: String) {
        self.secret_keys.push(Zeroizing::new(secret_key));
        self.identifiers.push(identifier);
    }
}

fn invalid_format(reason: FormatViolation) -> KeyFileError {
    if let FormatViolation::MissingPrefix { found, .. } = &reason {
        warn!(block_type = %found, "PEM block is not a secret key block");
    }
    KeyFileError::InvalidFormat { path: None, reason }
}

/// Returns the secret key and identifier of the block at position `index` in `buf`.
///
/// Only the selected block has to carry the key prefix; the blocks before it
/// are decoded but not inspected.
///
/// # Errors
///
/// - [`KeyFileError::InvalidIndex`] if `index` is negative or the buffer holds
///   fewer than `index + 1` blocks
/// - [`KeyFileError::EmptyFile`] if `buf` is empty
/// - [`KeyFileError::InvalidFormat`] if a block up to `index` is malformed or the
///   selected block lacks the prefix
pub fn secret_key_at(buf: &[u8], index: isize) -> Result<(Zeroizing<Vec<u8>>, String)> {
    let Ok(target) = usize::try_from(index) else {
        return Err(KeyFileError::InvalidIndex {
            path: None,
            index,
            found: 0,
        });
    };
    if buf.is_empty() {
        return Err(KeyFileError::EmptyFile { path: None });
    }

    let mut rest = buf;
    let mut selected = None;
    for position in 0..=target {
        if rest.is_empty() {
            // fewer keys in the file than requested
            return Err(KeyFileError::InvalidIndex {
                path: None,
                index,
                found: position,
            });
        }

        let (block, remaining) =
            frame::next_block(rest).ok_or_else(|| invalid_format(FormatViolation::MalformedBlock))?;
        debug!(position, "decoded PEM block");
        selected = Some(block);
        rest = remaining;
    }

    let Some(block) = selected else {
        return Err(invalid_format(FormatViolation::MalformedBlock));
    };

    let identifier = format::identifier_from_tag(block.tag())
        .map_err(invalid_format)?
        .to_string();

    Ok((Zeroizing::new(block.into_contents()), identifier))
}

/// Decodes every block in `buf`, in file order.
///
/// Nothing is returned unless every block decodes and carries the key prefix.
///
/// # Errors
///
/// - [`KeyFileError::EmptyFile`] if `buf` is empty
/// - [`KeyFileError::InvalidFormat`] on the first malformed or foreign block
pub fn all_secret_keys(buf: &[u8]) -> Result<LoadedKeys> {
    if buf.is_empty() {
        return Err(KeyFileError::EmptyFile { path: None });
    }

    let mut keys = LoadedKeys::default();
    let mut rest = buf;
    while !rest.is_empty() {
        let (block, remaining) =
            frame::next_block(rest).ok_or_else(|| invalid_format(FormatViolation::MalformedBlock))?;
        rest = remaining.trim_ascii_start();

        let identifier = format::identifier_from_tag(block.tag())
            .map_err(invalid_format)?
            .to_string();
        debug!(position = keys.len(), identifier = %identifier, "decoded secret key block");

        keys.push(block.into_contents(), identifier);
    }

    Ok(keys)
}

/// Loads the secret key stored at position `index` of the file at `path`.
///
/// Returns the secret key bytes and the identifier it was stored under. A
/// negative `index` is rejected before the file is opened.
pub fn load_sk_from_pem_file(
    path: impl AsRef<Path>,
    index: isize,
) -> Result<(Zeroizing<Vec<u8>>, String)> {
    let path = path.as_ref();
    if index < 0 {
        return Err(KeyFileError::InvalidIndex {
            path: Some(path.to_path_buf()),
            index,
            found: 0,
        });
    }

    let buf = storage::read_file(path)?;
    secret_key_at(&buf, index).map_err(|e| e.with_path(path))
}

/// Loads every secret key stored in the file at `path`.
pub fn load_all_keys_from_pem_file(path: impl AsRef<Path>) -> Result<LoadedKeys> {
    let path = path.as_ref();
    let buf = storage::read_file(path)?;
    all_secret_keys(&buf).map_err(|e| e.with_path(path))
}

/// Writes one secret key block to `writer`.
pub fn save_sk_to_pem<W: Write>(writer: &mut W, identifier: &str, sk: &[u8]) -> std::io::Result<()> {
    let encoded = Zeroizing::new(format::encode_secret_key(identifier, sk));
    writer.write_all(encoded.as_bytes())
}

/// Appends secret keys to a key file or any other writer.
///
/// The writer owns its handle until [`close`](Self::close) is called; appending
/// after that fails with [`KeyFileError::NilStream`].
#[derive(Debug)]
pub struct SecretKeyWriter<W: Write> {
    inner: Option<W>,
    path: Option<PathBuf>,
}

impl SecretKeyWriter<File> {
    /// Creates a new timestamped key file, see [`storage::create_file`].
    pub fn create(args: &CreateFileArgs) -> Result<Self> {
        let (file, path) = storage::create_file(args)?;
        Ok(Self {
            inner: Some(file),
            path: Some(path),
        })
    }

    /// Opens `path` for appending, creating the file if it does not exist.
    pub fn open_append(path: impl AsRef<Path>) -> Result<Self> {
        let path = storage::absolute_path(path.as_ref())?;
        let file = storage::open_for_append(&path)?;
        Ok(Self {
            inner: Some(file),
            path: Some(path),
        })
    }
}

impl<W: Write> SecretKeyWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner: Some(inner),
            path: None,
        }
    }

    /// Path of the underlying file, if the writer was opened from one.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_none()
    }

    /// Appends `sk` as a block labelled with `identifier`.
    ///
    /// The identifier is not validated and may be empty, as may `sk`.
    ///
    /// # Errors
    ///
    /// Returns [`KeyFileError::NilStream`] after [`close`](Self::close), or the
    /// underlying write error.
    pub fn append(&mut self, identifier: &str, sk: &[u8]) -> Result<()> {
        let writer = self.inner.as_mut().ok_or(KeyFileError::NilStream)?;

        save_sk_to_pem(writer, identifier, sk).map_err(|source| KeyFileError::Io {
            path: self.path.clone(),
            source,
        })?;

        info!(identifier, path = ?self.path, "appended secret key");
        Ok(())
    }

    /// Flushes and releases the handle. Closing twice is a no-op.
    pub fn close(&mut self) -> Result<()> {
        if let Some(mut writer) = self.inner.take() {
            writer.flush().map_err(|source| KeyFileError::Io {
                path: self.path.clone(),
                source,
            })?;
        }
        Ok(())
    }

    /// Returns the underlying writer, or `None` if it was closed.
    pub fn into_inner(self) -> Option<W> {
        self.inner
    }
}
