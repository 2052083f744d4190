//! Append-only PEM files holding labelled secret keys.
//!
//! Each key is stored as one PEM block whose type is
//! `PRIVATE KEY for <identifier>`, where the identifier names the public key
//! scheme or account the secret belongs to. Keys are appended one block at a
//! time and read back either by position or all at once.
//!
//! ```no_run
//! use pemkeys::{SecretKeyWriter, load_sk_from_pem_file};
//!
//! # fn main() -> pemkeys::Result<()> {
//! let mut writer = SecretKeyWriter::open_append("validatorKey.pem")?;
//! writer.append("Ed25519", &[0x01, 0x02])?;
//! writer.close()?;
//!
//! let (sk, identifier) = load_sk_from_pem_file("validatorKey.pem", 0)?;
//! assert_eq!(identifier, "Ed25519");
//! assert_eq!(&sk[..], &[0x01, 0x02]);
//! # Ok(())
//! # }
//! ```

mod error;
pub mod format;
mod keyfile;
pub mod storage;

use directories::ProjectDirs;
use std::path::PathBuf;

pub use crate::error::{FormatViolation, KeyFileError, Result};
pub use crate::format::PK_PEM_PREFIX;
pub use crate::keyfile::{
    LoadedKeys, SecretKeyWriter, all_secret_keys, load_all_keys_from_pem_file,
    load_sk_from_pem_file, save_sk_to_pem, secret_key_at,
};
pub use crate::storage::CreateFileArgs;

/// Platform data directory new key files are created in when no directory is given.
pub fn default_key_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "pemkeys").map(|dirs| dirs.data_dir().join("keys"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn write_two_keys_then_read_them_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("keys.pem");

        let mut writer = SecretKeyWriter::open_append(&path).unwrap();
        writer.append("Ed25519", &[0x01, 0x02]).unwrap();
        writer.append("BLS", &[0xAA]).unwrap();
        writer.close().unwrap();

        let (sk, identifier) = load_sk_from_pem_file(&path, 1).unwrap();
        assert_eq!(identifier, "BLS");
        assert_eq!(&sk[..], &[0xAA]);

        let (sks, identifiers) = load_all_keys_from_pem_file(&path).unwrap().into_parts();
        assert_eq!(identifiers, vec!["Ed25519".to_string(), "BLS".to_string()]);
        assert_eq!(sks.len(), 2);
        assert_eq!(&sks[0][..], &[0x01, 0x02]);
        assert_eq!(&sks[1][..], &[0xAA]);
    }

    #[test]
    fn every_written_block_starts_with_the_prefix() {
        let mut buf = Vec::new();
        save_sk_to_pem(&mut buf, "Ed25519", &[1, 2, 3]).unwrap();

        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with(&format!("-----BEGIN {PK_PEM_PREFIX}Ed25519-----")));
    }

    #[test]
    fn default_key_dir_ends_in_keys() {
        if let Some(dir) = default_key_dir() {
            assert!(dir.ends_with("keys"));
        }
    }
}
