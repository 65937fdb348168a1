// Copyright (c) Microsoft. All rights reserved.

//! Permission-hardened storage for generated key pairs.
//!
//! Every request gets its own directory under `<root>/<kind>/`, named with a
//! fresh random disambiguator so that concurrent requests can never write to
//! the same place. Directories are `0700`, private files `0600`, public files
//! `0644`, regardless of the process umask.

use std::io::Write;
use std::os::unix::fs::{DirBuilderExt, OpenOptionsExt, PermissionsExt};
use std::path::{Path, PathBuf};

/// The kind of credential being stored. Doubles as the fixed directory name
/// under the storage root.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum KeyKind {
    Ssh,
    Rsa,
    Pgp,
}

impl KeyKind {
    pub(crate) const ALL: [KeyKind; 3] = [KeyKind::Ssh, KeyKind::Rsa, KeyKind::Pgp];

    pub(crate) fn as_str(self) -> &'static str {
        match self {
            KeyKind::Ssh => "ssh",
            KeyKind::Rsa => "rsa",
            KeyKind::Pgp => "pgp",
        }
    }
}

/// The two files a persisted key pair consists of.
#[derive(Debug)]
pub struct StoredKeyPair {
    pub directory: PathBuf,
    pub private_path: PathBuf,
    pub public_path: PathBuf,
}

#[derive(Debug)]
pub(crate) enum CreateDirError {
    Entropy(openssl::error::ErrorStack),
    Io(std::io::Error),
    OutsideRoot(PathBuf),
}

impl std::fmt::Display for CreateDirError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CreateDirError::Entropy(_) => f.write_str("could not generate directory name"),
            CreateDirError::Io(_) => f.write_str("could not create output directory"),
            CreateDirError::OutsideRoot(path) => {
                write!(f, "directory {:?} escapes the storage root", path)
            }
        }
    }
}

impl std::error::Error for CreateDirError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CreateDirError::Entropy(err) => Some(err),
            CreateDirError::Io(err) => Some(err),
            CreateDirError::OutsideRoot(_) => None,
        }
    }
}

pub(crate) struct Storage {
    root: PathBuf,
}

impl Storage {
    /// Prepares the storage tree: the root and one `0700` subdirectory per
    /// key kind. The root is canonicalized once here; every path later
    /// handed out is checked against it.
    pub(crate) fn new(root: &Path) -> std::io::Result<Self> {
        std::fs::create_dir_all(root)?;
        let root = root.canonicalize()?;

        for kind in KeyKind::ALL {
            let path = root.join(kind.as_str());
            match std::fs::DirBuilder::new().mode(0o700).create(&path) {
                Ok(()) => (),
                Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => (),
                Err(err) => return Err(err),
            }
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o700))?;
        }

        Ok(Storage { root })
    }

    /// Creates the per-request output directory for `label` and returns its
    /// canonical path.
    ///
    /// Only the filename component of `label` is used; a fresh random
    /// disambiguator makes the directory unique per request. After creation
    /// the canonicalized result must still be under the storage root; this
    /// check is the traversal defense and does not rely on any upstream
    /// sanitization.
    pub(crate) fn create_output_directory(
        &self,
        kind: KeyKind,
        label: &str,
    ) -> Result<PathBuf, CreateDirError> {
        let dir_name = match Path::new(label).file_name().and_then(std::ffi::OsStr::to_str) {
            Some(name) => format!("{name}-{}", random_hex(4).map_err(CreateDirError::Entropy)?),
            None => random_hex(8).map_err(CreateDirError::Entropy)?,
        };

        let path = self.root.join(kind.as_str()).join(dir_name);

        std::fs::DirBuilder::new()
            .mode(0o700)
            .create(&path)
            .map_err(CreateDirError::Io)?;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o700))
            .map_err(CreateDirError::Io)?;

        let canonical = path.canonicalize().map_err(CreateDirError::Io)?;
        if !canonical.starts_with(&self.root) {
            log::warn!(
                "rejected output directory {:?} for label {:?}: escapes storage root {:?}",
                canonical,
                label,
                self.root,
            );
            let _ = std::fs::remove_dir(&canonical);
            return Err(CreateDirError::OutsideRoot(canonical));
        }

        Ok(canonical)
    }

    /// Writes the private key first with mode `0600`, then the public key
    /// with mode `0644`. Files are created exclusively; an existing file is
    /// an error, never an overwrite.
    pub(crate) fn save_key_pair(
        &self,
        directory: &Path,
        private_name: &str,
        public_name: &str,
        private: &str,
        public: &str,
    ) -> std::io::Result<StoredKeyPair> {
        let private_path = directory.join(private_name);
        write_new(&private_path, private.as_bytes(), 0o600)?;

        let public_path = directory.join(public_name);
        write_new(&public_path, public.as_bytes(), 0o644)?;

        Ok(StoredKeyPair {
            directory: directory.to_owned(),
            private_path,
            public_path,
        })
    }
}

fn write_new(path: &Path, contents: &[u8], mode: u32) -> std::io::Result<()> {
    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(mode)
        .open(path)?;
    file.write_all(contents)?;

    // The create mode is filtered through the umask; force the exact bits.
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))?;

    Ok(())
}

pub(crate) fn random_hex(bytes: usize) -> Result<String, openssl::error::ErrorStack> {
    let mut buf = vec![0_u8; bytes];
    openssl::rand::rand_bytes(&mut buf)?;
    Ok(hex::encode(buf))
}

#[cfg(test)]
mod tests {
    use std::os::unix::fs::PermissionsExt;

    use super::{KeyKind, Storage};

    #[test]
    fn prepares_kind_directories_with_restricted_mode() {
        let root = tempfile::tempdir().unwrap();
        let storage = Storage::new(root.path()).unwrap();

        for kind in KeyKind::ALL {
            let path = storage.root.join(kind.as_str());
            let metadata = std::fs::metadata(&path).unwrap();
            assert!(metadata.is_dir());
            assert_eq!(metadata.permissions().mode() & 0o777, 0o700);
        }
    }

    #[test]
    fn traversal_labels_stay_under_the_root() {
        let root = tempfile::tempdir().unwrap();
        let storage = Storage::new(root.path()).unwrap();

        for label in ["../../etc", "../..", "/etc/passwd", "a/b/../c"] {
            let directory = storage
                .create_output_directory(KeyKind::Ssh, label)
                .unwrap();
            assert!(
                directory.starts_with(&storage.root),
                "{} escaped to {}",
                label,
                directory.display(),
            );
        }
    }

    #[test]
    fn empty_labels_never_collide() {
        let root = tempfile::tempdir().unwrap();
        let storage = std::sync::Arc::new(Storage::new(root.path()).unwrap());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let storage = storage.clone();
                std::thread::spawn(move || {
                    storage.create_output_directory(KeyKind::Rsa, "").unwrap()
                })
            })
            .collect();

        let directories: std::collections::BTreeSet<_> = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect();
        assert_eq!(directories.len(), 8);
    }

    #[test]
    fn labeled_directories_are_unique_per_request() {
        let root = tempfile::tempdir().unwrap();
        let storage = Storage::new(root.path()).unwrap();

        let first = storage
            .create_output_directory(KeyKind::Pgp, "backup")
            .unwrap();
        let second = storage
            .create_output_directory(KeyKind::Pgp, "backup")
            .unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn key_pair_files_have_expected_modes() {
        let root = tempfile::tempdir().unwrap();
        let storage = Storage::new(root.path()).unwrap();

        let directory = storage.create_output_directory(KeyKind::Rsa, "").unwrap();
        let stored = storage
            .save_key_pair(&directory, "private.pem", "public.pem", "PRIVATE", "PUBLIC")
            .unwrap();

        let private = std::fs::metadata(&stored.private_path).unwrap();
        assert_eq!(private.permissions().mode() & 0o777, 0o600);
        assert_eq!(
            std::fs::read_to_string(&stored.private_path).unwrap(),
            "PRIVATE"
        );

        let public = std::fs::metadata(&stored.public_path).unwrap();
        assert_eq!(public.permissions().mode() & 0o777, 0o644);
        assert_eq!(
            std::fs::read_to_string(&stored.public_path).unwrap(),
            "PUBLIC"
        );

        let directory_metadata = std::fs::metadata(&stored.directory).unwrap();
        assert_eq!(directory_metadata.permissions().mode() & 0o777, 0o700);
    }

    #[test]
    fn existing_files_are_never_overwritten() {
        let root = tempfile::tempdir().unwrap();
        let storage = Storage::new(root.path()).unwrap();

        let directory = storage.create_output_directory(KeyKind::Ssh, "").unwrap();
        storage
            .save_key_pair(&directory, "id_ed25519", "id_ed25519.pub", "a", "b")
            .unwrap();
        let err = storage
            .save_key_pair(&directory, "id_ed25519", "id_ed25519.pub", "c", "d")
            .unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::AlreadyExists);
    }
}
