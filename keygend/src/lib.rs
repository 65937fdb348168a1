// Copyright (c) Microsoft. All rights reserved.

#![deny(rust_2018_idioms)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::default_trait_access,
    clippy::let_and_return,
    clippy::let_unit_value,
    clippy::missing_errors_doc,
    clippy::similar_names
)]

mod error;
pub use error::{Error, InternalError};

mod gpg;
pub mod http;
mod keygen;
mod storage;

use std::sync::Arc;

use keygen_common::SshKeyType;

#[allow(clippy::unused_async)]
pub async fn main(
    config: keygend_config::Config,
) -> Result<(http_common::Connector, http::Service), Box<dyn std::error::Error>> {
    let keygend_config::Config {
        homedir_path,
        gpg,
        endpoints: keygend_config::Endpoints { keygend: connector },
    } = config;

    let api = Api::new(&homedir_path, &gpg)?;
    let api = Arc::new(api);

    let service = http::Service { api };

    Ok((connector, service))
}

/// Returned to the caller when the generated credential could not be
/// persisted: generation already succeeded, so the material is still
/// handed back, tagged with a warning.
const SAVE_WARNING: &str = "Keys generated but could not be saved";

#[derive(Debug)]
pub(crate) enum SaveOutcome {
    Saved(storage::StoredKeyPair),
    Failed(&'static str),
}

pub(crate) struct Api {
    storage: storage::Storage,
    gpg: gpg::Backend,
}

impl Api {
    fn new(
        homedir_path: &std::path::Path,
        gpg_settings: &keygend_config::GpgSettings,
    ) -> Result<Self, Error> {
        let storage = storage::Storage::new(homedir_path)
            .map_err(|err| Error::Internal(InternalError::CreateStorageRoot(err)))?;
        let gpg = gpg::Backend::new(gpg_settings)?;

        Ok(Api { storage, gpg })
    }

    pub(crate) fn generate_passphrase(
        &self,
        length: Option<i64>,
        include_numbers: Option<bool>,
        include_special: Option<bool>,
        exclude_chars: Option<String>,
    ) -> Result<(keygen::passphrase::PassphraseParams, String), Error> {
        let params = keygen::passphrase::PassphraseParams {
            length: length.unwrap_or(16),
            include_numbers: include_numbers.unwrap_or(true),
            include_special: include_special.unwrap_or(true),
            exclude_chars: exclude_chars.unwrap_or_default(),
        };

        let passphrase = keygen::passphrase::generate(&params)?;

        Ok((params, passphrase))
    }

    pub(crate) fn generate_ssh_key(
        &self,
        key_type: Option<SshKeyType>,
        key_size: Option<u32>,
        comment: Option<String>,
        passphrase: Option<String>,
    ) -> Result<(keygen::ssh::SshKeyPair, SaveOutcome), Error> {
        let comment = keygen_common::sanitize::validate(comment.as_deref().unwrap_or_default())
            .map_err(|err| Error::invalid_parameter("comment", err))?;

        let params = keygen::ssh::SshParams {
            key_type: key_type.unwrap_or(SshKeyType::Ed25519),
            key_size,
            comment,
            passphrase,
        };
        let key_pair = keygen::ssh::generate(&params)?;

        let private_name = format!("id_{}", key_pair.key_type);
        let public_name = format!("id_{}.pub", key_pair.key_type);
        let outcome = self.persist(
            storage::KeyKind::Ssh,
            &params.comment,
            &private_name,
            &public_name,
            &key_pair.private_key,
            &key_pair.public_key,
        )?;

        Ok((key_pair, outcome))
    }

    pub(crate) fn generate_rsa_key(
        &self,
        key_size: Option<u32>,
        comment: Option<String>,
        passphrase: Option<String>,
    ) -> Result<(keygen::rsa::RsaKeyPair, SaveOutcome), Error> {
        let comment = keygen_common::sanitize::validate(comment.as_deref().unwrap_or_default())
            .map_err(|err| Error::invalid_parameter("comment", err))?;

        let params = keygen::rsa::RsaParams {
            key_size: key_size.unwrap_or(4096),
            passphrase,
        };
        let key_pair = keygen::rsa::generate(&params)?;

        let outcome = self.persist(
            storage::KeyKind::Rsa,
            &comment,
            "private.pem",
            "public.pem",
            &key_pair.private_key,
            &key_pair.public_key,
        )?;

        Ok((key_pair, outcome))
    }

    pub(crate) async fn generate_pgp_key(
        &self,
        mut params: keygen::pgp::PgpParams,
    ) -> Result<(keygen::pgp::PgpKeyPair, SaveOutcome), Error> {
        params.name = {
            let name = keygen_common::sanitize::validate(&params.name)
                .map_err(|err| Error::invalid_parameter("name", err))?;
            if name.is_empty() {
                return Err(Error::invalid_parameter("name", "name is required"));
            }
            name
        };
        params.comment = keygen_common::sanitize::validate(&params.comment)
            .map_err(|err| Error::invalid_parameter("comment", err))?;

        let key_pair = keygen::pgp::generate(&self.gpg, &params).await?;

        let outcome = self.persist(
            storage::KeyKind::Pgp,
            &params.comment,
            "private.asc",
            "public.asc",
            &key_pair.private_key,
            &key_pair.public_key,
        )?;

        Ok((key_pair, outcome))
    }

    /// Persists a generated key pair.
    ///
    /// A traversal rejection is fatal to the request. Plain I/O failures
    /// degrade to [`SaveOutcome::Failed`] so the caller still receives the
    /// generated material; the detail is only logged.
    fn persist(
        &self,
        kind: storage::KeyKind,
        label: &str,
        private_name: &str,
        public_name: &str,
        private: &str,
        public: &str,
    ) -> Result<SaveOutcome, Error> {
        let directory = match self.storage.create_output_directory(kind, label) {
            Ok(directory) => directory,
            Err(storage::CreateDirError::OutsideRoot(path)) => {
                return Err(Error::InvalidPath(path))
            }
            Err(storage::CreateDirError::Entropy(err)) => {
                return Err(Error::Internal(InternalError::GenerateRandom(err)))
            }
            Err(storage::CreateDirError::Io(err)) => {
                log::error!(
                    "could not create output directory for {} key: {}",
                    kind.as_str(),
                    err
                );
                return Ok(SaveOutcome::Failed(SAVE_WARNING));
            }
        };

        match self
            .storage
            .save_key_pair(&directory, private_name, public_name, private, public)
        {
            Ok(stored) => Ok(SaveOutcome::Saved(stored)),
            Err(err) => {
                log::error!(
                    "could not save {} key pair to {:?}: {}",
                    kind.as_str(),
                    directory,
                    err
                );
                Ok(SaveOutcome::Failed(SAVE_WARNING))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use keygen_common::SshKeyType;

    fn test_api(root: &std::path::Path) -> super::Api {
        let gpg_settings = keygend_config::GpgSettings {
            // Explicit path so the tests don't depend on gpg being installed.
            bin_path: Some("/bin/false".into()),
            homedir_path: root.join("gpg"),
        };
        super::Api::new(&root.join("keys"), &gpg_settings).unwrap()
    }

    #[test]
    fn generated_ssh_key_is_persisted() {
        let root = tempfile::tempdir().unwrap();
        let api = test_api(root.path());

        let (key_pair, outcome) = api
            .generate_ssh_key(None, None, Some("ci deploy key".to_owned()), None)
            .unwrap();

        assert!(key_pair.public_key.starts_with("ssh-ed25519 "));
        assert!(key_pair.public_key.ends_with(" ci_deploy_key"));

        let stored = match outcome {
            super::SaveOutcome::Saved(stored) => stored,
            super::SaveOutcome::Failed(warning) => panic!("save failed: {warning}"),
        };
        assert_eq!(
            std::fs::read_to_string(&stored.private_path).unwrap(),
            key_pair.private_key
        );
        assert_eq!(
            std::fs::read_to_string(&stored.public_path).unwrap(),
            key_pair.public_key
        );
        assert!(stored.private_path.ends_with("id_ed25519"));
        assert!(stored.public_path.ends_with("id_ed25519.pub"));
    }

    #[test]
    fn save_failure_still_returns_the_key_material() {
        let root = tempfile::tempdir().unwrap();
        let api = test_api(root.path());

        // Break persistence by replacing the kind directory with a file.
        // A permission-based setup would not fail under root.
        let ssh_dir = root.path().join("keys").join("ssh");
        std::fs::remove_dir(&ssh_dir).unwrap();
        std::fs::write(&ssh_dir, "not a directory").unwrap();

        let (key_pair, outcome) = api
            .generate_ssh_key(Some(SshKeyType::Ed25519), None, None, None)
            .unwrap();

        assert!(key_pair.public_key.starts_with("ssh-ed25519 "));
        assert!(!key_pair.private_key.is_empty());
        match outcome {
            super::SaveOutcome::Failed(warning) => assert!(!warning.is_empty()),
            super::SaveOutcome::Saved(stored) => {
                panic!("save unexpectedly succeeded: {:?}", stored.directory)
            }
        }
    }

    #[test]
    fn invalid_comment_fails_before_generation() {
        let root = tempfile::tempdir().unwrap();
        let api = test_api(root.path());

        let err = api
            .generate_ssh_key(None, None, Some("!!!".to_owned()), None)
            .unwrap_err();
        assert!(matches!(
            err,
            super::Error::InvalidParameter("comment", _)
        ));
    }
}
