// Copyright (c) Microsoft. All rights reserved.

//! Adapter for the external GnuPG backend.
//!
//! The executable path is resolved once at startup. Every generation request
//! runs against its own throwaway `--homedir`, so concurrent requests never
//! contend on a shared keyring. Arguments are always passed as a fixed
//! vector; caller-influenced values are limited to the already-validated
//! batch parameters.

use std::os::unix::fs::{DirBuilderExt, PermissionsExt};
use std::path::{Path, PathBuf};

use crate::error::{Error, InternalError};

pub(crate) struct Backend {
    bin_path: PathBuf,
    homedir_root: PathBuf,
}

impl Backend {
    pub(crate) fn new(settings: &keygend_config::GpgSettings) -> Result<Self, Error> {
        let bin_path = match &settings.bin_path {
            Some(path) => path.clone(),
            None => find_in_path("gpg").ok_or_else(|| {
                Error::Internal(InternalError::GpgUnavailable(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "gpg executable not found in PATH",
                )))
            })?,
        };

        create_private_dir(&settings.homedir_path)
            .map_err(|err| Error::Internal(InternalError::CreateGpgHomedir(err)))?;

        Ok(Backend {
            bin_path,
            homedir_root: settings.homedir_path.clone(),
        })
    }

    /// Generates a key pair from the given batch parameter input and returns
    /// `(armored public key, armored secret key, fingerprint)`.
    pub(crate) async fn generate_key_pair(
        &self,
        batch_input: &str,
        passphrase: &str,
    ) -> Result<(String, String, String), Error> {
        let homedir = {
            let name = crate::storage::random_hex(8)
                .map_err(|err| Error::Internal(InternalError::GenerateRandom(err)))?;
            self.homedir_root.join(name)
        };
        create_private_dir(&homedir)
            .map_err(|err| Error::Internal(InternalError::CreateGpgHomedir(err)))?;

        let result = self.generate_inner(&homedir, batch_input, passphrase).await;

        // The per-request keyring has served its purpose either way.
        if let Err(err) = std::fs::remove_dir_all(&homedir) {
            log::warn!(
                "could not remove gpg home directory {:?}: {}",
                homedir,
                err
            );
        }

        result
    }

    async fn generate_inner(
        &self,
        homedir: &Path,
        batch_input: &str,
        passphrase: &str,
    ) -> Result<(String, String, String), Error> {
        let output = self
            .run(
                homedir,
                &["--status-fd", "1", "--pinentry-mode", "loopback", "--gen-key"],
                Some(batch_input.as_bytes()),
            )
            .await
            .map_err(|err| Error::Internal(InternalError::GpgUnavailable(err)))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            log::error!("gpg --gen-key failed: {}", stderr.trim());
            return Err(Error::Internal(InternalError::GpgGenerate(
                format!("gpg exited with {}", output.status).into(),
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let fingerprint = parse_key_created(&stdout).ok_or_else(|| {
            Error::Internal(InternalError::GpgGenerate(
                "gpg did not report a created key".into(),
            ))
        })?;

        let public_key = self
            .export(homedir, &["--armor", "--export", &fingerprint], None)
            .await?;

        let private_key = self
            .export(
                homedir,
                &[
                    "--armor",
                    "--pinentry-mode",
                    "loopback",
                    "--passphrase-fd",
                    "0",
                    "--export-secret-keys",
                    &fingerprint,
                ],
                Some(passphrase.as_bytes()),
            )
            .await?;

        Ok((public_key, private_key, fingerprint))
    }

    async fn export(
        &self,
        homedir: &Path,
        args: &[&str],
        stdin: Option<&[u8]>,
    ) -> Result<String, Error> {
        let output = self
            .run(homedir, args, stdin)
            .await
            .map_err(|err| Error::Internal(InternalError::GpgUnavailable(err)))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            log::error!("gpg export failed: {}", stderr.trim());
            return Err(Error::Internal(InternalError::GpgExport(
                format!("gpg exited with {}", output.status).into(),
            )));
        }

        if output.stdout.is_empty() {
            return Err(Error::Internal(InternalError::GpgExport(
                "gpg produced no output".into(),
            )));
        }

        let armored = String::from_utf8(output.stdout)
            .map_err(|err| Error::Internal(InternalError::GpgExport(Box::new(err))))?;
        Ok(armored)
    }

    async fn run(
        &self,
        homedir: &Path,
        args: &[&str],
        stdin: Option<&[u8]>,
    ) -> std::io::Result<std::process::Output> {
        let mut command = tokio::process::Command::new(&self.bin_path);
        command
            .arg("--batch")
            .arg("--no-tty")
            .arg("--homedir")
            .arg(homedir)
            .args(args)
            .stdin(if stdin.is_some() {
                std::process::Stdio::piped()
            } else {
                std::process::Stdio::null()
            })
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped());

        let mut child = command.spawn()?;

        if let Some(stdin_bytes) = stdin {
            use tokio::io::AsyncWriteExt;

            let mut handle = child.stdin.take().expect("stdin was piped above");
            handle.write_all(stdin_bytes).await?;
            // Dropping the handle closes the pipe so gpg sees EOF.
        }

        child.wait_with_output().await
    }
}

/// Extracts the fingerprint from a `[GNUPG:] KEY_CREATED <type> <fpr>`
/// status line.
fn parse_key_created(status_output: &str) -> Option<String> {
    status_output.lines().find_map(|line| {
        let rest = line.strip_prefix("[GNUPG:] KEY_CREATED")?;
        rest.split_whitespace().nth(1).map(str::to_owned)
    })
}

fn find_in_path(binary: &str) -> Option<PathBuf> {
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .map(|dir| dir.join(binary))
        .find(|candidate| candidate.is_file())
}

fn create_private_dir(path: &Path) -> std::io::Result<()> {
    match std::fs::DirBuilder::new()
        .recursive(true)
        .mode(0o700)
        .create(path)
    {
        Ok(()) => (),
        Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => (),
        Err(err) => return Err(err),
    }
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))
}

#[cfg(test)]
mod tests {
    #[test]
    fn parse_key_created() {
        let status = "\
[GNUPG:] KEY_CONSIDERED 1234 0
[GNUPG:] KEY_CREATED P 4E1F799AA4FF2279B8867949F1E5CBE34D2B01DB
[GNUPG:] PROGRESS primegen";
        assert_eq!(
            super::parse_key_created(status).as_deref(),
            Some("4E1F799AA4FF2279B8867949F1E5CBE34D2B01DB"),
        );

        assert_eq!(super::parse_key_created("gpg: no status here"), None);
        assert_eq!(super::parse_key_created("[GNUPG:] KEY_CREATED P"), None);
    }
}
