// Copyright (c) Microsoft. All rights reserved.

#[derive(Debug)]
pub enum Error {
    Internal(InternalError),
    InvalidParameter(&'static str, Box<dyn std::error::Error + Send + Sync>),
    InvalidPath(std::path::PathBuf),
}

impl Error {
    pub(crate) fn invalid_parameter<E>(name: &'static str, err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Error::InvalidParameter(name, err.into())
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Internal(err) => std::fmt::Display::fmt(err, f),
            Error::InvalidParameter(name, _) => {
                write!(f, "parameter {name:?} has an invalid value")
            }
            Error::InvalidPath(path) => {
                write!(f, "storage path {:?} is outside the storage root", path)
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Internal(err) => Some(err),
            Error::InvalidParameter(_, err) => Some(&**err),
            Error::InvalidPath(_) => None,
        }
    }
}

impl From<openssl::error::ErrorStack> for Error {
    fn from(err: openssl::error::ErrorStack) -> Self {
        Error::Internal(InternalError::GenerateKey(err))
    }
}

#[allow(clippy::module_name_repetitions)]
#[derive(Debug)]
pub enum InternalError {
    CreateGpgHomedir(std::io::Error),
    CreateStorageRoot(std::io::Error),
    GenerateKey(openssl::error::ErrorStack),
    GenerateRandom(openssl::error::ErrorStack),
    GpgExport(Box<dyn std::error::Error + Send + Sync>),
    GpgGenerate(Box<dyn std::error::Error + Send + Sync>),
    GpgUnavailable(std::io::Error),
}

impl std::fmt::Display for InternalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // These strings cross the trust boundary as-is; they must stay free
        // of paths, parameters, and backend output.
        match self {
            InternalError::CreateGpgHomedir(_) => {
                f.write_str("could not prepare gpg home directory")
            }
            InternalError::CreateStorageRoot(_) => {
                f.write_str("could not prepare key storage directory")
            }
            InternalError::GenerateKey(_) => f.write_str("could not generate key"),
            InternalError::GenerateRandom(_) => {
                f.write_str("could not generate random material")
            }
            InternalError::GpgExport(_) => f.write_str("could not export generated key"),
            InternalError::GpgGenerate(_) => f.write_str("could not generate key"),
            InternalError::GpgUnavailable(_) => f.write_str("key generation backend unavailable"),
        }
    }
}

impl std::error::Error for InternalError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        #[allow(clippy::match_same_arms)]
        match self {
            InternalError::CreateGpgHomedir(err) => Some(err),
            InternalError::CreateStorageRoot(err) => Some(err),
            InternalError::GenerateKey(err) => Some(err),
            InternalError::GenerateRandom(err) => Some(err),
            InternalError::GpgExport(err) => Some(&**err),
            InternalError::GpgGenerate(err) => Some(&**err),
            InternalError::GpgUnavailable(err) => Some(err),
        }
    }
}
