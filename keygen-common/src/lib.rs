// Copyright (c) Microsoft. All rights reserved.

#![deny(rust_2018_idioms)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::missing_errors_doc, clippy::must_use_candidate)]

mod expire;
pub use expire::{ExpireTime, ParseExpireTimeError};

pub mod sanitize;

/// The algorithm of a generated SSH key pair.
#[derive(Clone, Copy, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SshKeyType {
    Rsa,
    Ecdsa,
    Ed25519,
}

impl SshKeyType {
    pub fn as_str(self) -> &'static str {
        match self {
            SshKeyType::Rsa => "rsa",
            SshKeyType::Ecdsa => "ecdsa",
            SshKeyType::Ed25519 => "ed25519",
        }
    }
}

impl std::fmt::Display for SshKeyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The algorithm family of a generated PGP primary key.
#[derive(Clone, Copy, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PgpAlgorithm {
    Rsa,
    Ecc,
}

/// The named curves allowed for ECC PGP keys.
#[derive(Clone, Copy, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PgpCurve {
    Ed25519,
    NistP256,
    NistP384,
    NistP521,
}

impl PgpCurve {
    pub fn as_str(self) -> &'static str {
        match self {
            PgpCurve::Ed25519 => "ed25519",
            PgpCurve::NistP256 => "nistp256",
            PgpCurve::NistP384 => "nistp384",
            PgpCurve::NistP521 => "nistp521",
        }
    }
}

impl std::fmt::Display for PgpCurve {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    #[test]
    fn ssh_key_type_wire_names() {
        for (value, expected) in [
            (super::SshKeyType::Rsa, "\"rsa\""),
            (super::SshKeyType::Ecdsa, "\"ecdsa\""),
            (super::SshKeyType::Ed25519, "\"ed25519\""),
        ] {
            assert_eq!(serde_json::to_string(&value).unwrap(), expected);
        }
    }

    #[test]
    fn pgp_algorithm_wire_names() {
        let algorithm: super::PgpAlgorithm = serde_json::from_str("\"RSA\"").unwrap();
        assert_eq!(algorithm, super::PgpAlgorithm::Rsa);

        let algorithm: super::PgpAlgorithm = serde_json::from_str("\"ECC\"").unwrap();
        assert_eq!(algorithm, super::PgpAlgorithm::Ecc);

        let _ = serde_json::from_str::<super::PgpAlgorithm>("\"DSA\"").unwrap_err();
    }
}
