// Copyright (c) Microsoft. All rights reserved.

//! Credential generators.
//!
//! Each generator is a pure function from validated parameters to key
//! material in its standard text encoding. No generator touches the
//! filesystem; persistence is the caller's concern.

pub(crate) mod passphrase;
pub(crate) mod pgp;
pub(crate) mod rsa;
pub(crate) mod ssh;

use crate::error::Error;

/// Serializes a private key as PKCS#8 PEM. A non-empty passphrase selects
/// an AES-256-CBC encrypted container; anything else an unencrypted one.
fn private_key_pem(
    pkey: &openssl::pkey::PKeyRef<openssl::pkey::Private>,
    passphrase: Option<&str>,
) -> Result<String, Error> {
    let pem = match passphrase {
        Some(passphrase) if !passphrase.is_empty() => pkey.private_key_to_pem_pkcs8_passphrase(
            openssl::symm::Cipher::aes_256_cbc(),
            passphrase.as_bytes(),
        )?,
        _ => pkey.private_key_to_pem_pkcs8()?,
    };

    let pem = String::from_utf8(pem).expect("PEM is always valid utf-8");
    Ok(pem)
}
