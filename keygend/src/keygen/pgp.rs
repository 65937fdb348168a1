// Copyright (c) Microsoft. All rights reserved.

use keygen_common::{ExpireTime, PgpAlgorithm, PgpCurve};

use crate::error::Error;

/// Parameters for PGP key generation. `name` and `comment` must already be
/// in sanitized form and `name` non-empty; everything else is validated
/// here before the backend is invoked.
pub(crate) struct PgpParams {
    pub name: String,
    pub email: String,
    pub comment: String,
    pub key_type: PgpAlgorithm,
    pub key_length: Option<u32>,
    pub curve: Option<PgpCurve>,
    pub passphrase: Option<String>,
    pub expire_time: Option<String>,
}

// No Debug impl: the secret key must never end up in log output.
pub(crate) struct PgpKeyPair {
    pub public_key: String,
    pub private_key: String,
    pub key_id: String,
    pub expires_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum KeySpec {
    Rsa { length: u32 },
    Ecc { curve: PgpCurve },
}

#[derive(Debug)]
struct Resolved {
    spec: KeySpec,
    expire: ExpireTime,
}

pub(crate) async fn generate(
    backend: &crate::gpg::Backend,
    params: &PgpParams,
) -> Result<PgpKeyPair, Error> {
    let resolved = resolve(params)?;

    // The backend refuses to export secret material without a passphrase in
    // loopback mode, so one is generated when the caller supplies none.
    let passphrase = match params.passphrase.as_deref() {
        Some(passphrase) if !passphrase.is_empty() => passphrase.to_owned(),
        _ => super::passphrase::generate(&super::passphrase::PassphraseParams {
            length: 32,
            include_numbers: true,
            include_special: false,
            exclude_chars: String::new(),
        })?,
    };

    let batch_input = batch_parameters(
        &params.name,
        &params.email,
        &params.comment,
        resolved.spec,
        resolved.expire,
        &passphrase,
    );

    let (public_key, private_key, key_id) =
        backend.generate_key_pair(&batch_input, &passphrase).await?;

    let expires_at = resolved.expire.absolute_from(chrono::Utc::now());

    Ok(PgpKeyPair {
        public_key,
        private_key,
        key_id,
        expires_at,
    })
}

fn resolve(params: &PgpParams) -> Result<Resolved, Error> {
    if !is_valid_email(&params.email) {
        return Err(Error::invalid_parameter(
            "email",
            "email must have the shape local@domain.tld",
        ));
    }

    let spec = match params.key_type {
        PgpAlgorithm::Rsa => {
            if params.curve.is_some() {
                return Err(Error::invalid_parameter(
                    "curve",
                    "curve is only valid for ECC keys",
                ));
            }

            let length = params.key_length.unwrap_or(2048);
            if !matches!(length, 2048 | 3072 | 4096) {
                return Err(Error::invalid_parameter(
                    "keyLength",
                    "RSA key length must be 2048, 3072, or 4096 bits",
                ));
            }

            KeySpec::Rsa { length }
        }

        PgpAlgorithm::Ecc => {
            if params.key_length.is_some() {
                return Err(Error::invalid_parameter(
                    "keyLength",
                    "keyLength is only valid for RSA keys",
                ));
            }

            KeySpec::Ecc {
                curve: params.curve.unwrap_or(PgpCurve::Ed25519),
            }
        }
    };

    let expire = match &params.expire_time {
        Some(raw) => raw
            .parse()
            .map_err(|err| Error::invalid_parameter("expireTime", err))?,
        None => ExpireTime::default(),
    };

    Ok(Resolved { spec, expire })
}

/// Renders the GnuPG unattended key generation parameter input.
fn batch_parameters(
    name: &str,
    email: &str,
    comment: &str,
    spec: KeySpec,
    expire: ExpireTime,
    passphrase: &str,
) -> String {
    let mut input = String::new();

    match spec {
        KeySpec::Rsa { length } => {
            input.push_str("Key-Type: RSA\n");
            input.push_str(&format!("Key-Length: {length}\n"));
        }
        KeySpec::Ecc { curve } => {
            match curve {
                PgpCurve::Ed25519 => input.push_str("Key-Type: EDDSA\n"),
                PgpCurve::NistP256 | PgpCurve::NistP384 | PgpCurve::NistP521 => {
                    input.push_str("Key-Type: ECDSA\n");
                }
            }
            input.push_str(&format!("Key-Curve: {curve}\n"));
        }
    }
    input.push_str("Key-Usage: sign\n");

    input.push_str(&format!("Name-Real: {name}\n"));
    if !comment.is_empty() {
        input.push_str(&format!("Name-Comment: {comment}\n"));
    }
    input.push_str(&format!("Name-Email: {email}\n"));

    input.push_str(&format!("Expire-Date: {}\n", expire.to_gpg_expire_date()));
    input.push_str(&format!("Passphrase: {passphrase}\n"));
    input.push_str("%commit\n");

    input
}

/// Conservative `local@domain.tld` shape check. Deliberately narrower than
/// the RFCs; anything unusual is rejected rather than passed to the backend.
fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };

    if local.is_empty()
        || !local
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b'%' | b'+' | b'-'))
    {
        return false;
    }

    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 {
        return false;
    }

    let valid_label = |label: &&str| {
        !label.is_empty()
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-')
    };
    if !labels.iter().all(valid_label) {
        return false;
    }

    let tld = labels[labels.len() - 1];
    tld.len() >= 2 && tld.bytes().all(|b| b.is_ascii_alphabetic())
}

#[cfg(test)]
mod tests {
    use keygen_common::{ExpireTime, PgpAlgorithm, PgpCurve};

    use super::{KeySpec, PgpParams};

    fn params() -> PgpParams {
        PgpParams {
            name: "Test_User".to_owned(),
            email: "test@example.com".to_owned(),
            comment: String::new(),
            key_type: PgpAlgorithm::Rsa,
            key_length: None,
            curve: None,
            passphrase: None,
            expire_time: None,
        }
    }

    #[test]
    fn email_shape() {
        for valid in [
            "test@example.com",
            "a.b_c%d+e-f@sub.example.org",
            "x@y.co",
        ] {
            assert!(super::is_valid_email(valid), "{valid} should be accepted");
        }

        for invalid in [
            "",
            "invalid",
            "@example.com",
            "user@",
            "user@localhost",
            "user@example.c0m",
            "user@-example.com",
            "user@exa mple.com",
            "us er@example.com",
            "user@@example.com",
            "user@example.com.",
        ] {
            assert!(
                !super::is_valid_email(invalid),
                "{invalid} should be rejected"
            );
        }
    }

    #[test]
    fn resolves_defaults() {
        let resolved = super::resolve(&params()).unwrap();
        assert_eq!(resolved.spec, KeySpec::Rsa { length: 2048 });
        assert_eq!(resolved.expire, ExpireTime::Years(2));

        let mut ecc = params();
        ecc.key_type = PgpAlgorithm::Ecc;
        let resolved = super::resolve(&ecc).unwrap();
        assert_eq!(
            resolved.spec,
            KeySpec::Ecc {
                curve: PgpCurve::Ed25519,
            },
        );
    }

    #[test]
    fn rejects_mismatched_algorithm_parameters() {
        let mut with_curve = params();
        with_curve.curve = Some(PgpCurve::NistP256);
        let err = super::resolve(&with_curve).unwrap_err();
        assert!(matches!(
            err,
            crate::error::Error::InvalidParameter("curve", _)
        ));

        let mut ecc_with_length = params();
        ecc_with_length.key_type = PgpAlgorithm::Ecc;
        ecc_with_length.key_length = Some(2048);
        let err = super::resolve(&ecc_with_length).unwrap_err();
        assert!(matches!(
            err,
            crate::error::Error::InvalidParameter("keyLength", _)
        ));

        let mut bad_length = params();
        bad_length.key_length = Some(1024);
        let err = super::resolve(&bad_length).unwrap_err();
        assert!(matches!(
            err,
            crate::error::Error::InvalidParameter("keyLength", _)
        ));
    }

    #[test]
    fn rejects_malformed_expire_time() {
        let mut bad_expire = params();
        bad_expire.expire_time = Some("banana".to_owned());
        let err = super::resolve(&bad_expire).unwrap_err();
        assert!(matches!(
            err,
            crate::error::Error::InvalidParameter("expireTime", _)
        ));

        let mut never = params();
        never.expire_time = Some("never".to_owned());
        let resolved = super::resolve(&never).unwrap();
        assert_eq!(resolved.expire, ExpireTime::Never);
        assert_eq!(resolved.expire.absolute_from(chrono::Utc::now()), None);
    }

    #[test]
    fn renders_rsa_batch_parameters() {
        let input = super::batch_parameters(
            "Test_User",
            "test@example.com",
            "ci",
            KeySpec::Rsa { length: 3072 },
            ExpireTime::Never,
            "secret",
        );
        assert_eq!(
            input,
            "Key-Type: RSA\n\
             Key-Length: 3072\n\
             Key-Usage: sign\n\
             Name-Real: Test_User\n\
             Name-Comment: ci\n\
             Name-Email: test@example.com\n\
             Expire-Date: 0\n\
             Passphrase: secret\n\
             %commit\n",
        );
    }

    #[test]
    fn renders_ecc_batch_parameters() {
        let input = super::batch_parameters(
            "Test_User",
            "test@example.com",
            "",
            KeySpec::Ecc {
                curve: PgpCurve::Ed25519,
            },
            ExpireTime::Years(2),
            "secret",
        );
        assert!(input.starts_with("Key-Type: EDDSA\nKey-Curve: ed25519\n"));
        assert!(!input.contains("Name-Comment"));
        assert!(input.contains("Expire-Date: 2y\n"));

        let input = super::batch_parameters(
            "Test_User",
            "test@example.com",
            "",
            KeySpec::Ecc {
                curve: PgpCurve::NistP384,
            },
            ExpireTime::Years(2),
            "secret",
        );
        assert!(input.starts_with("Key-Type: ECDSA\nKey-Curve: nistp384\n"));
    }
}
