// Copyright (c) Microsoft. All rights reserved.

#![deny(rust_2018_idioms)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::missing_errors_doc, clippy::must_use_candidate)]

#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub enum ApiVersion {
    V2025_07_01,
    Max,
}

impl std::fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ApiVersion::V2025_07_01 => "2025-07-01",
            ApiVersion::Max => "MAX",
        })
    }
}

impl std::str::FromStr for ApiVersion {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "2025-07-01" => Ok(ApiVersion::V2025_07_01),
            _ => Err(()),
        }
    }
}

/// The success envelope: `{"success": true, "data": ..., "warning"?: ...}`.
///
/// `warning` is set when the credential was generated but could not be
/// persisted; the key material is still returned.
#[derive(Debug, serde::Deserialize, serde::Serialize)]
pub struct Envelope<T> {
    pub success: bool,

    pub data: T,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl<T> Envelope<T> {
    pub fn new(data: T) -> Self {
        Envelope {
            success: true,
            data,
            warning: None,
        }
    }

    pub fn with_warning(data: T, warning: impl Into<String>) -> Self {
        Envelope {
            success: true,
            data,
            warning: Some(warning.into()),
        }
    }
}

pub mod generate_passphrase {
    #[derive(Debug, serde::Deserialize, serde::Serialize)]
    #[serde(deny_unknown_fields)]
    pub struct Request {
        pub length: Option<i64>,

        #[serde(rename = "includeNumbers")]
        pub include_numbers: Option<bool>,

        #[serde(rename = "includeSpecial")]
        pub include_special: Option<bool>,

        #[serde(rename = "excludeChars")]
        pub exclude_chars: Option<String>,
    }

    #[derive(Debug, serde::Deserialize, serde::Serialize)]
    pub struct Response {
        pub passphrase: String,

        pub length: usize,

        #[serde(rename = "includeNumbers")]
        pub include_numbers: bool,

        #[serde(rename = "includeSpecial")]
        pub include_special: bool,
    }
}

pub mod generate_ssh_key {
    #[derive(Debug, serde::Deserialize, serde::Serialize)]
    #[serde(deny_unknown_fields)]
    pub struct Request {
        #[serde(rename = "keyType")]
        pub key_type: Option<keygen_common::SshKeyType>,

        #[serde(rename = "keySize")]
        pub key_size: Option<u32>,

        pub comment: Option<String>,

        pub passphrase: Option<String>,
    }

    #[derive(Debug, serde::Deserialize, serde::Serialize)]
    pub struct Response {
        #[serde(rename = "privateKey")]
        pub private_key: String,

        #[serde(rename = "publicKey")]
        pub public_key: String,

        #[serde(rename = "keyType")]
        pub key_type: keygen_common::SshKeyType,

        #[serde(rename = "keySize")]
        pub key_size: u32,

        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub directory: Option<String>,

        #[serde(
            rename = "privatePath",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        pub private_path: Option<String>,

        #[serde(
            rename = "publicPath",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        pub public_path: Option<String>,
    }
}

pub mod generate_rsa_key {
    #[derive(Debug, serde::Deserialize, serde::Serialize)]
    #[serde(deny_unknown_fields)]
    pub struct Request {
        #[serde(rename = "keySize")]
        pub key_size: Option<u32>,

        pub comment: Option<String>,

        pub passphrase: Option<String>,
    }

    #[derive(Debug, serde::Deserialize, serde::Serialize)]
    pub struct Response {
        #[serde(rename = "privateKey")]
        pub private_key: String,

        #[serde(rename = "publicKey")]
        pub public_key: String,

        #[serde(rename = "keySize")]
        pub key_size: u32,

        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub directory: Option<String>,

        #[serde(
            rename = "privatePath",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        pub private_path: Option<String>,

        #[serde(
            rename = "publicPath",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        pub public_path: Option<String>,
    }
}

pub mod generate_pgp_key {
    #[derive(Debug, serde::Deserialize, serde::Serialize)]
    #[serde(deny_unknown_fields)]
    pub struct Request {
        pub name: String,

        pub email: String,

        pub comment: Option<String>,

        #[serde(rename = "keyType")]
        pub key_type: Option<keygen_common::PgpAlgorithm>,

        #[serde(rename = "keyLength")]
        pub key_length: Option<u32>,

        pub curve: Option<keygen_common::PgpCurve>,

        pub passphrase: Option<String>,

        #[serde(rename = "expireTime")]
        pub expire_time: Option<String>,
    }

    #[derive(Debug, serde::Deserialize, serde::Serialize)]
    pub struct Response {
        #[serde(rename = "privateKey")]
        pub private_key: String,

        #[serde(rename = "publicKey")]
        pub public_key: String,

        #[serde(rename = "keyId")]
        pub key_id: String,

        #[serde(
            rename = "expiresAt",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        pub expires_at: Option<String>,

        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub directory: Option<String>,

        #[serde(
            rename = "privatePath",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        pub private_path: Option<String>,

        #[serde(
            rename = "publicPath",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        pub public_path: Option<String>,
    }
}

pub mod health {
    #[derive(Debug, serde::Deserialize, serde::Serialize)]
    pub struct Response {
        pub status: std::borrow::Cow<'static, str>,
    }
}

#[cfg(test)]
mod tests {
    #[test]
    fn requests_reject_unknown_fields() {
        let _ = serde_json::from_str::<super::generate_passphrase::Request>(
            r#"{"length": 16, "lenght": 20}"#,
        )
        .unwrap_err();

        let _ = serde_json::from_str::<super::generate_ssh_key::Request>(
            r#"{"keyType": "rsa", "bits": 2048}"#,
        )
        .unwrap_err();
    }

    #[test]
    fn envelope_warning_is_omitted_when_absent() {
        let envelope = super::Envelope::new(super::health::Response {
            status: "healthy".into(),
        });
        let serialized = serde_json::to_string(&envelope).unwrap();
        assert_eq!(serialized, r#"{"success":true,"data":{"status":"healthy"}}"#);

        let envelope = super::Envelope::with_warning(
            super::health::Response {
                status: "healthy".into(),
            },
            "storage is on fire",
        );
        let serialized = serde_json::to_string(&envelope).unwrap();
        assert_eq!(
            serialized,
            r#"{"success":true,"data":{"status":"healthy"},"warning":"storage is on fire"}"#,
        );
    }
}
