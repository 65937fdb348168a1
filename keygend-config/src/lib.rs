// Copyright (c) Microsoft. All rights reserved.

#![deny(rust_2018_idioms)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::default_trait_access)]

#[derive(Debug, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Config {
    /// Root of the key storage tree. Generated key pairs are written to
    /// per-request directories under `<homedir_path>/{ssh,rsa,pgp}/`.
    pub homedir_path: std::path::PathBuf,

    /// Settings for the GnuPG backend used for PGP key generation.
    #[serde(default)]
    pub gpg: GpgSettings,

    /// Map of service names to endpoint URIs.
    ///
    /// Only configurable in debug builds for the sake of tests.
    #[serde(default, skip_serializing)]
    #[cfg_attr(not(debug_assertions), serde(skip_deserializing))]
    pub endpoints: Endpoints,
}

#[derive(Debug, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct GpgSettings {
    /// Explicit path to the `gpg` executable. When unset, the executable is
    /// resolved from `PATH` once at startup.
    #[serde(default)]
    pub bin_path: Option<std::path::PathBuf>,

    /// Root under which per-request GnuPG home directories are created.
    #[serde(default = "default_gpg_homedir")]
    pub homedir_path: std::path::PathBuf,
}

impl Default for GpgSettings {
    fn default() -> Self {
        GpgSettings {
            bin_path: None,
            homedir_path: default_gpg_homedir(),
        }
    }
}

fn default_gpg_homedir() -> std::path::PathBuf {
    "/var/lib/keygend/gpg".into()
}

/// Map of service names to endpoint URIs.
#[derive(Debug, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Endpoints {
    /// The endpoint that the keygend service binds to.
    pub keygend: http_common::Connector,
}

impl Default for Endpoints {
    fn default() -> Self {
        Endpoints {
            keygend: http_common::Connector::Unix {
                socket_path: std::path::Path::new("/run/keygend/keygend.sock").into(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    #[test]
    fn parse_config() {
        let actual = r#"
homedir_path = "/var/lib/keygend"

[gpg]
bin_path = "/usr/bin/gpg"
homedir_path = "/var/lib/keygend/gpg"
"#;
        let actual: super::Config = toml::from_str(actual).unwrap();

        assert_eq!(
            actual,
            super::Config {
                homedir_path: "/var/lib/keygend".into(),

                gpg: super::GpgSettings {
                    bin_path: Some("/usr/bin/gpg".into()),
                    homedir_path: "/var/lib/keygend/gpg".into(),
                },

                endpoints: super::Endpoints {
                    keygend: http_common::Connector::Unix {
                        socket_path: std::path::Path::new("/run/keygend/keygend.sock").into(),
                    },
                },
            }
        );
    }

    #[test]
    fn parse_config_with_defaults() {
        let actual = r#"
homedir_path = "/var/lib/keygend"
"#;
        let actual: super::Config = toml::from_str(actual).unwrap();

        assert_eq!(actual.gpg, super::GpgSettings::default());
        assert_eq!(actual.endpoints, super::Endpoints::default());
    }

    #[cfg(debug_assertions)]
    #[test]
    fn parse_config_with_explicit_endpoints() {
        let actual = r#"
homedir_path = "/var/lib/keygend"

[endpoints]
keygend = "unix:///run/keygend/keygend.sock"
"#;
        let actual: super::Config = toml::from_str(actual).unwrap();

        assert_eq!(
            actual.endpoints,
            super::Endpoints {
                keygend: http_common::Connector::Unix {
                    socket_path: std::path::Path::new("/run/keygend/keygend.sock").into(),
                },
            }
        );
    }
}
