// Copyright (c) Microsoft. All rights reserved.

#![deny(rust_2018_idioms)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]

mod error;
pub use error::Error;

/// Reads the daemon config from `config_path`, then applies any `*.toml`
/// patches found in `config_directory_path` in lexical order before
/// deserializing into the caller's config type.
pub fn read_config<TConfig>(
    config_path: &std::path::Path,
    config_directory_path: &std::path::Path,
) -> Result<TConfig, Error>
where
    TConfig: serde::de::DeserializeOwned,
{
    let config = std::fs::read_to_string(config_path)
        .map_err(|err| Error::ReadConfig(Some(config_path.to_owned()), Box::new(err)))?;
    let mut config: toml::Value = toml::from_str(&config)
        .map_err(|err| Error::ReadConfig(Some(config_path.to_owned()), Box::new(err)))?;

    for patch_path in patch_paths(config_directory_path)? {
        let patch = std::fs::read_to_string(&patch_path)
            .map_err(|err| Error::ReadConfig(Some(patch_path.clone()), Box::new(err)))?;
        let patch: toml::Value = toml::from_str(&patch)
            .map_err(|err| Error::ReadConfig(Some(patch_path), Box::new(err)))?;
        merge_toml(&mut config, patch);
    }

    let config: TConfig = serde::Deserialize::deserialize(config)
        .map_err(|err| Error::ReadConfig(None, Box::new(err)))?;

    Ok(config)
}

fn patch_paths(
    config_directory_path: &std::path::Path,
) -> Result<Vec<std::path::PathBuf>, Error> {
    let entries = match std::fs::read_dir(config_directory_path) {
        Ok(entries) => entries,

        // A missing patch directory is the same as an empty one.
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(vec![]),

        Err(err) => {
            return Err(Error::ReadConfig(
                Some(config_directory_path.to_owned()),
                Box::new(err),
            ))
        }
    };

    let mut patch_paths = vec![];

    for entry in entries {
        let entry = entry.map_err(|err| {
            Error::ReadConfig(Some(config_directory_path.to_owned()), Box::new(err))
        })?;

        let entry_file_type = entry.file_type().map_err(|err| {
            Error::ReadConfig(Some(config_directory_path.to_owned()), Box::new(err))
        })?;
        if !entry_file_type.is_file() {
            continue;
        }

        let patch_path = entry.path();
        if patch_path.extension().and_then(std::ffi::OsStr::to_str) == Some("toml") {
            patch_paths.push(patch_path);
        }
    }

    patch_paths.sort();
    Ok(patch_paths)
}

fn merge_toml(base: &mut toml::Value, patch: toml::Value) {
    // Like JSON merge patch, except that tables take the place of maps, there
    // is no null to remove a key with, and arrays concatenate rather than
    // replace.

    if let toml::Value::Table(base) = base {
        if let toml::Value::Table(patch) = patch {
            for (key, value) in patch {
                // The dummy `false` only exists when the key was absent from
                // the base, in which case `value` overwrites it entirely.
                let original_value = base.entry(key).or_insert(toml::Value::Boolean(false));
                merge_toml(original_value, value);
            }

            return;
        }
    }

    if let toml::Value::Array(base) = base {
        if let toml::Value::Array(patch) = patch {
            base.extend(patch);
            return;
        }
    }

    *base = patch;
}

#[cfg(test)]
mod tests {
    #[test]
    fn merge_toml() {
        let base = r#"
key = "a"
nested = { key = "b" }

[table]
key = "c"

[[rows]]
name = "first"
"#;
        let mut base: toml::Value = toml::from_str(base).unwrap();

        let patch = r#"
key = "a2"
new_key = "a3"
nested = { key = "b2", other = "b3" }

[table]
key = "c2"
new_key = "c3"

[[rows]]
name = "second"
"#;
        let patch: toml::Value = toml::from_str(patch).unwrap();

        super::merge_toml(&mut base, patch);

        let expected = r#"
key = "a2"
new_key = "a3"
nested = { key = "b2", other = "b3" }

[table]
key = "c2"
new_key = "c3"

[[rows]]
name = "first"

[[rows]]
name = "second"
"#;
        let expected: toml::Value = toml::from_str(expected).unwrap();
        assert_eq!(expected, base);
    }
}
