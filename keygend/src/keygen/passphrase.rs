// Copyright (c) Microsoft. All rights reserved.

use crate::error::{Error, InternalError};

const ASCII_LETTERS: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";
const ASCII_DIGITS: &str = "0123456789";
const ASCII_PUNCTUATION: &str = "!\"#$%&'()*+,-./:;<=>?@[\\]^_`{|}~";

const MIN_LENGTH: i64 = 8;
const MAX_LENGTH: i64 = 64;

#[derive(Debug)]
pub(crate) struct PassphraseParams {
    pub length: i64,
    pub include_numbers: bool,
    pub include_special: bool,
    pub exclude_chars: String,
}

pub(crate) fn generate(params: &PassphraseParams) -> Result<String, Error> {
    if !(MIN_LENGTH..=MAX_LENGTH).contains(&params.length) {
        return Err(Error::invalid_parameter(
            "length",
            "passphrase length must be between 8 and 64 characters",
        ));
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let length = params.length as usize;

    let mut pool: Vec<char> = ASCII_LETTERS.chars().collect();
    if params.include_numbers {
        pool.extend(ASCII_DIGITS.chars());
    }
    if params.include_special {
        pool.extend(ASCII_PUNCTUATION.chars());
    }
    pool.retain(|c| !params.exclude_chars.contains(*c));

    if pool.is_empty() {
        return Err(Error::invalid_parameter(
            "excludeChars",
            "no valid characters available after exclusions",
        ));
    }

    let passphrase =
        draw(&pool, length).map_err(|err| Error::Internal(InternalError::GenerateRandom(err)))?;
    Ok(passphrase)
}

/// Draws `count` characters independently and uniformly from `pool`.
///
/// Random bytes above the largest multiple of the pool size are discarded so
/// the modulo cannot bias the distribution.
fn draw(pool: &[char], count: usize) -> Result<String, openssl::error::ErrorStack> {
    let limit = 256 - (256 % pool.len());

    let mut passphrase = String::with_capacity(count);
    let mut drawn = 0;
    let mut buf = [0_u8; 64];

    while drawn < count {
        openssl::rand::rand_bytes(&mut buf)?;

        for &byte in &buf {
            if usize::from(byte) >= limit {
                continue;
            }

            passphrase.push(pool[usize::from(byte) % pool.len()]);
            drawn += 1;
            if drawn == count {
                break;
            }
        }
    }

    Ok(passphrase)
}

#[cfg(test)]
mod tests {
    use super::PassphraseParams;

    fn params(length: i64) -> PassphraseParams {
        PassphraseParams {
            length,
            include_numbers: true,
            include_special: true,
            exclude_chars: String::new(),
        }
    }

    #[test]
    fn generates_exact_length_from_the_pool() {
        for length in [8, 16, 33, 64] {
            let passphrase = super::generate(&params(length)).unwrap();
            assert_eq!(passphrase.len(), usize::try_from(length).unwrap());
            assert!(passphrase.chars().all(|c| {
                super::ASCII_LETTERS.contains(c)
                    || super::ASCII_DIGITS.contains(c)
                    || super::ASCII_PUNCTUATION.contains(c)
            }));
        }
    }

    #[test]
    fn rejects_out_of_range_lengths() {
        for length in [i64::MIN, -1, 0, 7, 65, i64::MAX] {
            let err = super::generate(&params(length)).unwrap_err();
            assert!(matches!(
                err,
                crate::error::Error::InvalidParameter("length", _)
            ));
        }
    }

    #[test]
    fn excluded_characters_never_appear() {
        let mut params = params(64);
        params.exclude_chars = "aeiouAEIOU01!".to_owned();

        for _ in 0..8 {
            let passphrase = super::generate(&params).unwrap();
            assert!(passphrase.chars().all(|c| !params.exclude_chars.contains(c)));
        }
    }

    #[test]
    fn respects_pool_toggles() {
        let params = PassphraseParams {
            length: 64,
            include_numbers: false,
            include_special: false,
            exclude_chars: String::new(),
        };
        let passphrase = super::generate(&params).unwrap();
        assert!(passphrase.chars().all(char::is_alphabetic));
    }

    #[test]
    fn rejects_an_empty_pool() {
        let params = PassphraseParams {
            length: 16,
            include_numbers: false,
            include_special: false,
            exclude_chars: super::ASCII_LETTERS.to_owned(),
        };
        let err = super::generate(&params).unwrap_err();
        assert!(matches!(
            err,
            crate::error::Error::InvalidParameter("excludeChars", _)
        ));
    }
}
