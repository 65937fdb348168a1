// Copyright (c) Microsoft. All rights reserved.

/// A PGP key expiration request: `"never"`, `"<N>d"`, or `"<N>y"`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ExpireTime {
    Never,
    Days(u32),
    Years(u32),
}

impl ExpireTime {
    /// The value for the `Expire-Date` field of a GnuPG batch parameter
    /// file. GnuPG uses `0` for "no expiration".
    pub fn to_gpg_expire_date(self) -> String {
        match self {
            ExpireTime::Never => "0".to_owned(),
            ExpireTime::Days(days) => format!("{days}d"),
            ExpireTime::Years(years) => format!("{years}y"),
        }
    }

    /// The absolute expiration timestamp relative to `now`, or `None` for a
    /// non-expiring key. Years count as 365 days, matching GnuPG.
    pub fn absolute_from(
        self,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Option<chrono::DateTime<chrono::Utc>> {
        let days = match self {
            ExpireTime::Never => return None,
            ExpireTime::Days(days) => i64::from(days),
            ExpireTime::Years(years) => i64::from(years) * 365,
        };
        Some(now + chrono::Duration::days(days))
    }
}

impl Default for ExpireTime {
    fn default() -> Self {
        ExpireTime::Years(2)
    }
}

impl std::fmt::Display for ExpireTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExpireTime::Never => f.write_str("never"),
            ExpireTime::Days(days) => write!(f, "{days}d"),
            ExpireTime::Years(years) => write!(f, "{years}y"),
        }
    }
}

impl std::str::FromStr for ExpireTime {
    type Err = ParseExpireTimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "never" {
            return Ok(ExpireTime::Never);
        }

        let (count, constructor): (&str, fn(u32) -> ExpireTime) =
            if let Some(count) = s.strip_suffix('d') {
                (count, ExpireTime::Days)
            } else if let Some(count) = s.strip_suffix('y') {
                (count, ExpireTime::Years)
            } else {
                return Err(ParseExpireTimeError);
            };

        // A leading `+` would parse as a u32, but is not part of the shape.
        if count.is_empty() || !count.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ParseExpireTimeError);
        }

        let count: u32 = count.parse().map_err(|_| ParseExpireTimeError)?;
        if count == 0 {
            return Err(ParseExpireTimeError);
        }

        Ok(constructor(count))
    }
}

#[derive(Debug)]
pub struct ParseExpireTimeError;

impl std::fmt::Display for ParseExpireTimeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(r#"expire time must be "never", "<N>d", or "<N>y""#)
    }
}

impl std::error::Error for ParseExpireTimeError {}

#[cfg(test)]
mod tests {
    use super::ExpireTime;

    #[test]
    fn parse() {
        assert_eq!("never".parse::<ExpireTime>().unwrap(), ExpireTime::Never);
        assert_eq!("30d".parse::<ExpireTime>().unwrap(), ExpireTime::Days(30));
        assert_eq!("2y".parse::<ExpireTime>().unwrap(), ExpireTime::Years(2));

        for invalid in ["", "banana", "d", "y", "0d", "0y", "-1y", "2 y", "2Y"] {
            let _ = invalid.parse::<ExpireTime>().unwrap_err();
        }
    }

    #[test]
    fn display_roundtrips() {
        for value in [
            ExpireTime::Never,
            ExpireTime::Days(7),
            ExpireTime::Years(2),
        ] {
            assert_eq!(value.to_string().parse::<ExpireTime>().unwrap(), value);
        }
    }

    #[test]
    fn gpg_expire_date() {
        assert_eq!(ExpireTime::Never.to_gpg_expire_date(), "0");
        assert_eq!(ExpireTime::Days(30).to_gpg_expire_date(), "30d");
        assert_eq!(ExpireTime::Years(1).to_gpg_expire_date(), "1y");
    }

    #[test]
    fn absolute_expiration() {
        let now = chrono::Utc::now();

        assert_eq!(ExpireTime::Never.absolute_from(now), None);

        let expires = ExpireTime::Years(2).absolute_from(now).unwrap();
        let days = (expires - now).num_days();
        assert!((729..=731).contains(&days), "unexpected offset: {days}");
    }
}
