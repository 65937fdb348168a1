// Copyright (c) Microsoft. All rights reserved.

//! Normalization of free-text comments so they are safe to embed in key
//! material and storage directory names.

const MAX_COMMENT_LEN: usize = 64;

/// Replaces spaces with underscores, strips every character outside
/// `[A-Za-z0-9_.-]`, and truncates to 64 characters.
pub fn sanitize(comment: &str) -> String {
    let mut sanitized: String = comment
        .chars()
        .map(|c| if c == ' ' { '_' } else { c })
        .filter(|&c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect();
    sanitized.truncate(MAX_COMMENT_LEN);
    sanitized
}

/// Returns the sanitized form of `comment`.
///
/// Empty input is valid and yields an empty string. Non-empty input that
/// sanitizes to nothing is rejected, since silently dropping the whole
/// comment would hide the caller's mistake.
pub fn validate(comment: &str) -> Result<String, InvalidComment> {
    let sanitized = sanitize(comment);
    if sanitized.is_empty() && !comment.is_empty() {
        return Err(InvalidComment);
    }
    Ok(sanitized)
}

#[derive(Debug)]
pub struct InvalidComment;

impl std::fmt::Display for InvalidComment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(
            "comment may only contain letters, digits, spaces, hyphens, underscores, and periods",
        )
    }
}

impl std::error::Error for InvalidComment {}

#[cfg(test)]
mod tests {
    #[test]
    fn sanitize() {
        for (input, expected) in [
            ("", ""),
            ("build server", "build_server"),
            ("a.b-c_d", "a.b-c_d"),
            ("rm -rf /; echo", "rm_-rf__echo"),
            ("../../etc/passwd", "......etcpasswd"),
            ("héllo wörld", "hllo_wrld"),
        ] {
            assert_eq!(super::sanitize(input), expected);
        }

        let long: String = std::iter::repeat('a').take(100).collect();
        assert_eq!(super::sanitize(&long).len(), 64);
    }

    #[test]
    fn validate() {
        assert_eq!(super::validate("").unwrap(), "");
        assert_eq!(super::validate("ci deploy key").unwrap(), "ci_deploy_key");

        // Entirely disallowed input must fail rather than become "".
        let _ = super::validate("!!!###").unwrap_err();
        let _ = super::validate("日本語").unwrap_err();
    }
}
