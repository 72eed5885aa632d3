// SPDX-License-Identifier: AGPL-3.0-or-later

//! Field-level validation rules (§4.2.1). These reject out-of-range input
//! rather than clamp it — the one exception is `Trust.value`, clamped in
//! `graph::trust::Trust::clamp_value` instead of validated here.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("nickname must be 1..=30 chars of [A-Za-z0-9-_.], got {0:?}")]
    Nickname(String),
    #[error("context tag must be 1..=32 chars of [A-Za-z0-9-_], got {0:?}")]
    Context(String),
    #[error("too many contexts: {0} > 32")]
    TooManyContexts(usize),
    #[error("property key must be 1..=256 chars of [A-Za-z0-9-_.], got {0:?}")]
    PropertyKey(String),
    #[error("property value for {key:?} is {len} bytes, must be <= 10240")]
    PropertyValue { key: String, len: usize },
    #[error("too many properties: {0} > 64")]
    TooManyProperties(usize),
    #[error("comment is {0} bytes, must be <= 256")]
    Comment(usize),
}

fn is_nickname_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')
}

fn is_context_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_')
}

fn is_property_key_char(c: char) -> bool {
    is_context_char(c) || c == '.'
}

pub fn validate_nickname(nickname: &str) -> Result<(), ValidationError> {
    let len = nickname.chars().count();
    if !(1..=30).contains(&len) || !nickname.chars().all(is_nickname_char) {
        return Err(ValidationError::Nickname(nickname.to_string()));
    }
    Ok(())
}

pub fn validate_context(tag: &str) -> Result<(), ValidationError> {
    let len = tag.chars().count();
    if !(1..=32).contains(&len) || !tag.chars().all(is_context_char) {
        return Err(ValidationError::Context(tag.to_string()));
    }
    Ok(())
}

pub fn validate_contexts<'a, I: IntoIterator<Item = &'a str>>(
    tags: I,
) -> Result<(), ValidationError> {
    let mut count = 0usize;
    for tag in tags {
        validate_context(tag)?;
        count += 1;
    }
    if count > 32 {
        return Err(ValidationError::TooManyContexts(count));
    }
    Ok(())
}

pub fn validate_property(key: &str, value: &str) -> Result<(), ValidationError> {
    let key_len = key.chars().count();
    if !(1..=256).contains(&key_len) || !key.chars().all(is_property_key_char) {
        return Err(ValidationError::PropertyKey(key.to_string()));
    }
    if value.len() > 10240 {
        return Err(ValidationError::PropertyValue { key: key.to_string(), len: value.len() });
    }
    Ok(())
}

pub fn validate_properties<'a, I: IntoIterator<Item = (&'a str, &'a str)>>(
    properties: I,
) -> Result<(), ValidationError> {
    let mut count = 0usize;
    for (key, value) in properties {
        validate_property(key, value)?;
        count += 1;
    }
    if count > 64 {
        return Err(ValidationError::TooManyProperties(count));
    }
    Ok(())
}

pub fn validate_comment(comment: &str) -> Result<(), ValidationError> {
    if comment.len() > 256 {
        return Err(ValidationError::Comment(comment.len()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nickname_rejects_empty() {
        assert!(validate_nickname("").is_err());
    }

    #[test]
    fn test_nickname_rejects_bad_char() {
        assert!(validate_nickname("alice!").is_err());
    }

    #[test]
    fn test_nickname_accepts_valid() {
        assert!(validate_nickname("alice-bob_99.x").is_ok());
    }

    #[test]
    fn test_contexts_cap_enforced() {
        let tags: Vec<String> = (0..33).map(|i| format!("ctx{i}")).collect();
        let refs: Vec<&str> = tags.iter().map(String::as_str).collect();
        assert!(validate_contexts(refs).is_err());
    }

    #[test]
    fn test_property_value_length_enforced() {
        let big = "x".repeat(10241);
        assert!(validate_property("key", &big).is_err());
    }

    #[test]
    fn test_property_value_allows_empty() {
        assert!(validate_property("key", "").is_ok());
    }

    #[test]
    fn test_comment_length_enforced() {
        let big = "x".repeat(257);
        assert!(validate_comment(&big).is_err());
    }
}
