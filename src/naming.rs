//! Resource name sanitization
//!
//! Every cloud resource the generator emits has its own naming alphabet:
//! Pulumi project and model identifiers are snake_case, storage buckets
//! allow hyphens but not dots, and registry/queue/trigger names are
//! kebab-case. This module centralizes those substitution rules so every
//! renderer derives names the same way.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced while deriving a resource name
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NamingError {
    #[error("resource name is empty after sanitization")]
    Empty,

    #[error("resource name '{name}' contains unsupported character '{ch}'")]
    InvalidChar { name: String, ch: char },
}

/// Naming alphabet for a resource kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NameStyle {
    /// Lowercase snake_case: `.`, `-`, `/` and spaces become `_`.
    /// Used for model identifiers and Pulumi project names.
    Snake,
    /// Bucket names: `.`, `/` and spaces become `_`, hyphens are kept.
    Bucket,
    /// Lowercase kebab-case: `.`, `_`, `/` and spaces become `-`.
    /// Used for artifact/source repositories, task queues and build triggers.
    Kebab,
}

impl NameStyle {
    /// Characters this style replaces with its separator
    fn replaced(&self) -> &'static [char] {
        match self {
            NameStyle::Snake => &['.', '-', '/', ' '],
            NameStyle::Bucket => &['.', '/', ' '],
            NameStyle::Kebab => &['.', '_', '/', ' '],
        }
    }

    /// Separator the replaced characters collapse to
    fn separator(&self) -> char {
        match self {
            NameStyle::Snake | NameStyle::Bucket => '_',
            NameStyle::Kebab => '-',
        }
    }
}

/// Lowercase `raw` and substitute the style's separator for its replaced
/// characters. Total function: any input maps to some (possibly empty)
/// string. Idempotent: sanitizing an already-sanitized name is a no-op.
pub fn sanitize(raw: &str, style: NameStyle) -> String {
    raw.chars()
        .map(|c| {
            if style.replaced().contains(&c) {
                style.separator()
            } else {
                c.to_ascii_lowercase()
            }
        })
        .collect()
}

/// Sanitize `raw` and reject names that are unusable as resource names:
/// empty results, or characters outside `[a-z0-9_-]` that the substitution
/// table does not cover (e.g. `:`, `@`, unicode).
pub fn resource_name(raw: &str, style: NameStyle) -> Result<String, NamingError> {
    let name = sanitize(raw, style);
    if name.is_empty() {
        return Err(NamingError::Empty);
    }
    if let Some(ch) = name
        .chars()
        .find(|c| !c.is_ascii_lowercase() && !c.is_ascii_digit() && *c != '_' && *c != '-')
    {
        return Err(NamingError::InvalidChar { name, ch });
    }
    Ok(name)
}

/// Whether `name` is usable as a Python identifier in generated sources
pub fn is_python_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}
