// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Config error diagnostics.
//!
//! Figment failures become miette reports keyed by the dotted config path
//! (`server.port`), pointing into the TOML file that caused them and
//! suggesting the closest valid key for typos.

#![allow(unused_assignments)] // miette's Diagnostic derive generates code triggering this lint

use std::path::Path;

use figment::error::{Error as FigmentError, Kind};
use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Minimum Jaro-Winkler similarity for a "did you mean" suggestion.
const SUGGESTION_THRESHOLD: f64 = 0.75;

/// Name given to configuration passed as a string rather than a file.
pub const INLINE_SOURCE: &str = "<inline>";

/// A TOML document that took part in a load, kept so errors can quote it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub name: String,
    pub content: String,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    pub fn inline(content: impl Into<String>) -> Self {
        Self::new(INLINE_SOURCE, content)
    }

    /// Reads `path`; `None` when it is missing or unreadable.
    pub fn read(path: &Path) -> Option<Self> {
        std::fs::read_to_string(path)
            .ok()
            .map(|content| Self::new(path.display().to_string(), content))
    }
}

/// A configuration problem, ready for miette rendering.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("unknown configuration key `{key}`")]
    #[diagnostic(
        code(switchboard::config::unknown_key),
        help("{}", unknown_key_help(suggestion.as_deref(), valid_keys))
    )]
    UnknownKey {
        /// Dotted path, e.g. `server.prot`.
        key: String,
        suggestion: Option<String>,
        /// Keys accepted where this one appeared, comma separated.
        valid_keys: String,
        #[label("not recognized here")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("invalid type for `{key}`: found {found}")]
    #[diagnostic(code(switchboard::config::invalid_type), help("expected {expected}"))]
    InvalidType {
        key: String,
        found: String,
        expected: String,
        #[label("wrong type")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// A parsed value violates a semantic constraint.
    #[error("invalid value for `{key}`: {message}")]
    #[diagnostic(
        code(switchboard::config::validation),
        help("fix `{key}` in switchboard.toml or the matching SWITCHBOARD_* variable")
    )]
    Validation { key: String, message: String },

    #[error("configuration error: {0}")]
    #[diagnostic(code(switchboard::config::other))]
    Other(String),
}

fn unknown_key_help(suggestion: Option<&str>, valid_keys: &str) -> String {
    match suggestion {
        Some(s) => format!("did you mean `{s}`? Valid keys: {valid_keys}"),
        None => format!("valid keys: {valid_keys}"),
    }
}

impl ConfigError {
    /// Shorthand for a [`ConfigError::Validation`].
    pub fn invalid(key: &str, message: impl Into<String>) -> Self {
        Self::Validation {
            key: key.to_string(),
            message: message.into(),
        }
    }

    /// Dotted key path this error refers to, when known.
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::UnknownKey { key, .. }
            | Self::InvalidType { key, .. }
            | Self::Validation { key, .. } => Some(key),
            Self::Other(_) => None,
        }
    }
}

/// Converts every error inside a figment failure, locating each one in `sources`.
pub fn from_figment(err: FigmentError, sources: &[SourceFile]) -> Vec<ConfigError> {
    err.into_iter().map(|e| convert(&e, sources)).collect()
}

fn convert(error: &FigmentError, sources: &[SourceFile]) -> ConfigError {
    match &error.kind {
        // The path names the enclosing table; the field is carried separately.
        Kind::UnknownField(field, expected) => {
            let (span, src) = locate(error, sources, &error.path, field);
            ConfigError::UnknownKey {
                key: dotted(&error.path, field),
                suggestion: suggest_key(field, expected),
                valid_keys: expected.join(", "),
                span,
                src,
            }
        }
        // The path already ends with the offending field.
        Kind::InvalidType(found, expected) => {
            let (span, src) = match error.path.split_last() {
                Some((field, table)) => locate(error, sources, table, field),
                None => (None, None),
            };
            ConfigError::InvalidType {
                key: error.path.join("."),
                found: found.to_string(),
                expected: expected.to_string(),
                span,
                src,
            }
        }
        _ => ConfigError::Other(error.to_string()),
    }
}

fn dotted(table: &[String], field: &str) -> String {
    if table.is_empty() {
        field.to_string()
    } else {
        format!("{}.{field}", table.join("."))
    }
}

/// Picks the source the error came from and finds `field` in it.
fn locate(
    error: &FigmentError,
    sources: &[SourceFile],
    table: &[String],
    field: &str,
) -> (Option<SourceSpan>, Option<NamedSource<String>>) {
    let origin = error
        .metadata
        .as_ref()
        .and_then(|m| m.source.as_ref())
        .and_then(|s| match s {
            figment::Source::File(path) => Some(path.display().to_string()),
            _ => None,
        });
    let source = match origin {
        Some(name) => sources.iter().find(|s| s.name == name),
        None => sources.iter().find(|s| s.name == INLINE_SOURCE),
    };

    source
        .and_then(|s| {
            locate_key(&s.content, table, field)
                .map(|span| (span, NamedSource::new(&s.name, s.content.clone())))
        })
        .map_or((None, None), |(span, src)| (Some(span), Some(src)))
}

/// Byte span of `field` as written under the `[table]` header.
///
/// With an empty `table`, a top-level key or a `[field]` header matches.
pub fn locate_key(content: &str, table: &[String], field: &str) -> Option<SourceSpan> {
    let wanted = table.join(".");
    let mut current = String::new();
    let mut offset = 0;

    for line in content.split_inclusive('\n') {
        let code = line.split('#').next().unwrap_or(line);
        let indent = code.len() - code.trim_start().len();
        let code = code.trim();

        if let Some(header) = code.strip_prefix('[').and_then(|h| h.strip_suffix(']')) {
            current = header.trim().to_string();
            if wanted.is_empty() && current == field {
                let at = line.find(field)?;
                return Some(SourceSpan::new((offset + at).into(), field.len()));
            }
        } else if current == wanted
            && let Some((name, _)) = code.split_once('=')
            && name.trim() == field
        {
            return Some(SourceSpan::new((offset + indent).into(), field.len()));
        }
        offset += line.len();
    }
    None
}

/// The valid key closest to `unknown`, if any is similar enough.
pub fn suggest_key(unknown: &str, valid_keys: &[&str]) -> Option<String> {
    valid_keys
        .iter()
        .map(|key| (strsim::jaro_winkler(unknown, key), *key))
        .filter(|(score, _)| *score > SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, key)| key.to_string())
}

/// Writes each error to stderr with miette's graphical handler.
pub fn render_errors(errors: &[ConfigError]) {
    let handler = miette::GraphicalReportHandler::new();
    for error in errors {
        let mut out = String::new();
        match handler.render_report(&mut out, error as &dyn Diagnostic) {
            Ok(()) => eprint!("{out}"),
            Err(_) => eprintln!("error: {error}"),
        }
    }
}
