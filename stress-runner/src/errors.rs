// Copyright (c) The stress-tester Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by stress-runner.

use crate::config::RewriteMode;
use camino::Utf8PathBuf;
use std::{borrow::Cow, fmt};
use thiserror::Error;

/// An error that occurs while parsing a [`Page`](crate::config::Page) input.
#[derive(Clone, Debug, Error)]
pub struct PageParseError {
    input: String,
    message: Cow<'static, str>,
}

impl PageParseError {
    pub(crate) fn new(input: impl Into<String>, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            input: input.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for PageParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "page '{}' must be in the format \"M/N\":\n{}",
            self.input, self.message
        )
    }
}

/// Error returned while parsing a [`RewriteMode`] value from a string.
#[derive(Clone, Debug, Error)]
#[error(
    "unrecognized value for rewrite mode: {input}\n(known values: {})",
    RewriteMode::variants().join(", "),
)]
pub struct RewriteModeParseError {
    input: String,
}

impl RewriteModeParseError {
    pub(crate) fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
        }
    }
}

/// Error returned while parsing a [`RequestKind`](crate::config::RequestKind) from a string.
#[derive(Clone, Debug, Error)]
#[error("request kind must be a non-empty identifier without whitespace (got {input:?})")]
pub struct RequestKindParseError {
    input: String,
}

impl RequestKindParseError {
    pub(crate) fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
        }
    }
}

/// An error that occurred while reading a run configuration file.
#[derive(Debug, Error)]
#[error("failed to read run configuration at `{path}`")]
pub struct ConfigReadError {
    path: Utf8PathBuf,
    #[source]
    err: std::io::Error,
}

impl ConfigReadError {
    pub(crate) fn new(path: impl Into<Utf8PathBuf>, err: std::io::Error) -> Self {
        Self {
            path: path.into(),
            err,
        }
    }

    /// Returns the path that could not be read.
    pub fn path(&self) -> &Utf8PathBuf {
        &self.path
    }
}

/// An error that occurred while deserializing a run configuration.
#[derive(Debug, Error)]
#[error(
    "failed to parse run configuration{}",
    .path.as_ref().map(|p| format!(" at `{p}`")).unwrap_or_default()
)]
pub struct ConfigParseError {
    path: Option<Utf8PathBuf>,
    #[source]
    err: toml::de::Error,
}

impl ConfigParseError {
    pub(crate) fn new(path: Option<Utf8PathBuf>, err: toml::de::Error) -> Self {
        Self { path, err }
    }
}

/// An error that occurred while loading a run configuration from disk.
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    /// The file could not be read.
    #[error(transparent)]
    Read(#[from] ConfigReadError),

    /// The file was read but could not be parsed.
    #[error(transparent)]
    Parse(#[from] ConfigParseError),
}

/// The tool's standard output could not be interpreted as a sequence of protocol messages.
///
/// Line numbers count non-empty lines only, starting from 1.
#[derive(Debug, Error)]
pub enum OutputParseError {
    /// A line was not a valid protocol message.
    #[error("line {line} is not a valid protocol message")]
    Malformed {
        /// The line that failed to parse.
        line: usize,

        /// The underlying decoding error.
        #[source]
        error: serde_json::Error,
    },

    /// More than one error was detected in the same stream.
    #[error("line {line} reports a second detected error")]
    DuplicateError {
        /// The line containing the second error.
        line: usize,
    },
}
