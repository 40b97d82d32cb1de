// Copyright (c) The stress-tester Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration for a single stress-testing run.
//!
//! A [`RunConfiguration`] is constructed once by the scheduler and handed to a
//! [`RunUnit`](crate::unit::RunUnit), which never changes it. Configurations can be built in code
//! or loaded from TOML:
//!
//! ```toml
//! executable = "/usr/bin/stress-tool"
//! file = "src/lib.swift"
//! rewrite-mode = "basic"
//! page = "2/5"
//! tool-name = "swiftc"
//! tool-args = ["-module-name", "Example"]
//! ```

use crate::errors::{
    ConfigLoadError, ConfigParseError, ConfigReadError, PageParseError, RequestKindParseError,
    RewriteModeParseError,
};
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeSet, fmt, str::FromStr};

/// Everything needed to invoke the stress-testing tool against one file.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct RunConfiguration {
    /// Path to the stress-testing executable.
    pub executable: Utf8PathBuf,

    /// The source file to exercise.
    pub file: Utf8PathBuf,

    /// How the tool should rewrite the file between requests.
    pub rewrite_mode: RewriteMode,

    /// The request kinds to exercise. Empty means the tool's default set.
    #[serde(default)]
    pub requests: BTreeSet<RequestKind>,

    /// Conforming-method type filters, forwarded in order.
    #[serde(default)]
    pub type_list_items: Vec<String>,

    /// An upper bound on the number of requests the tool issues.
    #[serde(default)]
    pub limit: Option<u64>,

    /// Which page of the workload this run covers.
    pub page: Page,

    /// Whether the tool should report every response it receives.
    #[serde(default)]
    pub report_responses: bool,

    /// The name of the compiler tool whose arguments are forwarded.
    pub tool_name: String,

    /// Arguments forwarded to the compiler tool, verbatim.
    #[serde(default)]
    pub tool_args: Vec<String>,
}

impl RunConfiguration {
    /// Creates a configuration with no optional settings.
    pub fn new(
        executable: impl Into<Utf8PathBuf>,
        file: impl Into<Utf8PathBuf>,
        rewrite_mode: RewriteMode,
        page: Page,
        tool_name: impl Into<String>,
    ) -> Self {
        Self {
            executable: executable.into(),
            file: file.into(),
            rewrite_mode,
            requests: BTreeSet::new(),
            type_list_items: Vec::new(),
            limit: None,
            page,
            report_responses: false,
            tool_name: tool_name.into(),
            tool_args: Vec::new(),
        }
    }

    /// Parses a configuration from a TOML string.
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigParseError> {
        toml::from_str(input).map_err(|err| ConfigParseError::new(None, err))
    }

    /// Reads and parses a configuration from a TOML file.
    pub fn from_path(path: &Utf8Path) -> Result<Self, ConfigLoadError> {
        let contents =
            std::fs::read_to_string(path).map_err(|err| ConfigReadError::new(path, err))?;
        let config =
            toml::from_str(&contents).map_err(|err| ConfigParseError::new(Some(path.into()), err))?;
        Ok(config)
    }
}

/// A contiguous slice of a larger workload, identified by `index/total`.
///
/// The index counts up from 1 and never exceeds the total.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq, Deserialize, Serialize)]
#[serde(try_from = "String", into = "String")]
pub struct Page {
    index: u64,
    total: u64,
}

impl Page {
    /// Creates a new page, checking that `1 <= index <= total`.
    pub fn new(index: u64, total: u64) -> Result<Self, PageParseError> {
        if !(1..=total).contains(&index) {
            return Err(PageParseError::new(
                format!("{index}/{total}"),
                format!("index {index} must be a number between 1 and total {total}, inclusive"),
            ));
        }
        Ok(Self { index, total })
    }

    /// The page covering the entire workload.
    pub const fn single() -> Self {
        Self { index: 1, total: 1 }
    }

    /// The index of this page, counting up from 1.
    pub fn index(&self) -> u64 {
        self.index
    }

    /// The total number of pages.
    pub fn total(&self) -> u64 {
        self.total
    }
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.index, self.total)
    }
}

impl FromStr for Page {
    type Err = PageParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some((index_str, total_str)) = s.split_once('/') else {
            return Err(PageParseError::new(s, "missing '/' separator"));
        };

        let index: u64 = index_str.parse().map_err(|err| {
            PageParseError::new(s, format!("failed to parse index '{index_str}' as u64: {err}"))
        })?;
        let total: u64 = total_str.parse().map_err(|err| {
            PageParseError::new(s, format!("failed to parse total '{total_str}' as u64: {err}"))
        })?;

        Self::new(index, total)
    }
}

impl TryFrom<String> for Page {
    type Error = PageParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Page> for String {
    fn from(page: Page) -> Self {
        page.to_string()
    }
}

/// How the tool rewrites the source file while issuing requests.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RewriteMode {
    /// Issue requests against the file as-is.
    None,
    /// Rebuild the file token by token from the start.
    Basic,
    /// Rebuild the file from the innermost expressions outwards.
    InsideOut,
    /// Issue requests against several rewrite states at once.
    Concurrent,
}

impl RewriteMode {
    /// Returns the wire names of all rewrite modes.
    pub fn variants() -> [&'static str; 4] {
        ["none", "basic", "insideOut", "concurrent"]
    }

    /// Returns the name the tool accepts for this mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            RewriteMode::None => "none",
            RewriteMode::Basic => "basic",
            RewriteMode::InsideOut => "insideOut",
            RewriteMode::Concurrent => "concurrent",
        }
    }
}

impl fmt::Display for RewriteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RewriteMode {
    type Err = RewriteModeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let val = match s {
            "none" => RewriteMode::None,
            "basic" => RewriteMode::Basic,
            "insideOut" => RewriteMode::InsideOut,
            "concurrent" => RewriteMode::Concurrent,
            other => return Err(RewriteModeParseError::new(other)),
        };
        Ok(val)
    }
}

/// A kind of request the tool should exercise, forwarded verbatim.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Deserialize, Serialize)]
#[serde(try_from = "String", into = "String")]
pub struct RequestKind(String);

impl RequestKind {
    /// Returns the identifier as passed to the tool.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RequestKind {
    type Err = RequestKindParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || s.chars().any(char::is_whitespace) {
            return Err(RequestKindParseError::new(s));
        }
        Ok(Self(s.to_owned()))
    }
}

impl TryFrom<String> for RequestKind {
    type Error = RequestKindParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RequestKind> for String {
    fn from(kind: RequestKind) -> Self {
        kind.0
    }
}
