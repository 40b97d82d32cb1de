// Copyright (c) The stress-tester Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The message protocol the stress-testing tool speaks on standard output.
//!
//! The tool writes one JSON object per line:
//!
//! ```text
//! {"message":"produced","value":{"request":"CursorInfo","offset":12}}
//! {"message":"detected","value":{"kind":"crashed","message":"tool crashed at offset 40"}}
//! ```
//!
//! [`parse_output`] turns the whole captured stream into a [`ParsedOutput`], or fails if any line
//! is not a valid message or if more than one error is detected.

use crate::errors::OutputParseError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An error the tool diagnosed while exercising a file.
///
/// Apart from `kind` and `message`, the payload is carried through untouched.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub struct DiagnosedError {
    /// What sort of problem was found.
    pub kind: String,

    /// A human-readable description of the problem.
    pub message: String,

    /// Any additional fields the tool reported.
    #[serde(flatten)]
    pub details: serde_json::Map<String, serde_json::Value>,
}

impl fmt::Display for DiagnosedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// A response the tool received while exercising a file. Opaque.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct ResponseRecord(pub serde_json::Value);

/// A single line of tool output.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(tag = "message", content = "value", rename_all = "kebab-case")]
pub enum ProtocolMessage {
    /// The tool detected an error.
    Detected(DiagnosedError),

    /// The tool produced a response.
    Produced(ResponseRecord),
}

impl ProtocolMessage {
    /// Decodes a single line.
    pub fn from_line(line: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(line)
    }
}

/// The result of folding a tool's output into at most one error and a list of responses.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ParsedOutput {
    /// The single error the tool detected, if any.
    pub error: Option<DiagnosedError>,

    /// Every response, in the order the tool produced them.
    pub responses: Vec<ResponseRecord>,
}

/// Parses a captured output stream.
///
/// The stream is split on `\n`; empty lines are skipped. Any line that fails to decode, or a
/// second [`ProtocolMessage::Detected`], fails the whole parse: partial output is never returned.
pub fn parse_output(stdout: &[u8]) -> Result<ParsedOutput, OutputParseError> {
    let mut parsed = ParsedOutput::default();

    let lines = stdout.split(|&b| b == b'\n').filter(|line| !line.is_empty());
    for (idx, line) in lines.enumerate() {
        let line_number = idx + 1;
        let message = ProtocolMessage::from_line(line).map_err(|error| {
            OutputParseError::Malformed {
                line: line_number,
                error,
            }
        })?;

        match message {
            ProtocolMessage::Detected(error) => {
                if parsed.error.is_some() {
                    return Err(OutputParseError::DuplicateError { line: line_number });
                }
                parsed.error = Some(error);
            }
            ProtocolMessage::Produced(response) => parsed.responses.push(response),
        }
    }

    Ok(parsed)
}
