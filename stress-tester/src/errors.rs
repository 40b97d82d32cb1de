// Copyright (c) The stress-tester Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::StressExitCode;
use std::error::Error;
use stress_runner::errors::ConfigLoadError;
use thiserror::Error;

pub(crate) type Result<T, E = ExpectedError> = std::result::Result<T, E>;

// The #[error()] strings are placeholders: errors are meant to be printed with
// display_to_stderr, which walks the source chain.

/// An error that stopped the run from happening or being reported.
#[derive(Debug, Error)]
#[doc(hidden)]
pub enum ExpectedError {
    #[error("run configuration could not be loaded")]
    ConfigLoadError {
        #[from]
        err: ConfigLoadError,
    },
    #[error("required argument missing")]
    MissingArgument { name: &'static str },
    #[error("failed to create async runtime")]
    RuntimeCreateError {
        #[source]
        err: std::io::Error,
    },
    #[error("run worker panicked")]
    WorkerPanicked {
        #[source]
        err: tokio::task::JoinError,
    },
    #[error("error writing output")]
    WriteError {
        #[source]
        err: std::io::Error,
    },
    #[error("error serializing outcome")]
    SerializeError {
        #[source]
        err: serde_json::Error,
    },
}

impl ExpectedError {
    /// Returns the exit code for the process.
    pub fn process_exit_code(&self) -> i32 {
        match self {
            Self::ConfigLoadError { .. } | Self::MissingArgument { .. } => {
                StressExitCode::SETUP_ERROR
            }
            Self::RuntimeCreateError { .. } | Self::WorkerPanicked { .. } => 1,
            Self::WriteError { .. } | Self::SerializeError { .. } => {
                StressExitCode::WRITE_OUTPUT_ERROR
            }
        }
    }

    /// Displays this error to stderr.
    pub fn display_to_stderr(&self) {
        let mut next_error = match self {
            Self::ConfigLoadError { err } => {
                tracing::error!("{err}");
                err.source()
            }
            Self::MissingArgument { name } => {
                tracing::error!("missing required argument `--{name}`");
                None
            }
            Self::RuntimeCreateError { err } => {
                tracing::error!("failed to create async runtime");
                Some(err as &dyn Error)
            }
            Self::WorkerPanicked { err } => {
                tracing::error!("run worker panicked");
                Some(err as &dyn Error)
            }
            Self::WriteError { err } => {
                tracing::error!("failed to write output");
                Some(err as &dyn Error)
            }
            Self::SerializeError { err } => {
                tracing::error!("failed to serialize outcome");
                Some(err as &dyn Error)
            }
        };

        while let Some(err) = next_error {
            tracing::error!(target: "stress_tester::no_heading", "\nCaused by:\n  {}", err);
            next_error = err.source();
        }
    }
}
