// Copyright (c) The stress-tester Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A single unit of stress-testing work.
//!
//! The main structure in this module is [`RunUnit`]. A scheduler creates one per file and page,
//! calls [`RunUnit::execute`] on a worker thread, and may call [`RunUnit::cancel`] from any other
//! thread. Once `execute` returns, the [`Outcome`] describes what happened.

use crate::{
    config::RunConfiguration,
    invoker::{InvocationResult, ProcessInvoker},
    protocol::{DiagnosedError, ParsedOutput, ResponseRecord, parse_output},
};
use serde::Serialize;
use std::{
    fmt,
    sync::{
        OnceLock,
        atomic::{AtomicBool, Ordering},
    },
};
use tracing::debug;

/// How a run ended.
///
/// A run starts as [`Outcome::Unexecuted`] and moves to exactly one of the other variants.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case", rename_all_fields = "kebab-case")]
pub enum Outcome {
    /// The run has not happened yet.
    Unexecuted,

    /// The run was cancelled before or while the tool was running.
    Cancelled,

    /// The tool exited successfully.
    Passed {
        /// The responses the tool produced.
        responses: Vec<ResponseRecord>,
    },

    /// The tool exited unsuccessfully and reported exactly one error.
    Failed {
        /// The error the tool reported.
        error: DiagnosedError,

        /// The responses the tool produced.
        responses: Vec<ResponseRecord>,
    },

    /// The tool exited unsuccessfully without a diagnosis, or its output could not be parsed.
    Errored {
        /// The tool's exit status.
        exit_status: i32,

        /// The arguments the tool was invoked with, for reproducing the run.
        arguments: Vec<String>,
    },
}

static UNEXECUTED: Outcome = Outcome::Unexecuted;

impl Outcome {
    /// Returns the kind of this outcome.
    pub fn kind(&self) -> OutcomeKind {
        match self {
            Outcome::Unexecuted => OutcomeKind::Unexecuted,
            Outcome::Cancelled => OutcomeKind::Cancelled,
            Outcome::Passed { .. } => OutcomeKind::Passed,
            Outcome::Failed { .. } => OutcomeKind::Failed,
            Outcome::Errored { .. } => OutcomeKind::Errored,
        }
    }

    /// Returns true if the run has finished, one way or another.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Outcome::Unexecuted)
    }

    /// Returns true if the run passed.
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Passed { .. })
    }
}

/// The variant of an [`Outcome`], without its data.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub enum OutcomeKind {
    /// See [`Outcome::Unexecuted`].
    Unexecuted,
    /// See [`Outcome::Cancelled`].
    Cancelled,
    /// See [`Outcome::Passed`].
    Passed,
    /// See [`Outcome::Failed`].
    Failed,
    /// See [`Outcome::Errored`].
    Errored,
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            OutcomeKind::Unexecuted => f.pad("UNEXECUTED"),
            OutcomeKind::Cancelled => f.pad("CANCEL"),
            OutcomeKind::Passed => f.pad("PASS"),
            OutcomeKind::Failed => f.pad("FAIL"),
            OutcomeKind::Errored => f.pad("ERROR"),
        }
    }
}

/// One invocation of the stress-testing tool against one file.
#[derive(Debug)]
pub struct RunUnit {
    config: RunConfiguration,
    invoker: ProcessInvoker,
    cancelled: AtomicBool,
    outcome: OnceLock<Outcome>,
}

impl RunUnit {
    /// Creates a new unit. Nothing is spawned until [`Self::execute`] is called.
    pub fn new(config: RunConfiguration) -> Self {
        let args = build_arguments(&config);
        let invoker = ProcessInvoker::new(config.executable.clone(), args);
        Self {
            config,
            invoker,
            cancelled: AtomicBool::new(false),
            outcome: OnceLock::new(),
        }
    }

    /// The configuration this unit was created with.
    pub fn config(&self) -> &RunConfiguration {
        &self.config
    }

    /// The arguments the tool is invoked with.
    pub fn arguments(&self) -> &[String] {
        self.invoker.args()
    }

    /// The full command line, quoted for a POSIX shell.
    pub fn command_line(&self) -> String {
        shell_words::join(
            std::iter::once(self.invoker.program().as_str())
                .chain(self.arguments().iter().map(String::as_str)),
        )
    }

    /// A short description of this unit for progress reporting.
    pub fn summary(&self) -> RunSummary<'_> {
        RunSummary {
            config: &self.config,
        }
    }

    /// Runs the tool and classifies the result.
    ///
    /// Blocks until the tool exits or is terminated. The run happens at most once: later calls
    /// return the outcome of the first.
    pub fn execute(&self) -> &Outcome {
        self.outcome.get_or_init(|| self.execute_inner())
    }

    /// Returns the outcome, or [`Outcome::Unexecuted`] if [`Self::execute`] hasn't finished.
    pub fn outcome(&self) -> &Outcome {
        self.outcome.get().unwrap_or(&UNEXECUTED)
    }

    /// Cancels the run, terminating the tool if it is running.
    ///
    /// Can be called any number of times, from any thread, at any point.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
        self.invoker.terminate();
    }

    /// Returns true if [`Self::cancel`] has been called.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    fn execute_inner(&self) -> Outcome {
        if self.is_cancelled() {
            debug!(file = %self.config.file, "cancelled before start");
            return Outcome::Cancelled;
        }

        let result = self.invoker.run();
        if result.terminated || self.is_cancelled() {
            if !result.stdout.is_empty() {
                debug!(
                    file = %self.config.file,
                    stdout = %String::from_utf8_lossy(&result.stdout),
                    "discarding output of cancelled run",
                );
            }
            return Outcome::Cancelled;
        }

        self.classify(result)
    }

    fn classify(&self, result: InvocationResult) -> Outcome {
        let parsed = match parse_output(&result.stdout) {
            Ok(parsed) => parsed,
            Err(error) => {
                debug!(
                    file = %self.config.file,
                    exit_status = result.exit_status,
                    %error,
                    stderr = %String::from_utf8_lossy(&result.stderr),
                    "tool output could not be parsed",
                );
                return self.errored(result.exit_status);
            }
        };

        match (result.is_success(), parsed) {
            (true, ParsedOutput { responses, .. }) => Outcome::Passed { responses },
            (
                false,
                ParsedOutput {
                    error: Some(error),
                    responses,
                },
            ) => Outcome::Failed { error, responses },
            (false, ParsedOutput { error: None, .. }) => {
                debug!(
                    file = %self.config.file,
                    exit_status = result.exit_status,
                    stderr = %String::from_utf8_lossy(&result.stderr),
                    "tool failed without reporting an error",
                );
                self.errored(result.exit_status)
            }
        }
    }

    fn errored(&self, exit_status: i32) -> Outcome {
        Outcome::Errored {
            exit_status,
            arguments: self.arguments().to_vec(),
        }
    }
}

/// A short description of a [`RunUnit`], such as `rewrite basic 2/5`.
#[derive(Copy, Clone, Debug)]
pub struct RunSummary<'a> {
    config: &'a RunConfiguration,
}

impl fmt::Display for RunSummary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "rewrite {} {}",
            self.config.rewrite_mode, self.config.page
        )
    }
}

/// Builds the tool's argument vector.
///
/// The tool is sensitive to positional arguments: flags come first, then the file, then the
/// compiler tool name and its arguments.
pub fn build_arguments(config: &RunConfiguration) -> Vec<String> {
    let mut args = vec![
        "--format".to_owned(),
        "json".to_owned(),
        "--page".to_owned(),
        config.page.to_string(),
        "--rewrite-mode".to_owned(),
        config.rewrite_mode.to_string(),
    ];

    if let Some(limit) = config.limit {
        args.extend(["--limit".to_owned(), limit.to_string()]);
    }
    for request in &config.requests {
        args.extend(["--request".to_owned(), request.as_str().to_owned()]);
    }
    for item in &config.type_list_items {
        args.extend(["--type-list-item".to_owned(), item.clone()]);
    }
    if config.report_responses {
        args.push("--report-responses".to_owned());
    }

    args.push(config.file.to_string());
    args.push(config.tool_name.clone());
    args.extend(config.tool_args.iter().cloned());
    args
}
