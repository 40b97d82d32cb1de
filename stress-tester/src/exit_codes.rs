// Copyright (c) The stress-tester Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use stress_runner::unit::Outcome;

/// Documented exit codes for `stress-tester`.
///
/// Unknown/unexpected failures will always result in exit code 1.
pub enum StressExitCode {}

impl StressExitCode {
    /// No errors occurred and the run passed.
    pub const OK: i32 = 0;

    /// The tool diagnosed an error.
    pub const RUN_FAILED: i32 = 100;

    /// The tool failed without a diagnosis, produced unreadable output, or could not be started.
    pub const RUN_ERRORED: i32 = 101;

    /// The run was cancelled.
    pub const RUN_CANCELLED: i32 = 102;

    /// A user issue happened while setting up the run.
    pub const SETUP_ERROR: i32 = 96;

    /// Writing data to stdout or stderr produced an error.
    pub const WRITE_OUTPUT_ERROR: i32 = 110;

    /// Returns the exit code for a finished run.
    pub fn for_outcome(outcome: &Outcome) -> i32 {
        match outcome {
            Outcome::Passed { .. } => Self::OK,
            Outcome::Failed { .. } => Self::RUN_FAILED,
            // An unexecuted outcome after a run means the run never completed.
            Outcome::Errored { .. } | Outcome::Unexecuted => Self::RUN_ERRORED,
            Outcome::Cancelled => Self::RUN_CANCELLED,
        }
    }
}
