// Copyright (c) The stress-tester Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Runs a stress-testing tool against a single source file, then reports how the run ended.
//!
//! This is a thin front end over [`stress_runner`]: it builds a
//! [`RunConfiguration`](stress_runner::config::RunConfiguration) from flags or a TOML file, runs
//! one [`RunUnit`](stress_runner::unit::RunUnit), and cancels it on Ctrl-C.

#![warn(missing_docs)]

mod dispatch;
mod errors;
mod exit_codes;
mod output;

#[doc(hidden)]
pub use dispatch::*;
#[doc(hidden)]
pub use errors::*;
pub use exit_codes::StressExitCode;
