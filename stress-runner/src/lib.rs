// Copyright (c) The stress-tester Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Core functionality for running a single stress-testing tool invocation.
//!
//! The unit of work is a [`RunUnit`](unit::RunUnit): it turns a
//! [`RunConfiguration`](config::RunConfiguration) into a command line, runs the tool through a
//! [`ProcessInvoker`](invoker::ProcessInvoker), parses the newline-delimited messages the tool
//! writes to standard output, and classifies the run into an [`Outcome`](unit::Outcome).
//!
//! Scheduling many units, deciding what to test, and aggregating results are left to callers.

pub mod config;
pub mod errors;
pub mod invoker;
pub mod protocol;
pub mod unit;
