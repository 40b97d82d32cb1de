// Copyright (c) The stress-tester Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

// The fixture tools are shell scripts.
#![cfg(unix)]

mod basic;
mod fixtures;
