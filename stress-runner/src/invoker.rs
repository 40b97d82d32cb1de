// Copyright (c) The stress-tester Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Spawning, waiting on, and terminating a single child process.
//!
//! A [`ProcessInvoker`] owns the child it spawns for the duration of [`ProcessInvoker::run`].
//! [`ProcessInvoker::terminate`] may be called from any other thread at any time, and is the only
//! way to interrupt a running child.

use camino::{Utf8Path, Utf8PathBuf};
use duct::Handle;
use std::{
    process::ExitStatus,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};
use tracing::{debug, warn};

/// The exit status reported when the executable could not be spawned or waited on.
///
/// Real processes report exit codes in `0..=255`, or a negated signal number on Unix, so this value
/// never collides with anything the tool itself produces.
pub const SPAWN_FAILED_EXIT_STATUS: i32 = i32::MIN;

/// Runs one executable with a fixed argument vector and captures what it writes.
///
/// Arguments are passed to the operating system directly, without going through a shell.
#[derive(Debug)]
pub struct ProcessInvoker {
    program: Utf8PathBuf,
    args: Vec<String>,
    state: Mutex<InvokerState>,
}

#[derive(Debug)]
enum InvokerState {
    Idle,
    Running(Arc<Handle>),
    Finished,
    // Latched: once termination is requested, no further process is spawned.
    Terminated,
}

impl ProcessInvoker {
    /// Creates a new invoker. No process is spawned until [`Self::run`] is called.
    pub fn new(program: impl Into<Utf8PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            state: Mutex::new(InvokerState::Idle),
        }
    }

    /// The executable this invoker runs.
    pub fn program(&self) -> &Utf8Path {
        &self.program
    }

    /// The arguments passed to the executable.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Spawns the process and blocks until it exits or is terminated.
    ///
    /// Failures to spawn or wait are reported through [`SPAWN_FAILED_EXIT_STATUS`] rather than
    /// as errors. If [`Self::terminate`] was called before or during this call, the returned
    /// result is marked as terminated and its output is empty.
    pub fn run(&self) -> InvocationResult {
        let handle = {
            let mut state = self.lock_state();
            match &*state {
                InvokerState::Idle | InvokerState::Finished => {}
                InvokerState::Terminated => {
                    debug!(program = %self.program, "termination requested before spawn, skipping");
                    return InvocationResult::terminated();
                }
                InvokerState::Running(_) => {
                    warn!(program = %self.program, "invoker is already running a process");
                    return InvocationResult::spawn_failed();
                }
            }

            // Spawn while holding the lock, so a concurrent terminate either sees the handle or
            // prevents the spawn altogether.
            // duct treats a single-component `Path` as `./name`: pass a `&str` so that bare names
            // are looked up in PATH.
            let expr = duct::cmd(self.program.as_str(), &self.args)
                .stdin_null()
                .stdout_capture()
                .stderr_capture()
                .unchecked();
            // Put the child in its own process group, so that terminating it also reaches any
            // processes it spawned that still hold the output pipes.
            #[cfg(unix)]
            let expr = expr.before_spawn(|cmd| {
                use std::os::unix::process::CommandExt;
                cmd.process_group(0);
                Ok(())
            });
            match expr.start() {
                Ok(handle) => {
                    debug!(program = %self.program, args = ?self.args, "spawned process");
                    let handle = Arc::new(handle);
                    *state = InvokerState::Running(handle.clone());
                    handle
                }
                Err(error) => {
                    warn!(program = %self.program, %error, "failed to spawn process");
                    *state = InvokerState::Finished;
                    return InvocationResult::spawn_failed();
                }
            }
        };

        let res = handle.wait();

        let mut state = self.lock_state();
        if matches!(*state, InvokerState::Terminated) {
            debug!(program = %self.program, "process was terminated");
            return InvocationResult::terminated();
        }
        *state = InvokerState::Finished;
        drop(state);

        match res {
            Ok(output) => {
                let exit_status = exit_status_code(output.status);
                debug!(program = %self.program, exit_status, "process exited");
                InvocationResult {
                    exit_status,
                    stdout: output.stdout.clone(),
                    stderr: output.stderr.clone(),
                    terminated: false,
                }
            }
            Err(error) => {
                warn!(program = %self.program, %error, "failed to wait for process");
                InvocationResult::spawn_failed()
            }
        }
    }

    /// Requests termination of the running process.
    ///
    /// Safe to call from any thread, any number of times. If no process has been spawned yet,
    /// later calls to [`Self::run`] return without spawning. If the process already finished,
    /// this does nothing.
    pub fn terminate(&self) {
        let mut state = self.lock_state();
        let handle = match std::mem::replace(&mut *state, InvokerState::Terminated) {
            InvokerState::Running(handle) => handle,
            InvokerState::Idle | InvokerState::Terminated => return,
            InvokerState::Finished => {
                *state = InvokerState::Finished;
                return;
            }
        };
        // Release the lock before killing: the waiting thread re-acquires it once the child is
        // gone.
        drop(state);

        if let Ok(Some(_)) = handle.try_wait() {
            debug!(program = %self.program, "process already exited, not terminating");
            return;
        }

        let pids = handle.pids();
        debug!(program = %self.program, ?pids, "terminating process");
        #[cfg(unix)]
        for pid in pids {
            // Each child leads its own process group, so a negative pid signals the whole group.
            //
            // SAFETY: kill(2) has no memory-safety preconditions. The handle has not been reaped
            // as of the try_wait above, so the group id is still ours. The run thread may reap it
            // between that check and this call; the pgid could then in principle be reused, but
            // the window is a few instructions wide and matches how the child is killed below.
            unsafe {
                libc::kill(-(pid as libc::pid_t), libc::SIGKILL);
            }
        }
        if let Err(error) = handle.kill() {
            // The child may already have exited between the wait returning and now.
            debug!(program = %self.program, %error, "error while terminating process");
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, InvokerState> {
        // The state is a plain enum that is always left consistent, so poisoning is harmless.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// What a finished (or terminated) invocation produced.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InvocationResult {
    /// The exit code, a negated signal number, or [`SPAWN_FAILED_EXIT_STATUS`].
    pub exit_status: i32,

    /// Everything the process wrote to standard output.
    pub stdout: Vec<u8>,

    /// Everything the process wrote to standard error.
    pub stderr: Vec<u8>,

    /// True if the process was terminated, or never spawned because termination was requested.
    pub terminated: bool,
}

impl InvocationResult {
    fn terminated() -> Self {
        Self {
            exit_status: SPAWN_FAILED_EXIT_STATUS,
            stdout: Vec::new(),
            stderr: Vec::new(),
            terminated: true,
        }
    }

    fn spawn_failed() -> Self {
        Self {
            exit_status: SPAWN_FAILED_EXIT_STATUS,
            stdout: Vec::new(),
            stderr: Vec::new(),
            terminated: false,
        }
    }

    /// Returns true if the process exited with status 0.
    pub fn is_success(&self) -> bool {
        self.exit_status == 0
    }
}

fn exit_status_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return -signal;
        }
    }

    SPAWN_FAILED_EXIT_STATUS
}
