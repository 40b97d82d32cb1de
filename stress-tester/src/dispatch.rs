// Copyright (c) The stress-tester Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    ExpectedError, StressExitCode,
    errors::Result,
    output::{OutputContext, OutputOpts},
};
use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand, ValueEnum};
use owo_colors::OwoColorize;
use serde::Serialize;
use std::{
    io::{self, Write},
    sync::Arc,
};
use stress_runner::{
    config::{Page, RequestKind, RewriteMode, RunConfiguration},
    unit::{Outcome, RunUnit},
};
use tracing::{info, warn};

/// Run a stress-testing tool against a single source file.
#[derive(Debug, Parser)]
#[command(
    version,
    bin_name = "stress-tester",
    styles = crate::output::clap_styles::style(),
    max_term_width = 100
)]
pub struct StressTesterApp {
    #[clap(flatten)]
    output: OutputOpts,

    #[clap(subcommand)]
    command: Command,
}

impl StressTesterApp {
    /// Initializes logging and color support.
    pub fn init_output(&self) -> OutputContext {
        self.output.init()
    }

    /// Executes the app, returning the process exit code.
    pub fn exec(self, output: OutputContext) -> Result<i32> {
        match self.command {
            Command::Run {
                config,
                message_format,
            } => {
                let config = config.build()?;
                exec_run(config, message_format, output)
            }
            Command::ShowArgs { config } => {
                let unit = RunUnit::new(config.build()?);
                let mut stdout = io::stdout().lock();
                writeln!(stdout, "{}", unit.command_line())
                    .map_err(|err| ExpectedError::WriteError { err })?;
                Ok(StressExitCode::OK)
            }
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the tool once and report how the run ended
    Run {
        #[clap(flatten)]
        config: ConfigOpts,

        /// Format to report the outcome in
        #[arg(long, value_enum, default_value_t, value_name = "FORMAT")]
        message_format: MessageFormat,
    },
    /// Print the command line a run would use, without running it
    ShowArgs {
        #[clap(flatten)]
        config: ConfigOpts,
    },
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, ValueEnum)]
enum MessageFormat {
    /// A human-readable summary
    #[default]
    Human,
    /// A single JSON object
    Json,
}

#[derive(Debug, Args)]
#[command(next_help_heading = "Run configuration")]
struct ConfigOpts {
    /// Read the run configuration from a TOML file instead of flags
    #[arg(
        long,
        value_name = "PATH",
        conflicts_with_all = [
            "executable", "file", "rewrite_mode", "requests", "type_list_items",
            "limit", "page", "report_responses", "tool_name", "tool_args",
        ]
    )]
    config: Option<Utf8PathBuf>,

    /// Path to the stress-testing executable
    #[arg(long, value_name = "PATH", required_unless_present = "config")]
    executable: Option<Utf8PathBuf>,

    /// Source file to exercise
    #[arg(long, value_name = "PATH", required_unless_present = "config")]
    file: Option<Utf8PathBuf>,

    /// Rewrite mode: none, basic, insideOut, concurrent [default: basic]
    #[arg(long, value_name = "MODE")]
    rewrite_mode: Option<RewriteMode>,

    /// Request kind to exercise (may be repeated)
    #[arg(long = "request", value_name = "KIND")]
    requests: Vec<RequestKind>,

    /// Conforming-method type filter (may be repeated)
    #[arg(long = "type-list-item", value_name = "TYPE")]
    type_list_items: Vec<String>,

    /// Maximum number of requests to issue
    #[arg(long, value_name = "N")]
    limit: Option<u64>,

    /// Page of the workload to cover [default: 1/1]
    #[arg(long, value_name = "INDEX/TOTAL")]
    page: Option<Page>,

    /// Ask the tool to report every response
    #[arg(long)]
    report_responses: bool,

    /// Name of the compiler tool whose arguments are forwarded
    #[arg(long, value_name = "NAME", required_unless_present = "config")]
    tool_name: Option<String>,

    /// Arguments forwarded to the compiler tool
    #[arg(last = true, value_name = "TOOL-ARGS")]
    tool_args: Vec<String>,
}

impl ConfigOpts {
    fn build(self) -> Result<RunConfiguration> {
        if let Some(path) = self.config {
            return Ok(RunConfiguration::from_path(&path)?);
        }

        // clap enforces these unless --config is passed.
        let executable = self
            .executable
            .ok_or(ExpectedError::MissingArgument { name: "executable" })?;
        let file = self
            .file
            .ok_or(ExpectedError::MissingArgument { name: "file" })?;
        let tool_name = self
            .tool_name
            .ok_or(ExpectedError::MissingArgument { name: "tool-name" })?;

        let mut config = RunConfiguration::new(
            executable,
            file,
            self.rewrite_mode.unwrap_or(RewriteMode::Basic),
            self.page.unwrap_or(Page::single()),
            tool_name,
        );
        config.requests = self.requests.into_iter().collect();
        config.type_list_items = self.type_list_items;
        config.limit = self.limit;
        config.report_responses = self.report_responses;
        config.tool_args = self.tool_args;
        Ok(config)
    }
}

fn exec_run(
    config: RunConfiguration,
    message_format: MessageFormat,
    output: OutputContext,
) -> Result<i32> {
    let unit = Arc::new(RunUnit::new(config));

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| ExpectedError::RuntimeCreateError { err })?;
    let outcome = runtime.block_on(run_until_done(unit.clone()))?;

    let mut stdout = io::stdout().lock();
    match message_format {
        MessageFormat::Human => write_human(&mut stdout, &unit, &outcome, output)
            .map_err(|err| ExpectedError::WriteError { err })?,
        MessageFormat::Json => {
            let report = RunReport {
                summary: unit.summary().to_string(),
                file: unit.config().file.as_str(),
                outcome: &outcome,
            };
            serde_json::to_writer(&mut stdout, &report)
                .map_err(|err| ExpectedError::SerializeError { err })?;
            writeln!(stdout).map_err(|err| ExpectedError::WriteError { err })?;
        }
    }

    Ok(StressExitCode::for_outcome(&outcome))
}

/// Executes the unit on a blocking worker, cancelling it on Ctrl-C.
async fn run_until_done(unit: Arc<RunUnit>) -> Result<Outcome> {
    let mut worker = tokio::task::spawn_blocking({
        let unit = unit.clone();
        move || unit.execute().clone()
    });

    tokio::select! {
        res = &mut worker => {
            return res.map_err(|err| ExpectedError::WorkerPanicked { err });
        }
        res = tokio::signal::ctrl_c() => {
            match res {
                Ok(()) => {
                    info!("interrupted, cancelling run");
                    unit.cancel();
                }
                Err(error) => {
                    warn!(%error, "unable to listen for interrupts, run cannot be cancelled");
                }
            }
        }
    }

    worker
        .await
        .map_err(|err| ExpectedError::WorkerPanicked { err })
}

#[derive(Debug, Serialize)]
struct RunReport<'a> {
    summary: String,
    file: &'a str,
    outcome: &'a Outcome,
}

fn write_human(
    writer: &mut dyn Write,
    unit: &RunUnit,
    outcome: &Outcome,
    output: OutputContext,
) -> io::Result<()> {
    let styles = output.stdout_styles();
    let kind = outcome.kind();
    let status_style = match outcome {
        Outcome::Passed { .. } => styles.pass,
        Outcome::Cancelled | Outcome::Unexecuted => styles.cancel,
        Outcome::Failed { .. } | Outcome::Errored { .. } => styles.fail,
    };

    write!(
        writer,
        "{:>10} {} [{}]",
        kind.style(status_style),
        unit.summary().style(styles.bold),
        unit.config().file,
    )?;

    match outcome {
        Outcome::Unexecuted | Outcome::Cancelled => writeln!(writer)?,
        Outcome::Passed { responses } => {
            writeln!(writer, ": {} responses", responses.len())?;
        }
        Outcome::Failed { error, responses } => {
            writeln!(writer, ": {error} (after {} responses)", responses.len())?;
        }
        Outcome::Errored { exit_status, .. } => {
            writeln!(writer, ": tool exited with status {exit_status}")?;
            writeln!(writer, "  to reproduce: {}", unit.command_line())?;
        }
    }

    if output.verbose {
        if let Outcome::Passed { responses } | Outcome::Failed { responses, .. } = outcome {
            for response in responses {
                writeln!(writer, "  {}", response.0)?;
            }
        }
    }

    Ok(())
}
