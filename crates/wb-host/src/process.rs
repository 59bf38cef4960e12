//! Process execution on a tokio runtime

use std::io;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::runtime::Handle;
use tracing::{debug, error, warn};
use wb_core::ProcessOutcome;
use wb_rules::{ProcessHost, ProcessRequest};

/// Exit status reported when a process could not be started or awaited
pub const SPAWN_FAILURE_STATUS: i32 = -1;

/// Runs requested processes as tokio tasks
///
/// The exit callback is invoked on a runtime worker thread once the process
/// has exited and its captured streams have been read.
#[derive(Clone)]
pub struct SystemProcesses {
    runtime: Handle,
}

impl SystemProcesses {
    pub fn new(runtime: Handle) -> Self {
        Self { runtime }
    }

    /// Use the runtime of the calling context
    pub fn current() -> Result<Self, tokio::runtime::TryCurrentError> {
        Handle::try_current().map(Self::new)
    }
}

impl ProcessHost for SystemProcesses {
    fn spawn_process(&self, request: ProcessRequest) {
        self.runtime.spawn(run(request));
    }
}

async fn run(request: ProcessRequest) {
    let ProcessRequest {
        argv,
        exit_callback,
        capture_output,
        capture_error_output,
        input,
    } = request;

    let outcome = match execute(&argv, input, capture_output, capture_error_output).await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!(?argv, error = %e, "Failed to run process");
            ProcessOutcome::exited(SPAWN_FAILURE_STATUS)
        }
    };
    debug!(?argv, exit_status = outcome.exit_status, "Process exited");

    if let Some(callback) = exit_callback {
        callback(outcome);
    }
}

fn stdio(capture: bool) -> Stdio {
    if capture {
        Stdio::piped()
    } else {
        Stdio::null()
    }
}

async fn execute(
    argv: &[String],
    input: Option<String>,
    capture_output: bool,
    capture_error_output: bool,
) -> io::Result<ProcessOutcome> {
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "empty command line"))?;

    let mut child = Command::new(program)
        .args(args)
        .stdin(if input.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(stdio(capture_output))
        .stderr(stdio(capture_error_output))
        .kill_on_drop(true)
        .spawn()?;

    if let (Some(input), Some(mut stdin)) = (input, child.stdin.take()) {
        // Input is written concurrently with output collection
        tokio::spawn(async move {
            if let Err(e) = stdin.write_all(input.as_bytes()).await {
                warn!(error = %e, "Failed to write process input");
            }
        });
    }

    let output = child.wait_with_output().await?;
    Ok(ProcessOutcome {
        exit_status: output.status.code().unwrap_or(SPAWN_FAILURE_STATUS),
        captured_output: capture_output
            .then(|| String::from_utf8_lossy(&output.stdout).into_owned()),
        captured_error_output: capture_error_output
            .then(|| String::from_utf8_lossy(&output.stderr).into_owned()),
    })
}
