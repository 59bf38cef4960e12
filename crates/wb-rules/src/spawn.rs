//! Process invocation with normalized options
//!
//! Three call shapes are accepted: no options (run and forget), a bare exit
//! callback (nothing captured), or a full [`SpawnOptions`] record whose unset
//! capture flags default to `false`.

use std::fmt;
use std::sync::Arc;
use tracing::{debug, error};
use wb_core::{ProcessOutcome, Value};

use crate::error::RuleResult;
use crate::host::{ProcessExitFn, ProcessHost, ProcessRequest};

/// What an exit callback receives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessExit {
    pub exit_status: i32,
    /// Standard output, only when `capture_output` was requested
    pub output: Option<String>,
    /// Standard error, whenever the host captured it
    pub error_output: Option<String>,
}

/// Caller's exit callback
pub type ExitCallback = Box<dyn FnOnce(ProcessExit) -> RuleResult<()> + Send>;

/// Options for [`Spawner::spawn`]
#[derive(Default)]
pub struct SpawnOptions {
    pub exit_callback: Option<ExitCallback>,
    pub capture_output: Option<bool>,
    pub capture_error_output: Option<bool>,
    /// Written to the process's standard input, converted to text
    pub input: Option<Value>,
}

impl SpawnOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Options for the bare-callback call shape
    pub fn callback<F>(f: F) -> Self
    where
        F: FnOnce(ProcessExit) -> RuleResult<()> + Send + 'static,
    {
        Self {
            exit_callback: Some(Box::new(f)),
            capture_output: Some(false),
            capture_error_output: Some(false),
            input: None,
        }
    }

    pub fn on_exit<F>(mut self, f: F) -> Self
    where
        F: FnOnce(ProcessExit) -> RuleResult<()> + Send + 'static,
    {
        self.exit_callback = Some(Box::new(f));
        self
    }

    pub fn capture_output(mut self, capture: bool) -> Self {
        self.capture_output = Some(capture);
        self
    }

    pub fn capture_error_output(mut self, capture: bool) -> Self {
        self.capture_error_output = Some(capture);
        self
    }

    pub fn input(mut self, input: impl Into<Value>) -> Self {
        self.input = Some(input.into());
        self
    }

    fn input_text(&self) -> Option<String> {
        match self.input.as_ref()? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

impl fmt::Debug for SpawnOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpawnOptions")
            .field("exit_callback", &self.exit_callback.is_some())
            .field("capture_output", &self.capture_output)
            .field("capture_error_output", &self.capture_error_output)
            .field("input", &self.input)
            .finish()
    }
}

/// Normalizes process invocations and hands them to the host
pub struct Spawner {
    host: Arc<dyn ProcessHost>,
    shell: String,
}

impl Spawner {
    pub fn new(host: Arc<dyn ProcessHost>, shell: impl Into<String>) -> Self {
        Self {
            host,
            shell: shell.into(),
        }
    }

    /// Run `command` with `args`
    pub fn spawn<S: AsRef<str>>(
        &self,
        command: &str,
        args: &[S],
        options: impl Into<Option<SpawnOptions>>,
    ) {
        let options = options.into().unwrap_or_default();
        let capture_output = options.capture_output.unwrap_or(false);
        let capture_error_output = options.capture_error_output.unwrap_or(false);
        let input = options.input_text();

        let argv: Vec<String> = std::iter::once(command.to_string())
            .chain(args.iter().map(|a| a.as_ref().to_string()))
            .collect();
        debug!(?argv, capture_output, capture_error_output, "Spawning process");

        let exit_callback = options
            .exit_callback
            .map(|callback| Self::isolate(command, callback, capture_output));

        self.host.spawn_process(ProcessRequest {
            argv,
            exit_callback,
            capture_output,
            capture_error_output,
            input,
        });
    }

    /// Run `command` through the configured shell (`<shell> -c <command>`)
    pub fn run_shell_command(&self, command: &str, options: impl Into<Option<SpawnOptions>>) {
        self.spawn(&self.shell, &["-c", command], options);
    }

    fn isolate(command: &str, callback: ExitCallback, capture_output: bool) -> ProcessExitFn {
        let command = command.to_string();
        Box::new(move |outcome: ProcessOutcome| {
            let exit = ProcessExit {
                exit_status: outcome.exit_status,
                output: outcome.captured_output.filter(|_| capture_output),
                error_output: outcome.captured_error_output,
            };
            if let Err(e) = callback(exit) {
                error!(command = %command, error = %e, "Error running command callback");
            }
        })
    }
}
