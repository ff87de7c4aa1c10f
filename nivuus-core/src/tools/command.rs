//! Confirmed shell command execution with a process-group timeout

use super::process_group::{isolate_process_group, kill_process_group};
use crate::agent::session::Session;
use crate::config::constants::{action_types, defaults, messages};
use crate::config::core::CommandsConfig;
use crate::memory::ActionStatus;
use crate::ui::{LoopEvent, UserInteraction};
use crate::utils::{tail_chars, truncate_chars};
use parking_lot::Mutex;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Extra time granted to the output readers once the process group is killed
const DRAIN_GRACE: Duration = Duration::from_millis(500);
const DISPLAY_PREVIEW_CHARS: usize = 500;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("command must not be empty")]
    EmptyCommand,
    #[error("Spawn error: {0}")]
    Spawn(String),
    #[error("Command timed out after {0} seconds.")]
    Timeout(String),
}

/// How a single execution ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Completion {
    Pending = 0,
    Exited = 1,
    TimedOut = 2,
}

/// Single-use completion token shared by the wait path and the watchdog.
/// Only the first transition out of `Pending` succeeds.
#[derive(Debug)]
pub struct CompletionGuard(AtomicU8);

impl Default for CompletionGuard {
    fn default() -> Self {
        Self(AtomicU8::new(Completion::Pending as u8))
    }
}

impl CompletionGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the completion. Returns false when another path already did.
    pub fn try_complete(&self, completion: Completion) -> bool {
        completion != Completion::Pending
            && self
                .0
                .compare_exchange(
                    Completion::Pending as u8,
                    completion as u8,
                    Ordering::AcqRel,
                    Ordering::Acquire,
                )
                .is_ok()
    }

    pub fn state(&self) -> Completion {
        match self.0.load(Ordering::Acquire) {
            1 => Completion::Exited,
            2 => Completion::TimedOut,
            _ => Completion::Pending,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    pub status: ActionStatus,
    /// `None` when the user declined; -1 on timeout, -2 when killed by a signal
    pub exit_code: Option<i32>,
    pub report: String,
    pub timed_out: bool,
}

impl CommandOutcome {
    fn cancelled() -> Self {
        Self {
            status: ActionStatus::Cancelled,
            exit_code: None,
            report: messages::EXECUTION_CANCELLED.to_string(),
            timed_out: false,
        }
    }
}

/// Captured streams and how the process ended
struct RawRun {
    stdout: String,
    stderr: String,
    exit_code: i32,
    timeout_note: Option<String>,
}

pub struct CommandExecutor {
    session: Session,
    interaction: Arc<dyn UserInteraction>,
    config: CommandsConfig,
}

impl CommandExecutor {
    pub fn new(
        session: Session,
        interaction: Arc<dyn UserInteraction>,
        config: CommandsConfig,
    ) -> Self {
        Self {
            session,
            interaction,
            config,
        }
    }

    /// Ask for confirmation, then run `command` through the configured shell.
    /// Process-level failures are reported in the outcome; only an empty
    /// command is an error.
    pub async fn execute(
        &self,
        command: &str,
        purpose: &str,
        timeout_ms: Option<u64>,
    ) -> Result<CommandOutcome, CommandError> {
        let command = command.trim();
        if command.is_empty() {
            return Err(CommandError::EmptyCommand);
        }
        let timeout =
            Duration::from_millis(timeout_ms.filter(|ms| *ms > 0).unwrap_or(self.config.timeout_ms));

        let purpose = if purpose.trim().is_empty() {
            "not specified"
        } else {
            purpose.trim()
        };
        let prompt = format!(
            "Run `{command}`? Purpose: {purpose} (timeout {}s)",
            format_seconds(timeout)
        );
        let confirmed = self.interaction.confirm(&prompt).await.unwrap_or_else(|err| {
            warn!("Confirmation prompt failed, treating as declined: {err:#}");
            false
        });
        if !confirmed {
            self.session.record_action(
                action_types::COMMAND,
                command,
                ActionStatus::Cancelled,
                None,
            );
            return Ok(CommandOutcome::cancelled());
        }

        self.session
            .record_action(action_types::COMMAND, command, ActionStatus::Attempted, None);

        let started = Instant::now();
        let run = self.run(command, timeout).await;
        let timed_out = run.timeout_note.is_some();

        let final_stderr = match &run.timeout_note {
            Some(note) => format!("{} {note}", run.stderr.trim()).trim().to_string(),
            None => run.stderr.trim().to_string(),
        };
        let report = build_report(
            &run.stdout,
            &final_stderr,
            run.exit_code,
            self.config.max_output_chars,
        );
        let status = if run.exit_code == 0 && !timed_out {
            ActionStatus::Success
        } else {
            ActionStatus::Failure
        };

        info!(
            command,
            exit_code = run.exit_code,
            timed_out,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "command finished"
        );

        let stderr_tail = tail_chars(&final_stderr, defaults::STDERR_TAIL_CHARS);
        self.session.record_action(
            action_types::COMMAND,
            command,
            status,
            Some(stderr_tail).filter(|tail| !tail.is_empty()),
        );

        let preview = truncate_chars(&report, DISPLAY_PREVIEW_CHARS);
        if preview.len() < report.len() {
            self.interaction
                .notify(LoopEvent::CommandOutput(&format!("{preview}...")));
        } else {
            self.interaction.notify(LoopEvent::CommandOutput(preview));
        }

        Ok(CommandOutcome {
            status,
            exit_code: Some(run.exit_code),
            report,
            timed_out,
        })
    }

    async fn run(&self, command: &str, timeout: Duration) -> RawRun {
        let started = Instant::now();
        let mut cmd = tokio::process::Command::new(&self.config.shell);
        cmd.arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        isolate_process_group(&mut cmd);

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(err) => {
                warn!(command, "Failed to spawn command: {err}");
                return RawRun {
                    stdout: String::new(),
                    stderr: CommandError::Spawn(err.to_string()).to_string(),
                    exit_code: -1,
                    timeout_note: None,
                };
            }
        };
        let pid = child.id();

        let stdout_buf = Arc::new(Mutex::new(Vec::new()));
        let stderr_buf = Arc::new(Mutex::new(Vec::new()));
        let mut readers = Vec::new();
        if let Some(stdout) = child.stdout.take() {
            readers.push(tokio::spawn(drain(stdout, Arc::clone(&stdout_buf))));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(tokio::spawn(drain(stderr, Arc::clone(&stderr_buf))));
        }

        let guard = Arc::new(CompletionGuard::new());
        let watchdog = {
            let guard = Arc::clone(&guard);
            tokio::spawn(async move {
                tokio::time::sleep(timeout).await;
                if guard.try_complete(Completion::TimedOut) {
                    debug!(?pid, "command timed out, killing process group");
                    if let Some(pid) = pid {
                        kill_process_group(pid);
                    }
                }
            })
        };

        let wait_result = child.wait().await;
        let exited_first = guard.try_complete(Completion::Exited);
        watchdog.abort();

        let timeout_note = (!exited_first)
            .then(|| CommandError::Timeout(format_seconds(timeout)).to_string());

        // Output readers may be held open by background descendants
        let drain_budget = if exited_first {
            timeout.saturating_sub(started.elapsed())
        } else {
            DRAIN_GRACE
        };
        if !join_readers(&mut readers, drain_budget).await {
            if let Some(pid) = pid {
                kill_process_group(pid);
            }
            join_readers(&mut readers, DRAIN_GRACE).await;
            for reader in &readers {
                reader.abort();
            }
        }

        let exit_code = if timeout_note.is_some() {
            -1
        } else {
            match wait_result {
                Ok(status) => exit_code_of(status),
                Err(err) => {
                    warn!("Failed to wait for command: {err}");
                    -1
                }
            }
        };

        RawRun {
            stdout: String::from_utf8_lossy(&stdout_buf.lock()).into_owned(),
            stderr: String::from_utf8_lossy(&stderr_buf.lock()).into_owned(),
            exit_code,
            timeout_note,
        }
    }
}

async fn drain<R: AsyncRead + Unpin>(mut reader: R, buffer: Arc<Mutex<Vec<u8>>>) {
    let mut chunk = [0u8; 8192];
    loop {
        match reader.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => buffer.lock().extend_from_slice(&chunk[..n]),
        }
    }
}

/// Wait for all readers within `budget`; true when every one finished
async fn join_readers(readers: &mut [JoinHandle<()>], budget: Duration) -> bool {
    let all = async {
        for reader in readers.iter_mut() {
            if !reader.is_finished() {
                let _ = reader.await;
            }
        }
    };
    tokio::time::timeout(budget, all).await.is_ok()
}

#[cfg(unix)]
fn exit_code_of(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    match status.code() {
        Some(code) => code,
        None if status.signal().is_some() => -2,
        None => -1,
    }
}

#[cfg(not(unix))]
fn exit_code_of(status: ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}

/// `5` for whole seconds, `0.5` otherwise
fn format_seconds(duration: Duration) -> String {
    let millis = duration.as_millis();
    if millis % 1000 == 0 {
        (millis / 1000).to_string()
    } else {
        format!("{:.1}", duration.as_secs_f64())
    }
}

/// Stream-labelled report, cut to `max_chars` characters with a marker
pub fn build_report(stdout: &str, stderr: &str, exit_code: i32, max_chars: usize) -> String {
    let mut report = String::new();
    let stdout = stdout.trim();
    let stderr = stderr.trim();
    if !stdout.is_empty() {
        report.push_str(&format!("{}\n{stdout}\n", messages::STDOUT_LABEL));
    }
    if !stderr.is_empty() {
        report.push_str(&format!("{}\n{stderr}\n", messages::STDERR_LABEL));
    }
    if report.is_empty() {
        report = if exit_code == 0 {
            messages::NO_OUTPUT_SUCCESS.to_string()
        } else {
            format!("Command finished with exit code {exit_code} (no output).")
        };
    }

    let total = report.chars().count();
    if total > max_chars {
        report = format!(
            "{}\n\n[Output truncated, full length was {total} characters]",
            truncate_chars(&report, max_chars)
        );
    }
    report.trim().to_string()
}
