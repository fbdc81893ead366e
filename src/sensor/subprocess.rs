use std::io;
use std::ops::ControlFlow;
use std::process::{ExitStatus, Stdio};

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::LinesStream;

use crate::error::DriverError;
use crate::event::SensorEvent;
use crate::sensor::protocol::{HelperMessage, MessageOutcome, apply_message};
use crate::sensor::{BackendContext, SensorBackend};

struct HelperProcess {
    child: Child,
    stdout: ChildStdout,
    stderr: ChildStderr,
}

/// Runs the helper command and decodes its stdout. The helper is always
/// killed and reaped by the watcher task, also after a protocol violation.
#[derive(Default)]
pub struct SubprocessBackend {
    helper: Option<HelperProcess>, // spawned but not yet armed
    shutdown: Option<oneshot::Sender<()>>,
    watcher: Option<JoinHandle<()>>,
}

impl SubprocessBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SensorBackend for SubprocessBackend {
    fn name(&self) -> &'static str {
        "helper process"
    }

    fn open(&mut self, ctx: &BackendContext) -> Result<(), DriverError> {
        let helper = &ctx.config.helper;
        let mut child = Command::new(&helper.program)
            .args(&helper.args)
            .arg("-g")
            .arg(ctx.config.gpio_line.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| DriverError::Spawn(format!("{}: {e}", helper.program)))?;

        let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
            let _ = child.start_kill();
            return Err(DriverError::Spawn("helper output is not captured".into()));
        };
        ctx.log.debug(&format!(
            "[HELPER] Spawned {} (pid {:?})",
            helper.program,
            child.id()
        ));

        self.helper = Some(HelperProcess {
            child,
            stdout,
            stderr,
        });
        Ok(())
    }

    fn arm(&mut self, ctx: BackendContext) {
        let Some(helper) = self.helper.take() else {
            return;
        };
        let (tx, rx) = oneshot::channel();
        self.shutdown = Some(tx);
        self.watcher = Some(tokio::spawn(watch_helper(helper, rx, ctx)));
    }

    fn release(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(mut helper) = self.helper.take() {
            let _ = helper.child.start_kill();
        }
        // the watcher reaps the child on its own
        self.watcher.take();
    }
}

impl Drop for SubprocessBackend {
    fn drop(&mut self) {
        self.release();
    }
}

async fn watch_helper(
    helper: HelperProcess,
    mut shutdown: oneshot::Receiver<()>,
    ctx: BackendContext,
) {
    let HelperProcess {
        mut child,
        stdout,
        stderr,
    } = helper;
    let mut messages = LinesStream::new(BufReader::new(stdout).lines());
    let mut diagnostics = LinesStream::new(BufReader::new(stderr).lines());
    let mut diagnostics_open = true;

    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => {
                terminate(&mut child, &ctx).await;
                return;
            }
            line = messages.next() => match line {
                Some(Ok(line)) => {
                    if handle_message(&line, &ctx).is_break() {
                        terminate(&mut child, &ctx).await;
                        return;
                    }
                }
                // undecodable output is as much a violation as an unknown token
                Some(Err(e)) => {
                    report_violation(DriverError::Protocol(e.to_string()), &ctx);
                    terminate(&mut child, &ctx).await;
                    return;
                }
                None => break,
            },
            line = diagnostics.next(), if diagnostics_open => {
                diagnostics_open = log_diagnostic(line, &ctx);
            }
        }
    }

    // stdout is closed, the helper is on its way out; keep its last words
    while diagnostics_open {
        tokio::select! {
            biased;
            _ = &mut shutdown => {
                terminate(&mut child, &ctx).await;
                return;
            }
            line = diagnostics.next() => {
                diagnostics_open = log_diagnostic(line, &ctx);
            }
        }
    }

    let status = tokio::select! {
        biased;
        _ = &mut shutdown => {
            terminate(&mut child, &ctx).await;
            return;
        }
        status = child.wait() => status,
    };
    report_exit(status, &ctx);
}

/// Returns whether stderr is still open.
fn log_diagnostic(line: Option<io::Result<String>>, ctx: &BackendContext) -> bool {
    match line {
        Some(Ok(line)) => {
            if ctx.log.is_debug() {
                ctx.log.warn(&format!("[HELPER] {line}"));
            }
            true
        }
        Some(Err(e)) => {
            ctx.log.debug(&format!("[HELPER] stderr read failed: {e}"));
            false
        }
        None => false,
    }
}

fn handle_message(line: &str, ctx: &BackendContext) -> ControlFlow<()> {
    let message = HelperMessage::parse(line);
    let outcome = {
        let mut state = ctx.state.lock();
        if !state.running {
            return ControlFlow::Continue(());
        }
        apply_message(message, ctx.config.trigger_mode, &mut state.ready_to_detect)
    };

    match outcome {
        MessageOutcome::Detected => {
            ctx.log.debug("Motion Detected");
            ctx.events.dispatch(SensorEvent::Detected);
        }
        MessageOutcome::Suppressed => {
            ctx.log.debug("Motion ignored until the next NoMotion");
        }
        MessageOutcome::Rearmed => {
            ctx.log.debug("No Motion Detected");
        }
        MessageOutcome::Violation(line) => {
            report_violation(DriverError::Protocol(line), ctx);
            return ControlFlow::Break(());
        }
    }
    ControlFlow::Continue(())
}

/// Ends the run. Nothing is reported if `stop()` got there first.
fn report_violation(err: DriverError, ctx: &BackendContext) {
    let was_running = std::mem::replace(&mut ctx.state.lock().running, false);
    if was_running {
        ctx.log.error(&format!("[HELPER] {err}"));
        ctx.events.dispatch(SensorEvent::Error(err.to_string()));
    }
}

async fn terminate(child: &mut Child, ctx: &BackendContext) {
    if let Err(e) = child.start_kill() {
        ctx.log.debug(&format!("[HELPER] kill: {e}"));
    }
    match child.wait().await {
        Ok(status) => ctx.log.debug(&format!("[HELPER] Terminated ({status})")),
        Err(e) => ctx.log.warn(&format!("[HELPER] wait failed: {e}")),
    }
}

fn report_exit(status: io::Result<ExitStatus>, ctx: &BackendContext) {
    let was_running = std::mem::replace(&mut ctx.state.lock().running, false);

    let fault = match status {
        Ok(status) => {
            ctx.log.warn(&format!(
                "[HELPER] The exit code was: {:?}",
                status.code()
            ));
            ctx.log.warn(&format!(
                "[HELPER] The exit signal was: {:?}",
                exit_signal(&status)
            ));
            (!status.success()).then(|| DriverError::ProcessExit(status.to_string()))
        }
        Err(e) => Some(DriverError::ProcessExit(e.to_string())),
    };

    if let Some(err) = fault
        && was_running
    {
        ctx.log.error(&format!("[HELPER] {err}"));
        ctx.events.dispatch(SensorEvent::Error(err.to_string()));
    }
}

#[cfg(unix)]
fn exit_signal(status: &ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn exit_signal(_status: &ExitStatus) -> Option<i32> {
    None
}
