use crate::interrupt::InterruptSignal;
use crate::pipeline::Step;
use std::io::{self, Write};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Outcome of running a single step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionResult {
    Success,
    /// Non-zero exit. A child killed by signal `n` reports `128 + n`.
    Failed { code: i32 },
    NotFound { program: String },
    LaunchFailed { program: String, reason: String },
    Interrupted,
}

/// How long a failed child's exit waits for a Ctrl-C that reached the whole
/// process group to show up on the interrupt flag.
const INTERRUPT_GRACE: Duration = Duration::from_millis(250);

/// Runs steps one at a time with the child's output inherited.
///
/// Status text goes to `out` and is flushed after every line so it stays in
/// order with whatever the child prints to the same terminal.
pub struct Runner<W: Write = io::Stdout> {
    interrupt: InterruptSignal,
    out: W,
    dry_run: bool,
}

impl Runner<io::Stdout> {
    pub fn new(interrupt: InterruptSignal) -> Self {
        Self::with_output(interrupt, io::stdout())
    }
}

impl<W: Write> Runner<W> {
    pub fn with_output(interrupt: InterruptSignal, out: W) -> Self {
        Self {
            interrupt,
            out,
            dry_run: false,
        }
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    pub fn into_output(self) -> W {
        self.out
    }

    /// Runs `step` to completion and reports the outcome. Never exits the
    /// process; the caller decides what a failure means.
    pub async fn run_step(&mut self, step: &Step) -> ExecutionResult {
        if self.interrupt.is_triggered() {
            debug!("Interrupt already pending, not starting: {}", step);
            self.emit("\n🛑 Execution interrupted by user.");
            return ExecutionResult::Interrupted;
        }

        if self.dry_run {
            self.emit(&format!("\n--- Would run: {} ---", step));
            return ExecutionResult::Success;
        }

        self.emit(&format!("\n--- Running: {} ---", step));

        let mut command = Command::new(step.program());
        command
            .args(step.args())
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("Spawn failed for {}: {}", step.program(), e);
                self.emit(&format!(
                    "\n❌ ERROR: executable '{}' not found. Is it installed?",
                    step.program()
                ));
                return ExecutionResult::NotFound {
                    program: step.program().to_string(),
                };
            }
            Err(e) => {
                self.emit(&format!(
                    "\n❌ ERROR: could not start '{}': {}",
                    step.program(),
                    e
                ));
                return ExecutionResult::LaunchFailed {
                    program: step.program().to_string(),
                    reason: e.to_string(),
                };
            }
        };

        debug!("Spawned {} (pid {:?})", step, child.id());

        let waited = tokio::select! {
            biased;
            _ = self.interrupt.triggered() => None,
            status = child.wait() => Some(status),
        };

        let status = match waited {
            Some(status) => status,
            None => {
                info!("Interrupt received, killing {}", step);
                if let Err(e) = child.kill().await {
                    warn!("Failed to kill {}: {}", step, e);
                }
                self.emit("\n🛑 Execution interrupted by user.");
                return ExecutionResult::Interrupted;
            }
        };

        let status = match status {
            Ok(status) => status,
            Err(e) => {
                self.emit(&format!(
                    "\n❌ ERROR: lost track of '{}': {}",
                    step.program(),
                    e
                ));
                return ExecutionResult::LaunchFailed {
                    program: step.program().to_string(),
                    reason: e.to_string(),
                };
            }
        };

        // Ctrl-C in a terminal reaches the child too, and on a single-threaded
        // runtime its exit is usually seen before the listener task runs.
        if !status.success() && self.interrupted_during(&status).await {
            self.emit("\n🛑 Execution interrupted by user.");
            return ExecutionResult::Interrupted;
        }

        let code = exit_code(&status);
        debug!("{} exited with {}", step, code);

        if code == 0 {
            self.emit(&format!("✅ {}", step.success_message()));
            ExecutionResult::Success
        } else {
            self.emit(&format!(
                "\n❌ FATAL ERROR. Command failed with exit code: {}",
                code
            ));
            self.emit("Stopping sequence execution.");
            ExecutionResult::Failed { code }
        }
    }

    async fn interrupted_during(&mut self, status: &ExitStatus) -> bool {
        if killed_by_sigint(status) {
            return true;
        }
        tokio::time::timeout(INTERRUPT_GRACE, self.interrupt.triggered())
            .await
            .is_ok()
    }

    /// Writes a status line that is not tied to a single step.
    pub fn announce(&mut self, line: &str) {
        self.emit(line);
    }

    fn emit(&mut self, line: &str) {
        if let Err(e) = writeln!(self.out, "{}", line).and_then(|_| self.out.flush()) {
            warn!("Failed to write status line: {}", e);
        }
    }
}

#[cfg(unix)]
fn exit_code(status: &ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;

    match (status.code(), status.signal()) {
        (Some(code), _) => code,
        (None, Some(signal)) => 128 + signal,
        (None, None) => 1,
    }
}

#[cfg(not(unix))]
fn exit_code(status: &ExitStatus) -> i32 {
    status.code().unwrap_or(1)
}

#[cfg(unix)]
fn killed_by_sigint(status: &ExitStatus) -> bool {
    use std::os::unix::process::ExitStatusExt;

    const SIGINT: i32 = 2;
    status.signal() == Some(SIGINT)
}

#[cfg(not(unix))]
fn killed_by_sigint(_status: &ExitStatus) -> bool {
    false
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::interrupt;
    use std::time::{Duration, Instant};

    fn shell_step(script: &str, message: &str) -> Step {
        Step::new(
            "test",
            "sh",
            vec!["-c".to_string(), script.to_string()],
            message,
        )
        .unwrap()
    }

    fn output_of(runner: &Runner<Vec<u8>>) -> String {
        String::from_utf8_lossy(runner.output()).to_string()
    }

    #[tokio::test]
    async fn test_success_prints_message() {
        let mut runner = Runner::with_output(InterruptSignal::never(), Vec::new());
        let step = shell_step("exit 0", "plugins installed.");

        let result = runner.run_step(&step).await;

        assert_eq!(result, ExecutionResult::Success);
        let output = output_of(&runner);
        assert!(output.contains("--- Running: sh -c exit 0 ---"));
        assert!(output.contains("✅ plugins installed."));
    }

    #[tokio::test]
    async fn test_non_zero_exit_reports_code() {
        let mut runner = Runner::with_output(InterruptSignal::never(), Vec::new());
        let step = shell_step("exit 3", "never shown");

        let result = runner.run_step(&step).await;

        assert_eq!(result, ExecutionResult::Failed { code: 3 });
        let output = output_of(&runner);
        assert!(output.contains("exit code: 3"));
        assert!(output.contains("Stopping sequence execution."));
        assert!(!output.contains("never shown"));
    }

    #[tokio::test]
    async fn test_killed_by_signal_maps_to_128_plus_signal() {
        let mut runner = Runner::with_output(InterruptSignal::never(), Vec::new());
        let step = shell_step("kill -TERM $$", "never shown");

        let result = runner.run_step(&step).await;

        assert_eq!(result, ExecutionResult::Failed { code: 128 + 15 });
    }

    #[tokio::test]
    async fn test_missing_executable() {
        let mut runner = Runner::with_output(InterruptSignal::never(), Vec::new());
        let step = Step::new(
            "init",
            "definitely-not-a-real-packer-binary",
            vec!["init".to_string()],
            "never shown",
        )
        .unwrap();

        let result = runner.run_step(&step).await;

        assert_eq!(
            result,
            ExecutionResult::NotFound {
                program: "definitely-not-a-real-packer-binary".to_string()
            }
        );
        assert!(output_of(&runner).contains("'definitely-not-a-real-packer-binary' not found"));
    }

    #[tokio::test]
    async fn test_interrupt_kills_running_child() {
        let (trigger, signal) = interrupt::channel();
        let mut runner = Runner::with_output(signal, Vec::new());
        let step = shell_step("sleep 30", "never shown");

        let started = Instant::now();
        let run = runner.run_step(&step);
        let fire = async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            trigger.trigger();
        };
        let (result, _) = tokio::join!(run, fire);

        assert_eq!(result, ExecutionResult::Interrupted);
        assert!(started.elapsed() < Duration::from_secs(10));
        assert!(output_of(&runner).contains("interrupted by user"));
    }

    #[tokio::test]
    async fn test_child_killed_by_sigint_counts_as_interrupt() {
        let mut runner = Runner::with_output(InterruptSignal::never(), Vec::new());
        let step = shell_step("kill -INT $$", "never shown");

        let result = runner.run_step(&step).await;

        assert_eq!(result, ExecutionResult::Interrupted);
        let output = output_of(&runner);
        assert!(output.contains("interrupted by user"));
        assert!(!output.contains("FATAL ERROR"));
    }

    #[tokio::test]
    async fn test_interrupt_seen_after_child_exit_wins_over_failure() {
        // The child exits on its own Ctrl-C before the listener flips the flag.
        let (trigger, signal) = interrupt::channel();
        let mut runner = Runner::with_output(signal, Vec::new());
        let step = shell_step("exit 1", "never shown");

        let run = runner.run_step(&step);
        let fire = async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.trigger();
        };
        let (result, _) = tokio::join!(run, fire);

        assert_eq!(result, ExecutionResult::Interrupted);
        assert!(!output_of(&runner).contains("FATAL ERROR"));
    }

    #[tokio::test]
    async fn test_pending_interrupt_skips_spawn() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("ran");
        let (trigger, signal) = interrupt::channel();
        trigger.trigger();

        let mut runner = Runner::with_output(signal, Vec::new());
        let step = shell_step(&format!("touch '{}'", marker.display()), "never shown");

        let result = runner.run_step(&step).await;

        assert_eq!(result, ExecutionResult::Interrupted);
        assert!(!marker.exists());
    }

    #[tokio::test]
    async fn test_dry_run_spawns_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("ran");

        let mut runner = Runner::with_output(InterruptSignal::never(), Vec::new()).dry_run(true);
        let step = shell_step(&format!("touch '{}'", marker.display()), "never shown");

        let result = runner.run_step(&step).await;

        assert_eq!(result, ExecutionResult::Success);
        assert!(!marker.exists());
        assert!(output_of(&runner).contains("--- Would run:"));
    }
}
