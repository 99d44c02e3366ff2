use crate::config::{DeployPlan, Provider};
use crate::error::DeployError;
use crate::pipeline::{ExecutionResult, Runner, Step};
use std::fmt;
use std::io::Write;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Where a run currently stands. `Done` and `Aborted` are terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunState {
    NotStarted,
    Running { provider: Provider, step: String },
    Done,
    Aborted,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::NotStarted => f.write_str("not started"),
            RunState::Running { provider, step } => write!(f, "running {} {}", provider, step),
            RunState::Done => f.write_str("done"),
            RunState::Aborted => f.write_str("aborted"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub steps_run: usize,
    pub elapsed: Duration,
}

pub struct Pipeline {
    plan: DeployPlan,
    state: RunState,
    attempted: usize,
}

impl Pipeline {
    pub fn new(plan: DeployPlan) -> Self {
        Self {
            plan,
            state: RunState::NotStarted,
            attempted: 0,
        }
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    /// Steps handed to the runner so far, including a failing one.
    pub fn attempted(&self) -> usize {
        self.attempted
    }

    /// Runs every step in plan order and stops at the first one that does
    /// not succeed.
    pub async fn execute<W: Write>(&mut self, runner: &mut Runner<W>) -> Result<RunSummary, DeployError> {
        let total = self.plan.step_count();
        info!("Starting deploy with {} steps", total);

        let started = Instant::now();
        let Pipeline {
            plan,
            state,
            attempted,
        } = self;

        for sequence in &plan.sequences {
            for step in &sequence.steps {
                transition(
                    state,
                    RunState::Running {
                        provider: sequence.provider,
                        step: step.name().to_string(),
                    },
                );
                *attempted += 1;
                debug!("Executing step {}/{}: {}", attempted, total, step);

                let result = runner.run_step(step).await;
                if let Err(e) = into_outcome(step, result) {
                    transition(state, RunState::Aborted);
                    return Err(e);
                }
            }

            runner.announce(&format!(
                "\n🎉 --- {} sequence finished without errors ---",
                sequence.provider
            ));
        }

        transition(state, RunState::Done);
        let elapsed = started.elapsed();
        info!("Deploy completed: {} steps in {:.1?}", attempted, elapsed);

        Ok(RunSummary {
            steps_run: *attempted,
            elapsed,
        })
    }
}

fn transition(state: &mut RunState, next: RunState) {
    debug!("State: {} -> {}", state, next);
    *state = next;
}

fn into_outcome(step: &Step, result: ExecutionResult) -> Result<(), DeployError> {
    match result {
        ExecutionResult::Success => Ok(()),
        ExecutionResult::Failed { code } => Err(DeployError::StepFailed {
            command: step.command_line(),
            code,
        }),
        ExecutionResult::NotFound { program } => Err(DeployError::ExecutableNotFound { program }),
        ExecutionResult::LaunchFailed { program, reason } => {
            Err(DeployError::Launch { program, reason })
        }
        ExecutionResult::Interrupted => Err(DeployError::Interrupted),
    }
}
