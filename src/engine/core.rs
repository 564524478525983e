// src/engine/core.rs

//! Pure watch state machine.
//!
//! This module contains a synchronous, deterministic core that consumes
//! [`WatchEvent`]s and produces:
//! - an updated per-binding state
//! - a list of commands describing what the IO shell should do next
//!
//! The async shell (`engine::runtime::WatchRuntime`) reads events from a
//! channel and hands `StartRun` commands to a [`RunBackend`].
//!
//! Per binding: `Idle → Running → Idle`. A failed run is logged and the
//! binding goes back to `Idle`; the watcher stays alive.
//!
//! [`RunBackend`]: crate::exec::RunBackend

use tracing::{debug, info, warn};

use crate::engine::queue::TriggerQueue;
use crate::engine::{BindingId, RunOutcome, WatchEvent};
use crate::types::TriggerWhileRunningBehaviour;

/// Observable state of one binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingState {
    Idle,
    Running,
}

/// Command produced by the core, executed by the shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreCommand {
    StartRun(BindingId),
}

/// Decision returned by the core after handling a single `WatchEvent`.
#[derive(Debug, Clone)]
pub struct CoreStep {
    pub commands: Vec<CoreCommand>,
    /// Whether the outer loop should keep running.
    pub keep_running: bool,
}

impl CoreStep {
    fn keep(commands: Vec<CoreCommand>) -> Self {
        Self {
            commands,
            keep_running: true,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct BindingStats {
    started: u64,
    failed: u64,
}

/// Pure core state: one slot per binding plus the trigger queue.
///
/// It has no channels, no Tokio types, and does not perform any IO.
#[derive(Debug)]
pub struct WatchCore {
    names: Vec<String>,
    states: Vec<BindingState>,
    stats: Vec<BindingStats>,
    queue: TriggerQueue,
}

impl WatchCore {
    pub fn new(names: Vec<String>, behaviour: TriggerWhileRunningBehaviour) -> Self {
        let n = names.len();
        Self {
            names,
            states: vec![BindingState::Idle; n],
            stats: vec![BindingStats::default(); n],
            queue: TriggerQueue::new(behaviour),
        }
    }

    pub fn state_of(&self, binding: BindingId) -> Option<BindingState> {
        self.states.get(binding).copied()
    }

    /// True when no binding is running and nothing is queued.
    pub fn is_idle(&self) -> bool {
        self.states.iter().all(|s| *s == BindingState::Idle) && self.queue.is_empty()
    }

    pub fn runs_started(&self, binding: BindingId) -> u64 {
        self.stats.get(binding).map(|s| s.started).unwrap_or(0)
    }

    pub fn runs_failed(&self, binding: BindingId) -> u64 {
        self.stats.get(binding).map(|s| s.failed).unwrap_or(0)
    }

    /// Handle a single event, returning the commands for the shell.
    pub fn step(&mut self, event: WatchEvent) -> CoreStep {
        match event {
            WatchEvent::BindingTriggered { binding } => self.handle_trigger(binding),
            WatchEvent::RunFinished { binding, outcome } => self.handle_finished(binding, outcome),
            WatchEvent::ShutdownRequested => CoreStep {
                commands: Vec::new(),
                keep_running: false,
            },
        }
    }

    fn handle_trigger(&mut self, binding: BindingId) -> CoreStep {
        match self.states.get(binding).copied() {
            None => {
                warn!(binding, "trigger for unknown binding; ignoring");
                CoreStep::keep(Vec::new())
            }
            Some(BindingState::Running) => {
                self.queue.record_trigger(binding);
                CoreStep::keep(Vec::new())
            }
            Some(BindingState::Idle) => CoreStep::keep(vec![self.start(binding)]),
        }
    }

    fn handle_finished(&mut self, binding: BindingId, outcome: RunOutcome) -> CoreStep {
        if self.states.get(binding) != Some(&BindingState::Running) {
            warn!(binding, "completion for a binding that is not running; ignoring");
            return CoreStep::keep(Vec::new());
        }

        let name = &self.names[binding];
        match outcome {
            RunOutcome::Success => info!(binding = %name, "watch run finished"),
            RunOutcome::Failed(message) => {
                self.stats[binding].failed += 1;
                warn!(binding = %name, error = %message, "watch run failed; still watching");
            }
        }
        self.states[binding] = BindingState::Idle;

        if self.queue.take(binding) {
            debug!(binding = %self.names[binding], "starting queued follow-up run");
            return CoreStep::keep(vec![self.start(binding)]);
        }
        CoreStep::keep(Vec::new())
    }

    fn start(&mut self, binding: BindingId) -> CoreCommand {
        self.states[binding] = BindingState::Running;
        self.stats[binding].started += 1;
        CoreCommand::StartRun(binding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn core(behaviour: TriggerWhileRunningBehaviour) -> WatchCore {
        WatchCore::new(vec!["markup".into(), "styles".into()], behaviour)
    }

    fn trigger(binding: BindingId) -> WatchEvent {
        WatchEvent::BindingTriggered { binding }
    }

    fn finished(binding: BindingId, outcome: RunOutcome) -> WatchEvent {
        WatchEvent::RunFinished { binding, outcome }
    }

    #[test]
    fn idle_trigger_starts_run() {
        let mut core = core(TriggerWhileRunningBehaviour::Queue);
        let step = core.step(trigger(1));
        assert_eq!(step.commands, vec![CoreCommand::StartRun(1)]);
        assert_eq!(core.state_of(1), Some(BindingState::Running));
        assert_eq!(core.state_of(0), Some(BindingState::Idle));
    }

    #[test]
    fn triggers_while_running_coalesce_into_one_follow_up() {
        let mut core = core(TriggerWhileRunningBehaviour::Queue);
        core.step(trigger(0));
        for _ in 0..5 {
            assert!(core.step(trigger(0)).commands.is_empty());
        }

        let step = core.step(finished(0, RunOutcome::Success));
        assert_eq!(step.commands, vec![CoreCommand::StartRun(0)]);

        let step = core.step(finished(0, RunOutcome::Success));
        assert!(step.commands.is_empty());
        assert_eq!(core.runs_started(0), 2);
        assert!(core.is_idle());
    }

    #[test]
    fn drop_mode_skips_follow_up() {
        let mut core = core(TriggerWhileRunningBehaviour::Drop);
        core.step(trigger(0));
        core.step(trigger(0));
        let step = core.step(finished(0, RunOutcome::Success));
        assert!(step.commands.is_empty());
        assert_eq!(core.runs_started(0), 1);
    }

    #[test]
    fn failure_returns_binding_to_idle() {
        let mut core = core(TriggerWhileRunningBehaviour::Queue);
        core.step(trigger(1));
        let step = core.step(finished(1, RunOutcome::Failed("missing partial".into())));
        assert!(step.keep_running);
        assert_eq!(core.state_of(1), Some(BindingState::Idle));
        assert_eq!(core.runs_failed(1), 1);

        let step = core.step(trigger(1));
        assert_eq!(step.commands, vec![CoreCommand::StartRun(1)]);
    }

    #[test]
    fn unknown_binding_and_stray_completion_are_ignored() {
        let mut core = core(TriggerWhileRunningBehaviour::Queue);
        assert!(core.step(trigger(9)).commands.is_empty());
        assert!(core.step(finished(0, RunOutcome::Success)).commands.is_empty());
        assert!(core.is_idle());
    }

    #[test]
    fn shutdown_stops_loop() {
        let mut core = core(TriggerWhileRunningBehaviour::Queue);
        assert!(!core.step(WatchEvent::ShutdownRequested).keep_running);
    }
}
