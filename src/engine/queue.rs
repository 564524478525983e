// src/engine/queue.rs

use std::collections::BTreeSet;

use tracing::debug;

use crate::engine::BindingId;
use crate::types::TriggerWhileRunningBehaviour;

/// Triggers that arrive while their binding is already running.
///
/// Semantics:
/// - `Queue`: the binding is remembered once. However many triggers arrive
///   during a run, exactly one follow-up run happens afterwards.
/// - `Drop`: nothing is remembered; the in-flight run is considered to cover
///   the change.
#[derive(Debug)]
pub struct TriggerQueue {
    behaviour: TriggerWhileRunningBehaviour,
    pending: BTreeSet<BindingId>,
}

impl TriggerQueue {
    pub fn new(behaviour: TriggerWhileRunningBehaviour) -> Self {
        Self {
            behaviour,
            pending: BTreeSet::new(),
        }
    }

    /// Returns true if there are no queued triggers.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Record that `binding` was triggered while it is running.
    pub fn record_trigger(&mut self, binding: BindingId) {
        match self.behaviour {
            TriggerWhileRunningBehaviour::Queue => {
                let inserted = self.pending.insert(binding);
                debug!(binding, inserted, "queued follow-up run (queue mode)");
            }
            TriggerWhileRunningBehaviour::Drop => {
                debug!(binding, "ignoring trigger while running (drop mode)");
            }
        }
    }

    /// Take the queued follow-up for `binding`, if any.
    pub fn take(&mut self, binding: BindingId) -> bool {
        self.pending.remove(&binding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_mode_coalesces_repeated_triggers() {
        let mut q = TriggerQueue::new(TriggerWhileRunningBehaviour::Queue);
        q.record_trigger(2);
        q.record_trigger(2);
        q.record_trigger(2);

        assert!(q.take(2));
        assert!(!q.take(2));
        assert!(q.is_empty());
    }

    #[test]
    fn drop_mode_remembers_nothing() {
        let mut q = TriggerQueue::new(TriggerWhileRunningBehaviour::Drop);
        q.record_trigger(0);
        assert!(q.is_empty());
        assert!(!q.take(0));
    }
}
