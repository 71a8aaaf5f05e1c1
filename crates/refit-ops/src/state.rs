//! Observable progress of a run.

use std::sync::Arc;

use refit_core::ComponentId;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// Coarse stage of the run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunPhase {
    #[default]
    Idle,
    Discovering,
    Analyzing,
    Resolving,
    Migrating,
    Persisting,
    Finished,
    Cancelled,
}

impl RunPhase {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Discovering => "discovering",
            Self::Analyzing => "analyzing",
            Self::Resolving => "resolving",
            Self::Migrating => "migrating",
            Self::Persisting => "persisting",
            Self::Finished => "finished",
            Self::Cancelled => "cancelled",
        }
    }

    /// Whether the run is over.
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Finished | Self::Cancelled)
    }
}

impl std::fmt::Display for RunPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Snapshot published to subscribers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSnapshot {
    pub phase: RunPhase,
    /// Components discovered.
    pub total: usize,
    /// Components with a final result.
    pub completed: usize,
    /// Of those, how many failed.
    pub failed: usize,
    /// Current dependency wave (1-based) and wave count.
    pub wave: Option<(usize, usize)>,
    /// Component most recently started.
    pub current: Option<ComponentId>,
}

impl RunSnapshot {
    /// Fraction of components completed, in `[0, 1]`.
    pub fn progress(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.completed as f64 / self.total as f64
    }
}

/// Owner of the run snapshot.
///
/// Cheap to clone; every clone writes to and reads from the same channel.
#[derive(Debug, Clone)]
pub struct RunState {
    tx: Arc<watch::Sender<RunSnapshot>>,
}

impl Default for RunState {
    fn default() -> Self {
        Self::new()
    }
}

impl RunState {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(RunSnapshot::default());
        Self { tx: Arc::new(tx) }
    }

    /// Current snapshot.
    pub fn get(&self) -> RunSnapshot {
        self.tx.borrow().clone()
    }

    /// Replace the snapshot.
    pub fn set(&self, snapshot: RunSnapshot) {
        self.tx.send_replace(snapshot);
    }

    /// Edit the snapshot in place and notify subscribers.
    pub fn update(&self, f: impl FnOnce(&mut RunSnapshot)) {
        self.tx.send_modify(f);
    }

    /// Receiver that observes every later change.
    pub fn subscribe(&self) -> watch::Receiver<RunSnapshot> {
        self.tx.subscribe()
    }

    pub(crate) fn enter(&self, phase: RunPhase) {
        self.update(|s| s.phase = phase);
    }

    pub(crate) fn started(&self, component: &ComponentId) {
        let component = component.clone();
        self.update(|s| s.current = Some(component));
    }

    pub(crate) fn finished(&self, failed: bool) {
        self.update(|s| {
            s.completed += 1;
            if failed {
                s.failed += 1;
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_set_update() {
        let state = RunState::new();
        assert_eq!(state.get().phase, RunPhase::Idle);

        state.set(RunSnapshot {
            total: 4,
            ..RunSnapshot::default()
        });
        state.finished(false);
        state.finished(true);
        let snap = state.get();
        assert_eq!(snap.completed, 2);
        assert_eq!(snap.failed, 1);
        assert!((snap.progress() - 0.5).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_subscribers_see_changes() {
        let state = RunState::new();
        let mut rx = state.subscribe();
        let writer = state.clone();

        tokio::spawn(async move {
            writer.enter(RunPhase::Migrating);
        });

        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().phase, RunPhase::Migrating);
    }
}
