//! Core types for the reconciler.

use std::fmt;

use serde::{Deserialize, Serialize};

/// What a single reconcile pass did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReconcileAction {
    /// The Solver no longer exists; nothing to do.
    ResourceGone,
    /// The Solver is already Completed; nothing was touched.
    AlreadyCompleted,
    /// No Job existed, so one was created.
    CreatedJob,
    /// The Job exists and has not succeeded yet.
    JobRunning,
    /// The Job succeeded and the Solver was marked Completed.
    Completed { job_deleted: bool },
}

impl fmt::Display for ReconcileAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ResourceGone => write!(f, "resource gone"),
            Self::AlreadyCompleted => write!(f, "already completed"),
            Self::CreatedJob => write!(f, "created job"),
            Self::JobRunning => write!(f, "job running"),
            Self::Completed { job_deleted: true } => write!(f, "completed, job deleted"),
            Self::Completed { job_deleted: false } => write!(f, "completed, job kept"),
        }
    }
}

/// Result of reconciling one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileResult {
    /// The action taken.
    pub action: ReconcileAction,
    /// Ask the controller to reconcile the key again with backoff.
    ///
    /// Failures are reported as errors instead, so this reconciler never
    /// sets it; the controller still honours it.
    pub requeue: bool,
}

impl ReconcileResult {
    /// A pass that needs no follow-up until the next event.
    #[must_use]
    pub const fn done(action: ReconcileAction) -> Self {
        Self {
            action,
            requeue: false,
        }
    }

    /// Whether the Solver reached its terminal phase in this or an earlier pass.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self.action,
            ReconcileAction::AlreadyCompleted | ReconcileAction::Completed { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_done_does_not_requeue() {
        let result = ReconcileResult::done(ReconcileAction::CreatedJob);
        assert!(!result.requeue);
        assert!(!result.is_terminal());
    }

    #[test]
    fn test_terminal_actions() {
        assert!(ReconcileResult::done(ReconcileAction::AlreadyCompleted).is_terminal());
        assert!(
            ReconcileResult::done(ReconcileAction::Completed { job_deleted: false }).is_terminal()
        );
        assert!(!ReconcileResult::done(ReconcileAction::ResourceGone).is_terminal());
    }

    #[test]
    fn test_action_display() {
        assert_eq!(
            ReconcileAction::Completed { job_deleted: true }.to_string(),
            "completed, job deleted"
        );
        assert_eq!(ReconcileAction::JobRunning.to_string(), "job running");
    }
}
