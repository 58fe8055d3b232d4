use tracing::info;
use trajopt_core::Observer;

use crate::traits::{HasDefectNorm, HasMerit, HasStepSize};

/// Logs every event at `INFO` and never intervenes.
///
/// Install a `tracing` subscriber to see the records; without one the
/// observer is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TracingObserver {
    label: &'static str,
}

impl TracingObserver {
    /// Creates an observer that tags its records with `label`.
    #[must_use]
    pub fn new(label: &'static str) -> Self {
        Self { label }
    }

    #[must_use]
    pub fn label(&self) -> &'static str {
        self.label
    }
}

impl Default for TracingObserver {
    fn default() -> Self {
        Self::new("trajopt")
    }
}

impl<E, A> Observer<E, A> for TracingObserver
where
    E: HasMerit + HasStepSize + HasDefectNorm,
{
    fn observe(&mut self, event: &E) -> Option<A> {
        info!(
            solver = self.label,
            iter = event.iteration(),
            merit = event.merit(),
            alpha = event.step_size(),
            defect_norm = event.defect_norm(),
            "step accepted"
        );
        None
    }
}
