use trajopt_core::Observer;

use crate::traits::{CanStopEarly, HasMerit};

/// Stops a solver once its merit has stalled.
///
/// An event counts as progress when its merit improves on the best merit seen
/// so far by more than `min_relative_decrease` (relative to the best). After
/// `patience` consecutive events without progress the observer returns
/// [`CanStopEarly::stop_early`].
#[derive(Debug, Clone, PartialEq)]
pub struct StallObserver {
    patience: usize,
    min_relative_decrease: f64,
    best: f64,
    stalled: usize,
}

impl StallObserver {
    /// Creates a stall detector.
    ///
    /// A `patience` of zero stops at the first event.
    #[must_use]
    pub fn new(patience: usize, min_relative_decrease: f64) -> Self {
        Self {
            patience,
            min_relative_decrease,
            best: f64::INFINITY,
            stalled: 0,
        }
    }

    /// Returns the best merit seen so far.
    #[must_use]
    pub fn best(&self) -> f64 {
        self.best
    }

    /// Returns the number of consecutive events without progress.
    #[must_use]
    pub fn stalled(&self) -> usize {
        self.stalled
    }
}

impl<E, A> Observer<E, A> for StallObserver
where
    E: HasMerit,
    A: CanStopEarly,
{
    fn observe(&mut self, event: &E) -> Option<A> {
        let merit = event.merit();
        let threshold = if self.best.is_finite() {
            self.best - self.min_relative_decrease * self.best.abs()
        } else {
            f64::INFINITY
        };

        if merit < threshold {
            self.stalled = 0;
        } else {
            self.stalled += 1;
        }
        self.best = self.best.min(merit);

        (self.stalled >= self.patience).then(A::stop_early)
    }
}
