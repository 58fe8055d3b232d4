/// Actions an observer can take between solver iterations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Stop the solver and return the current trajectory.
    StopEarly,
}
