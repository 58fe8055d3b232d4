use nalgebra::{SMatrix, SVector};

/// A state vector of dimension `N`.
pub type State<const N: usize> = SVector<f64, N>;

/// A control vector of dimension `M`.
pub type Control<const M: usize> = SVector<f64, M>;

/// A sequence of state vectors, indexed by stage.
pub type StateArray<const N: usize> = Vec<State<N>>;

/// A sequence of control vectors, indexed by stage.
pub type ControlArray<const M: usize> = Vec<Control<M>>;

/// Square matrix acting on states (`∂f/∂x`, state Hessians).
pub type StateMatrix<const N: usize> = SMatrix<f64, N, N>;

/// Square matrix acting on controls (control Hessians).
pub type ControlMatrix<const M: usize> = SMatrix<f64, M, M>;

/// Maps a control into state space (`∂f/∂u`).
pub type InputMatrix<const N: usize, const M: usize> = SMatrix<f64, N, M>;

/// Maps a state into control space (feedback gains, cross Hessians).
pub type FeedbackMatrix<const N: usize, const M: usize> = SMatrix<f64, M, N>;

/// A sequence of feedback matrices, indexed by stage.
pub type FeedbackArray<const N: usize, const M: usize> = Vec<FeedbackMatrix<N, M>>;
