use nalgebra::SVector;

/// Vector norm used when reducing sequences of vectors to a scalar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Norm {
    /// Sum of absolute values.
    #[default]
    L1,

    /// Euclidean norm.
    L2,

    /// Largest absolute value.
    Inf,
}

impl Norm {
    /// Applies the norm to a single vector.
    #[must_use]
    pub fn of<const D: usize>(self, v: &SVector<f64, D>) -> f64 {
        match self {
            Self::L1 => v.lp_norm(1),
            Self::L2 => v.norm(),
            Self::Inf => v.amax(),
        }
    }
}

/// Sums the norms of every vector in `seq`.
#[must_use]
pub fn sequence_norm<const D: usize>(norm: Norm, seq: &[SVector<f64, D>]) -> f64 {
    seq.iter().map(|v| norm.of(v)).sum()
}

/// Sums the norms of the element-wise differences `a[k] - b[k]`.
///
/// Both sequences must have the same length.
#[must_use]
pub fn difference_norm<const D: usize>(
    norm: Norm,
    a: &[SVector<f64, D>],
    b: &[SVector<f64, D>],
) -> f64 {
    debug_assert_eq!(a.len(), b.len(), "sequences must have equal length");
    a.iter().zip(b).map(|(a, b)| norm.of(&(a - b))).sum()
}
