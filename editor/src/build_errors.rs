use crate::shape::Shape;
use thiserror::Error;

/// All the ways an edit can be rejected. Every variant is a recoverable
/// user-input mistake; the builder state is unchanged whenever one of these
/// is returned.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BuildError {
    #[error("dense layers need a flat input, but the current shape is {0}")]
    DenseNeedsFlatInput(Shape),
    #[error("dense layers need at least 1 unit")]
    NoUnits,
    #[error("the activation function '{0}' is not supported (choose relu, sigmoid or softmax)")]
    UnsupportedActivation(String),
    #[error("could not read '{0}' as a real number")]
    UnreadableDropoutRate(String),
    #[error("the dropout rate r must satisfy 0 < r < 1, got {0}")]
    DropoutRateOutOfRange(f32),
    #[error("{kind} layers need an image input, but the current shape is {shape}")]
    NeedsImageInput { kind: &'static str, shape: Shape },
    #[error("the kernel {axis} must be between 1 and {limit}, got {size}")]
    KernelOutOfRange {
        axis: &'static str,
        size: usize,
        limit: usize,
    },
    #[error("convolutions need at least 1 filter")]
    NoFilters,
    #[error("the pool {axis} must be between 1 and {limit}, got {size}")]
    PoolOutOfRange {
        axis: &'static str,
        size: usize,
        limit: usize,
    },
    #[error("the final layer must produce the shape (10,), but the model ends in {0}")]
    WrongTerminalShape(Shape),
    #[error("the model is already compiled, there is no need to compile it again")]
    AlreadyCompiled,
    #[error("the model is already compiled; delete the compile step or clear it before editing")]
    EditAfterCompile,
    #[error("the model is not compiled yet; finish it with a compile step")]
    NotCompiled,
    #[error("there is no layer left to delete")]
    NothingToDelete,
}

pub type BuildResult<T> = std::result::Result<T, BuildError>;
