//! Incremental editor for small convolutional digit classifiers.
//!
//! A [`ModelBuilder`](model_builder::ModelBuilder) holds a linear network
//! description as a sequence of validated layer descriptors, tracking the
//! tensor shape flowing through the network. Structurally invalid layers are
//! rejected at the point of the offending edit; an explicit compile step
//! freezes the description, after which it can be instantiated as an
//! executable [`ml`] model.

mod build_errors;
pub mod layers;
pub mod model_builder;
pub mod shape;

pub use build_errors::{BuildError, BuildResult};
pub use layers::{LayerDescriptor, LayerKind};
pub use ml::activation_functions::ActivationFunction;
pub use model_builder::{default_architecture, EmitError, ModelBuilder, INPUT_SHAPE, NUM_CLASSES};
pub use shape::Shape;
