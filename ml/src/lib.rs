//! Forward-pass implementations of the network layers the model editor can
//! emit. Everything is backed by ndarray; there is no training machinery in
//! here, only inference.

pub mod activation_functions;
pub mod convolutions;
pub mod fully_connected;
pub mod models;
pub mod normalization;
pub mod weight_loader;

pub type WeightPrecision = f32;
pub type ImagePrecision = f32;

/// Data flowing between layers. The rank changes along the network (images
/// are rank 3, feature vectors rank 1), so layers exchange dynamic-rank
/// arrays and pin the rank down internally.
pub type LayerData = ndarray::ArrayD<ImagePrecision>;
