//! Activation functions supported by the model editor: relu, sigmoid and
//! softmax.
//!
//! All activation functions are exposed as a layer as well as a free function.
use ndarray::*;

use crate::models::Layer;
use crate::{ImagePrecision, LayerData};

/// The activation functions a user can pick in the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationFunction {
    Relu,
    Sigmoid,
    Softmax,
}

impl ActivationFunction {
    /// Looks an activation up by the name the editor uses. Returns `None`
    /// for functions we do not support.
    pub fn from_name(name: &str) -> Option<ActivationFunction> {
        match name {
            "relu" => Some(ActivationFunction::Relu),
            "sigmoid" => Some(ActivationFunction::Sigmoid),
            "softmax" => Some(ActivationFunction::Softmax),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ActivationFunction::Relu => "relu",
            ActivationFunction::Sigmoid => "sigmoid",
            ActivationFunction::Softmax => "softmax",
        }
    }
}

impl std::fmt::Display for ActivationFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Relu implementation
pub fn relu<D: Dimension>(data: &Array<ImagePrecision, D>) -> Array<ImagePrecision, D> {
    data.mapv(|x| if x > 0. { x } else { 0. })
}

/// Logistic sigmoid implementation
pub fn sigmoid<D: Dimension>(data: &Array<ImagePrecision, D>) -> Array<ImagePrecision, D> {
    data.mapv(|x| 1. / (1. + (-x).exp()))
}

/// Softmax over all entries of the array. The maximum is subtracted before
/// exponentiation for numerical stability; the result sums to 1.
pub fn softmax<D: Dimension>(data: &Array<ImagePrecision, D>) -> Array<ImagePrecision, D> {
    let max = data.fold(f32::NEG_INFINITY, |acc, &x| acc.max(x));
    let exps = data.mapv(|x| (x - max).exp());
    let total = exps.sum();
    exps.mapv(|x| x / total)
}

/// An activation as a network layer, applying one of the supported functions
/// elementwise (softmax normalizes over the whole input).
pub struct ActivationLayer {
    function: ActivationFunction,
}

impl ActivationLayer {
    pub fn new(function: ActivationFunction) -> Self {
        Self { function }
    }

    pub fn function(&self) -> ActivationFunction {
        self.function
    }
}

impl Layer for ActivationLayer {
    fn forward_pass(&self, input: &LayerData) -> LayerData {
        match self.function {
            ActivationFunction::Relu => relu(input),
            ActivationFunction::Sigmoid => sigmoid(input),
            ActivationFunction::Softmax => softmax(input),
        }
    }
}
