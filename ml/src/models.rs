use log::debug;
use ndarray::*;

use crate::{ImagePrecision, LayerData};

/// A network layer that can run a forward pass at inference time.
pub trait Layer {
    fn forward_pass(&self, input: &LayerData) -> LayerData;
}

/// Loss function fixed by the compile step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Loss {
    CategoricalCrossentropy,
}

/// Optimizer fixed by the compile step. Only relevant once the model is
/// handed to a training backend; recorded here so the hand-off carries the
/// full compile configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Optimizer {
    Sgd,
}

/// Training configuration frozen at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompileConfig {
    pub loss: Loss,
    pub optimizer: Optimizer,
}

impl Default for CompileConfig {
    fn default() -> Self {
        CompileConfig {
            loss: Loss::CategoricalCrossentropy,
            optimizer: Optimizer::Sgd,
        }
    }
}

/// A compiled network: layers applied in order, plus the declared input and
/// output shapes and the compile configuration.
pub struct SequentialModel {
    layers: Vec<Box<dyn Layer>>,
    input_shape: Vec<usize>,
    output_shape: Vec<usize>,
    config: CompileConfig,
}

impl SequentialModel {
    pub fn new(
        layers: Vec<Box<dyn Layer>>,
        input_shape: Vec<usize>,
        output_shape: Vec<usize>,
        config: CompileConfig,
    ) -> SequentialModel {
        debug!(
            "instantiated sequential model with {} layers, input {:?}, output {:?}",
            layers.len(),
            input_shape,
            output_shape
        );
        SequentialModel {
            layers,
            input_shape,
            output_shape,
            config,
        }
    }

    pub fn input_shape(&self) -> &[usize] {
        &self.input_shape
    }

    pub fn output_shape(&self) -> &[usize] {
        &self.output_shape
    }

    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    pub fn config(&self) -> &CompileConfig {
        &self.config
    }

    pub fn forward_pass(&self, input: &LayerData) -> LayerData {
        let mut data = input.clone();
        for layer in &self.layers {
            data = layer.forward_pass(&data);
        }
        data
    }

    /// Classifies a single image, returning the per-class confidences.
    pub fn predict(&self, image: &Array3<ImagePrecision>) -> Array1<ImagePrecision> {
        let out = self.forward_pass(&image.clone().into_dyn());
        out.into_dimensionality::<Ix1>()
            .expect("compiled models end in a flat vector")
    }
}
