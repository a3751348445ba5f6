//! Layers that reshape the value distribution without changing the shape:
//! batch normalization and dropout. Both are identity-like at inference
//! time, which is all this crate does.
use ndarray::*;

use crate::models::Layer;
use crate::{LayerData, WeightPrecision};

/// Batch normalization at inference time: an affine transform per feature,
/// using the running statistics collected during training. The feature axis
/// is the last one (channels for image data, units for flat data).
pub struct BatchNormLayer {
    gamma: Array1<WeightPrecision>,
    beta: Array1<WeightPrecision>,
    running_mean: Array1<WeightPrecision>,
    running_var: Array1<WeightPrecision>,
    epsilon: f32,
}

impl BatchNormLayer {
    pub fn new(
        gamma: Array1<WeightPrecision>,
        beta: Array1<WeightPrecision>,
        running_mean: Array1<WeightPrecision>,
        running_var: Array1<WeightPrecision>,
    ) -> BatchNormLayer {
        debug_assert!(
            gamma.len() == beta.len()
                && gamma.len() == running_mean.len()
                && gamma.len() == running_var.len(),
            "batch norm parameter vectors must agree on the feature count"
        );
        BatchNormLayer {
            gamma,
            beta,
            running_mean,
            running_var,
            epsilon: 1e-3,
        }
    }

    /// Identity parameters (unit scale, zero shift, zero mean, unit
    /// variance) for models that have not been trained yet.
    pub fn identity(num_features: usize) -> BatchNormLayer {
        BatchNormLayer::new(
            Array::ones(num_features),
            Array::zeros(num_features),
            Array::zeros(num_features),
            Array::ones(num_features),
        )
    }
}

impl Layer for BatchNormLayer {
    fn forward_pass(&self, input: &LayerData) -> LayerData {
        let scale = &self.gamma / (&self.running_var + self.epsilon).mapv(f32::sqrt);
        // Parameter vectors broadcast over the leading axes of the input.
        let centered = input - &self.running_mean.view().into_dyn();
        centered * &scale.into_dyn() + &self.beta.view().into_dyn()
    }
}

/// Dropout is only active during training; at inference it passes data
/// through unchanged. The rate is kept for display purposes.
pub struct DropoutLayer {
    rate: f32,
}

impl DropoutLayer {
    pub fn new(rate: f32) -> DropoutLayer {
        debug_assert!(0. < rate && rate < 1., "dropout rate outside (0, 1)");
        DropoutLayer { rate }
    }

    pub fn rate(&self) -> f32 {
        self.rate
    }
}

impl Layer for DropoutLayer {
    fn forward_pass(&self, input: &LayerData) -> LayerData {
        input.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_batch_norm_is_nearly_identity() {
        let layer = BatchNormLayer::identity(3);
        let input = array![1., -2., 3.].into_dyn();

        let out = layer.forward_pass(&input);
        for (o, i) in out.iter().zip(input.iter()) {
            // epsilon shrinks values slightly
            assert!((o - i).abs() < 1e-2);
        }
    }

    #[test]
    fn test_batch_norm_normalizes_per_channel() {
        let layer = BatchNormLayer::new(
            array![1., 2.],
            array![0., 1.],
            array![1., 0.],
            array![1. - 1e-3, 1. - 1e-3],
        );
        let input = Array::from_shape_vec((1, 1, 2), vec![3., 4.])
            .unwrap()
            .into_dyn();

        let out = layer.forward_pass(&input);
        assert!((out[[0, 0, 0]] - 2.).abs() < 1e-5);
        assert!((out[[0, 0, 1]] - 9.).abs() < 1e-5);
    }

    #[test]
    fn test_dropout_is_identity_at_inference() {
        let layer = DropoutLayer::new(0.5);
        let input = array![[1., 2.], [3., 4.]].into_dyn();
        assert_eq!(layer.forward_pass(&input), input);
    }
}
