use ndarray::*;
use rand::Rng;

use crate::models::Layer;
use crate::{ImagePrecision, LayerData, WeightPrecision};

/// Rust implementation of a feed forward layer.
/// The weight matrix shall have dimension (in that order)
/// input units x output units.
pub struct FeedforwardLayer {
    weights: Array2<WeightPrecision>,
    bias: Array1<WeightPrecision>,
}

impl FeedforwardLayer {
    pub fn new(weights: Array2<WeightPrecision>, bias: Array1<WeightPrecision>) -> FeedforwardLayer {
        debug_assert_eq!(
            weights.len_of(Axis(1)),
            bias.len(),
            "one bias per output unit"
        );
        FeedforwardLayer { weights, bias }
    }

    /// Builds a layer with Glorot-uniform weights and zero bias, for models
    /// that have not been trained yet.
    pub fn glorot_init(input_units: usize, output_units: usize) -> FeedforwardLayer {
        let limit = (6. / (input_units + output_units) as f32).sqrt();
        let mut rng = rand::thread_rng();
        let weights =
            Array::from_shape_fn((input_units, output_units), |_| rng.gen_range(-limit..limit));
        FeedforwardLayer::new(weights, Array::zeros(output_units))
    }

    pub fn apply(&self, data: &Array1<ImagePrecision>) -> Array1<ImagePrecision> {
        data.dot(&self.weights) + &self.bias
    }
}

impl Layer for FeedforwardLayer {
    fn forward_pass(&self, input: &LayerData) -> LayerData {
        let data = input
            .view()
            .into_dimensionality::<Ix1>()
            .expect("feed forward input is a flat vector");
        self.apply(&data.to_owned()).into_dyn()
    }
}

/// Flattens any input into a single feature vector, in row-major order.
pub struct FlattenLayer {}

impl FlattenLayer {
    pub fn new() -> Self {
        Self {}
    }
}

impl Default for FlattenLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl Layer for FlattenLayer {
    fn forward_pass(&self, input: &LayerData) -> LayerData {
        Array::from_iter(input.iter().cloned()).into_dyn()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feedforward() {
        let weights = array![[1., 0.], [0., 1.], [1., 1.]];
        let layer = FeedforwardLayer::new(weights, array![0., -1.]);

        let out = layer.apply(&array![1., 2., 3.]);
        assert_eq!(out, array![4., 4.]);
    }

    #[test]
    fn test_glorot_init_dimensions() {
        let layer = FeedforwardLayer::glorot_init(5, 3);
        assert_eq!(layer.apply(&Array::zeros(5)).len(), 3);
    }

    #[test]
    fn test_flatten() {
        let input = Array::from_shape_vec((2, 2, 2), (0..8).map(|x| x as f32).collect())
            .unwrap()
            .into_dyn();
        let layer = FlattenLayer::new();

        let out = layer.forward_pass(&input);
        assert_eq!(out.ndim(), 1);
        assert_eq!(
            out,
            Array::from_iter((0..8).map(|x| x as f32)).into_dyn()
        );
    }
}
