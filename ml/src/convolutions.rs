//! Convolution and pooling layers. Both operate on image-like data in
//! (height, width, channels) layout, which is the layout the editor's shape
//! tracking uses.
use ndarray::*;
use rand::Rng;

use crate::models::Layer;
use crate::{ImagePrecision, LayerData, WeightPrecision};

/// A valid (unpadded) 2d convolution with stride 1.
///
/// The kernel tensor shall have dimension (in that order)
/// kernel height x kernel width x input channels x filters.
pub struct Conv2dLayer {
    kernel: Array4<WeightPrecision>,
    bias: Array1<WeightPrecision>,
    kernel_height: usize,
    kernel_width: usize,
    num_filters: usize,
}

impl Conv2dLayer {
    pub fn new(kernel: Array4<WeightPrecision>, bias: Array1<WeightPrecision>) -> Conv2dLayer {
        let kernel_height = kernel.len_of(Axis(0));
        let kernel_width = kernel.len_of(Axis(1));
        let num_filters = kernel.len_of(Axis(3));

        debug_assert_eq!(bias.len(), num_filters, "one bias per filter");

        Conv2dLayer {
            kernel,
            bias,
            kernel_height,
            kernel_width,
            num_filters,
        }
    }

    /// Builds a layer with Glorot-uniform kernel weights and zero bias,
    /// for models that have not been trained yet.
    pub fn glorot_init(
        input_channels: usize,
        filters: usize,
        kernel_height: usize,
        kernel_width: usize,
    ) -> Conv2dLayer {
        let fan_in = kernel_height * kernel_width * input_channels;
        let fan_out = kernel_height * kernel_width * filters;
        let limit = (6. / (fan_in + fan_out) as f32).sqrt();
        let mut rng = rand::thread_rng();
        let kernel = Array::from_shape_fn(
            (kernel_height, kernel_width, input_channels, filters),
            |_| rng.gen_range(-limit..limit),
        );
        Conv2dLayer::new(kernel, Array::zeros(filters))
    }

    /// Performs the convolution on the given image data using this layer's
    /// parameters. The output has shape
    /// (height - kernel height + 1, width - kernel width + 1, filters).
    pub fn convolve(&self, image: &Array3<ImagePrecision>) -> Array3<ImagePrecision> {
        let in_height = image.len_of(Axis(0));
        let in_width = image.len_of(Axis(1));

        let out_height = in_height - self.kernel_height + 1;
        let out_width = in_width - self.kernel_width + 1;

        let mut out = Array::zeros((out_height, out_width, self.num_filters));
        for f in 0..self.num_filters {
            let filter_kernel = self.kernel.slice(s![.., .., .., f]);
            for i in 0..out_height {
                for j in 0..out_width {
                    let patch = image.slice(s![
                        i..(i + self.kernel_height),
                        j..(j + self.kernel_width),
                        ..
                    ]);
                    out[[i, j, f]] = (&patch * &filter_kernel).sum() + self.bias[f];
                }
            }
        }
        out
    }
}

impl Layer for Conv2dLayer {
    fn forward_pass(&self, input: &LayerData) -> LayerData {
        let image = input
            .view()
            .into_dimensionality::<Ix3>()
            .expect("convolution input is image-shaped");
        self.convolve(&image.to_owned()).into_dyn()
    }
}

/// 2d max pooling. Non-overlapping windows; trailing rows and columns that
/// do not fill a whole window are dropped, matching the floor division the
/// editor's shape tracking performs.
pub struct MaxPool2dLayer {
    pool_height: usize,
    pool_width: usize,
}

impl MaxPool2dLayer {
    pub fn new(pool_height: usize, pool_width: usize) -> MaxPool2dLayer {
        debug_assert!(pool_height > 0 && pool_width > 0, "pool size of 0 passed");
        MaxPool2dLayer {
            pool_height,
            pool_width,
        }
    }

    pub fn pool(&self, image: &Array3<ImagePrecision>) -> Array3<ImagePrecision> {
        let in_height = image.len_of(Axis(0));
        let in_width = image.len_of(Axis(1));
        let channels = image.len_of(Axis(2));

        let out_height = in_height / self.pool_height;
        let out_width = in_width / self.pool_width;

        let mut out = Array::zeros((out_height, out_width, channels));
        for c in 0..channels {
            for i in 0..out_height {
                for j in 0..out_width {
                    let window = image.slice(s![
                        (i * self.pool_height)..((i + 1) * self.pool_height),
                        (j * self.pool_width)..((j + 1) * self.pool_width),
                        c
                    ]);
                    out[[i, j, c]] = window.fold(f32::NEG_INFINITY, |acc, &x| acc.max(x));
                }
            }
        }
        out
    }
}

impl Layer for MaxPool2dLayer {
    fn forward_pass(&self, input: &LayerData) -> LayerData {
        let image = input
            .view()
            .into_dimensionality::<Ix3>()
            .expect("pooling input is image-shaped");
        self.pool(&image.to_owned()).into_dyn()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_channel_convolution() {
        let image = Array::from_shape_vec(
            (3, 3, 1),
            vec![0., 1., 0., 0., 0., 0., -1., 0., 0.],
        )
        .unwrap();
        let kernel = Array::from_shape_vec((2, 2, 1, 1), vec![0., 1., -1., 0.]).unwrap();
        let layer = Conv2dLayer::new(kernel, Array::zeros(1));

        let out = layer.convolve(&image);
        assert_eq!(
            out,
            Array::from_shape_vec((2, 2, 1), vec![1., 0., 1., 0.]).unwrap()
        );
    }

    #[test]
    fn test_convolution_sums_over_channels() {
        // Two channels holding the same plane, kernel of ones: every output
        // entry is twice the patch sum.
        let image = Array::from_shape_fn((3, 3, 2), |(i, j, _)| (i * 3 + j) as f32);
        let kernel: Array4<f32> = Array::ones((2, 2, 2, 1));
        let layer = Conv2dLayer::new(kernel, Array::zeros(1));

        let out = layer.convolve(&image);
        assert_eq!(out.dim(), (2, 2, 1));
        assert_eq!(out[[0, 0, 0]], 2. * (0. + 1. + 3. + 4.));
        assert_eq!(out[[1, 1, 0]], 2. * (4. + 5. + 7. + 8.));
    }

    #[test]
    fn test_convolution_bias() {
        let image: Array3<f32> = Array::zeros((2, 2, 1));
        let kernel: Array4<f32> = Array::ones((2, 2, 1, 2));
        let layer = Conv2dLayer::new(kernel, array![0.5, -0.5]);

        let out = layer.convolve(&image);
        assert_eq!(out, Array::from_shape_vec((1, 1, 2), vec![0.5, -0.5]).unwrap());
    }

    #[test]
    fn test_glorot_init_shapes() {
        let layer = Conv2dLayer::glorot_init(1, 15, 3, 3);
        let image: Array3<f32> = Array::zeros((28, 28, 1));
        assert_eq!(layer.convolve(&image).dim(), (26, 26, 15));
    }

    #[test]
    fn test_max_pooling() {
        let image = Array::from_shape_vec(
            (4, 4, 1),
            vec![
                1., 2., 5., 6., //
                3., 4., 7., 8., //
                -1., -2., 0., 0., //
                -3., -4., 0., 9.,
            ],
        )
        .unwrap();
        let layer = MaxPool2dLayer::new(2, 2);

        let out = layer.pool(&image);
        assert_eq!(
            out,
            Array::from_shape_vec((2, 2, 1), vec![4., 8., -1., 9.]).unwrap()
        );
    }

    #[test]
    fn test_max_pooling_drops_partial_windows() {
        let image = Array::from_shape_fn((5, 5, 2), |(i, j, c)| (i + j + c) as f32);
        let layer = MaxPool2dLayer::new(2, 2);
        assert_eq!(layer.pool(&image).dim(), (2, 2, 2));
    }
}
