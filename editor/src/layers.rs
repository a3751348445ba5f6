//! Layer descriptors: immutable records of a layer's kind and parameters,
//! validated against the shape flowing into them at construction time.
use std::fmt;

use crate::build_errors::{BuildError, BuildResult};
use crate::shape::Shape;
use ml::activation_functions::ActivationFunction;

/// The kinds of layer the editor can append, plus the two synthetic entries
/// that frame a description: `Input` at the front and `Compile` at the end.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LayerKind {
    Input,
    Dense {
        units: usize,
    },
    Activation {
        function: ActivationFunction,
    },
    Dropout {
        rate: f32,
    },
    Flatten,
    Conv2d {
        filters: usize,
        kernel: (usize, usize),
    },
    MaxPool2d {
        pool: (usize, usize),
    },
    BatchNorm,
    Compile,
}

/// One validated layer of a network description. The input shape it was
/// constructed against and the output shape it produces are both fixed for
/// the descriptor's lifetime.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerDescriptor {
    kind: LayerKind,
    input_shape: Shape,
    output_shape: Shape,
}

impl LayerDescriptor {
    /// Checks `kind` against the shape flowing into it. On success the
    /// returned descriptor carries the computed output shape; on failure
    /// the error names the violated constraint.
    pub fn new(kind: LayerKind, input_shape: Shape) -> BuildResult<LayerDescriptor> {
        let output_shape = compute_output_shape(&kind, input_shape)?;
        Ok(LayerDescriptor {
            kind,
            input_shape,
            output_shape,
        })
    }

    /// The synthetic descriptor fixing a network's input shape. Always
    /// legal, so this cannot fail.
    pub fn input(shape: Shape) -> LayerDescriptor {
        LayerDescriptor {
            kind: LayerKind::Input,
            input_shape: shape,
            output_shape: shape,
        }
    }

    pub fn kind(&self) -> &LayerKind {
        &self.kind
    }

    pub fn input_shape(&self) -> Shape {
        self.input_shape
    }

    pub fn output_shape(&self) -> Shape {
        self.output_shape
    }
}

fn compute_output_shape(kind: &LayerKind, input: Shape) -> BuildResult<Shape> {
    match *kind {
        LayerKind::Input | LayerKind::Activation { .. } | LayerKind::BatchNorm => Ok(input),
        LayerKind::Dense { units } => {
            if units < 1 {
                return Err(BuildError::NoUnits);
            }
            match input {
                Shape::Flat(_) => Ok(Shape::flat(units)),
                other => Err(BuildError::DenseNeedsFlatInput(other)),
            }
        }
        LayerKind::Dropout { rate } => {
            if 0. < rate && rate < 1. {
                Ok(input)
            } else {
                Err(BuildError::DropoutRateOutOfRange(rate))
            }
        }
        LayerKind::Flatten => Ok(Shape::flat(input.num_elements())),
        LayerKind::Conv2d {
            filters,
            kernel: (kernel_height, kernel_width),
        } => {
            let (height, width) = match input {
                Shape::Image { height, width, .. } => (height, width),
                other => {
                    return Err(BuildError::NeedsImageInput {
                        kind: "convolution",
                        shape: other,
                    })
                }
            };
            if kernel_height < 1 || kernel_height > height {
                return Err(BuildError::KernelOutOfRange {
                    axis: "height",
                    size: kernel_height,
                    limit: height,
                });
            }
            if kernel_width < 1 || kernel_width > width {
                return Err(BuildError::KernelOutOfRange {
                    axis: "width",
                    size: kernel_width,
                    limit: width,
                });
            }
            if filters < 1 {
                return Err(BuildError::NoFilters);
            }
            Ok(Shape::image(
                height - kernel_height + 1,
                width - kernel_width + 1,
                filters,
            ))
        }
        LayerKind::MaxPool2d {
            pool: (pool_height, pool_width),
        } => {
            let (height, width, channels) = match input {
                Shape::Image {
                    height,
                    width,
                    channels,
                } => (height, width, channels),
                other => {
                    return Err(BuildError::NeedsImageInput {
                        kind: "pooling",
                        shape: other,
                    })
                }
            };
            if pool_height < 1 || pool_height > height {
                return Err(BuildError::PoolOutOfRange {
                    axis: "height",
                    size: pool_height,
                    limit: height,
                });
            }
            if pool_width < 1 || pool_width > width {
                return Err(BuildError::PoolOutOfRange {
                    axis: "width",
                    size: pool_width,
                    limit: width,
                });
            }
            Ok(Shape::image(height / pool_height, width / pool_width, channels))
        }
        LayerKind::Compile => match input {
            Shape::Flat(len) if len == crate::model_builder::NUM_CLASSES => Ok(input),
            other => Err(BuildError::WrongTerminalShape(other)),
        },
    }
}

impl fmt::Display for LayerDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self.kind() {
            LayerKind::Input => write!(f, "input"),
            LayerKind::Dense { units } => write!(f, "dense ({})", units),
            LayerKind::Activation { function } => write!(f, "activation ({})", function),
            LayerKind::Dropout { rate } => write!(f, "dropout ({})", rate),
            LayerKind::Flatten => write!(f, "flatten"),
            LayerKind::Conv2d {
                filters,
                kernel: (kernel_height, kernel_width),
            } => write!(f, "conv2d ({}, {}) x {}", kernel_height, kernel_width, filters),
            LayerKind::MaxPool2d {
                pool: (pool_height, pool_width),
            } => write!(f, "max_pool2d ({}, {})", pool_height, pool_width),
            LayerKind::BatchNorm => write!(f, "batch_norm"),
            LayerKind::Compile => write!(f, "output"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dense_needs_flat_input() {
        let err = LayerDescriptor::new(
            LayerKind::Dense { units: 10 },
            Shape::image(28, 28, 1),
        )
        .unwrap_err();
        assert_eq!(err, BuildError::DenseNeedsFlatInput(Shape::image(28, 28, 1)));
    }

    #[test]
    fn test_dense_output_shape() {
        let descriptor =
            LayerDescriptor::new(LayerKind::Dense { units: 50 }, Shape::flat(100)).unwrap();
        assert_eq!(descriptor.output_shape(), Shape::flat(50));
        assert_eq!(descriptor.input_shape(), Shape::flat(100));
    }

    #[test]
    fn test_dense_rejects_zero_units() {
        let err = LayerDescriptor::new(LayerKind::Dense { units: 0 }, Shape::flat(10)).unwrap_err();
        assert_eq!(err, BuildError::NoUnits);
    }

    #[test]
    fn test_activation_keeps_shape() {
        let shape = Shape::image(26, 26, 15);
        let descriptor = LayerDescriptor::new(
            LayerKind::Activation {
                function: ActivationFunction::Relu,
            },
            shape,
        )
        .unwrap();
        assert_eq!(descriptor.output_shape(), shape);
    }

    #[test]
    fn test_dropout_range() {
        assert!(LayerDescriptor::new(LayerKind::Dropout { rate: 0.5 }, Shape::flat(10)).is_ok());
        assert_eq!(
            LayerDescriptor::new(LayerKind::Dropout { rate: 0. }, Shape::flat(10)).unwrap_err(),
            BuildError::DropoutRateOutOfRange(0.)
        );
        assert_eq!(
            LayerDescriptor::new(LayerKind::Dropout { rate: 1. }, Shape::flat(10)).unwrap_err(),
            BuildError::DropoutRateOutOfRange(1.)
        );
    }

    #[test]
    fn test_flatten_multiplies_dimensions() {
        let descriptor =
            LayerDescriptor::new(LayerKind::Flatten, Shape::image(13, 13, 15)).unwrap();
        assert_eq!(descriptor.output_shape(), Shape::flat(13 * 13 * 15));
    }

    #[test]
    fn test_conv2d_output_shape() {
        let descriptor = LayerDescriptor::new(
            LayerKind::Conv2d {
                filters: 15,
                kernel: (3, 3),
            },
            Shape::image(28, 28, 1),
        )
        .unwrap();
        assert_eq!(descriptor.output_shape(), Shape::image(26, 26, 15));
    }

    #[test]
    fn test_conv2d_kernel_too_large() {
        let err = LayerDescriptor::new(
            LayerKind::Conv2d {
                filters: 3,
                kernel: (30, 30),
            },
            Shape::image(28, 28, 1),
        )
        .unwrap_err();
        assert_eq!(
            err,
            BuildError::KernelOutOfRange {
                axis: "height",
                size: 30,
                limit: 28,
            }
        );
    }

    #[test]
    fn test_conv2d_needs_image_input() {
        let err = LayerDescriptor::new(
            LayerKind::Conv2d {
                filters: 3,
                kernel: (3, 3),
            },
            Shape::flat(784),
        )
        .unwrap_err();
        assert!(matches!(err, BuildError::NeedsImageInput { .. }));
    }

    #[test]
    fn test_conv2d_rejects_zero_filters() {
        let err = LayerDescriptor::new(
            LayerKind::Conv2d {
                filters: 0,
                kernel: (3, 3),
            },
            Shape::image(28, 28, 1),
        )
        .unwrap_err();
        assert_eq!(err, BuildError::NoFilters);
    }

    #[test]
    fn test_max_pool2d_floors() {
        let descriptor = LayerDescriptor::new(
            LayerKind::MaxPool2d { pool: (2, 2) },
            Shape::image(13, 13, 15),
        )
        .unwrap();
        assert_eq!(descriptor.output_shape(), Shape::image(6, 6, 15));
    }

    #[test]
    fn test_max_pool2d_too_large() {
        let err = LayerDescriptor::new(
            LayerKind::MaxPool2d { pool: (2, 30) },
            Shape::image(28, 28, 1),
        )
        .unwrap_err();
        assert_eq!(
            err,
            BuildError::PoolOutOfRange {
                axis: "width",
                size: 30,
                limit: 28,
            }
        );
    }

    #[test]
    fn test_compile_requires_ten_classes() {
        assert!(LayerDescriptor::new(LayerKind::Compile, Shape::flat(10)).is_ok());
        assert_eq!(
            LayerDescriptor::new(LayerKind::Compile, Shape::flat(12)).unwrap_err(),
            BuildError::WrongTerminalShape(Shape::flat(12))
        );
        assert!(matches!(
            LayerDescriptor::new(LayerKind::Compile, Shape::image(28, 28, 1)).unwrap_err(),
            BuildError::WrongTerminalShape(_)
        ));
    }

    #[test]
    fn test_display() {
        let conv = LayerDescriptor::new(
            LayerKind::Conv2d {
                filters: 15,
                kernel: (3, 3),
            },
            Shape::image(28, 28, 1),
        )
        .unwrap();
        assert_eq!(conv.to_string(), "conv2d (3, 3) x 15");
        assert_eq!(
            LayerDescriptor::input(Shape::image(28, 28, 1)).to_string(),
            "input"
        );
    }
}
